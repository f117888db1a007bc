//! Bitbucket. User info is `/2.0/user` plus the paged `/2.0/user/emails` list.

use serde_json::{Map, Value};

use super::github::primary_first;
use super::{config_layer, default_scope};
use crate::config::{set_if_empty, ProviderClientConfig};
use crate::error::Error;
use crate::http::HttpClient;
use crate::oauth::engine::EngineContext;
use crate::oauth::params::Params;
use crate::oauth::provider::ProviderLayer;
use crate::oauth::types::{OAuthTokens, RawUserInfo, UserInfo};
use crate::oauth::user_info::{bearer_headers, get_json, map_user_info, require_access_token};

const AUTHORIZATION_ENDPOINT: &str = "https://bitbucket.org/site/oauth2/authorize";
const TOKEN_ENDPOINT: &str = "https://bitbucket.org/site/oauth2/access_token";
const USER_INFO_ENDPOINT: &str = "https://api.bitbucket.org/2.0/user";

fn apply_defaults(mut config: ProviderClientConfig) -> Result<ProviderClientConfig, Error> {
    set_if_empty(&mut config.name, "Bitbucket");
    set_if_empty(&mut config.authorization_endpoint, AUTHORIZATION_ENDPOINT);
    set_if_empty(&mut config.token_endpoint, TOKEN_ENDPOINT);
    set_if_empty(&mut config.user_info_endpoint, USER_INFO_ENDPOINT);
    default_scope(&mut config, &["account", "email"]);
    config
        .user_info_map
        .from_user_info_api
        .or_defaults("user.uuid", "emails.0.email", "emails.0.is_confirmed");
    Ok(config)
}

async fn get_user_info(
    http: &HttpClient,
    config: &ProviderClientConfig,
    tokens: &OAuthTokens,
) -> Result<UserInfo, Error> {
    let headers = bearer_headers(require_access_token(tokens)?);

    let user = get_json(http, &config.user_info_endpoint, &headers, &Params::new()).await?;
    let emails_url = format!("{}/emails", config.user_info_endpoint.trim_end_matches('/'));
    let emails = get_json(http, &emails_url, &headers, &Params::new())
        .await?
        .get("values")
        .cloned()
        .unwrap_or(Value::Array(Vec::new()));

    let mut raw = Map::new();
    raw.insert("user".to_string(), user);
    raw.insert("emails".to_string(), primary_first(emails, "is_primary"));

    map_user_info(
        config,
        RawUserInfo {
            from_id_token_payload: None,
            from_user_info_api: Some(raw),
        },
    )
}

pub(crate) fn layer(ctx: EngineContext) -> ProviderLayer {
    let defaults = config_layer(apply_defaults);
    ProviderLayer::new(move |hooks| {
        let http = ctx.http.clone();
        defaults.apply(hooks).with_get_user_info(move |config, tokens| {
            let http = http.clone();
            async move { get_user_info(&http, &config, &tokens).await }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpClientBuilder;
    use mockito::Server;
    use serde_json::json;

    #[tokio::test]
    async fn test_user_info_uses_primary_confirmed_email() {
        let mut server = Server::new_async().await;
        let _user = server
            .mock("GET", "/2.0/user")
            .with_status(200)
            .with_body(r#"{"uuid": "{a1b2}", "display_name": "Ada"}"#)
            .create_async()
            .await;
        let _emails = server
            .mock("GET", "/2.0/user/emails")
            .with_status(200)
            .with_body(
                r#"{"values": [
                    {"email": "alt@b.c", "is_primary": false, "is_confirmed": false},
                    {"email": "ada@b.c", "is_primary": true, "is_confirmed": true}
                ]}"#,
            )
            .create_async()
            .await;

        let mut config = apply_defaults(ProviderClientConfig::default()).unwrap();
        config.user_info_endpoint = format!("{}/2.0/user", server.url());
        let tokens = OAuthTokens(json!({"access_token": "at"}).as_object().cloned().unwrap());
        let http = HttpClientBuilder::new().build().unwrap();

        let info = get_user_info(&http, &config, &tokens).await.unwrap();

        assert_eq!(info.third_party_user_id, "{a1b2}");
        assert_eq!(info.email.as_ref().unwrap().id, "ada@b.c");
        assert!(info.is_verified());
    }
}
