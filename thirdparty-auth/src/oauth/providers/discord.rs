//! Discord. User info is the `users/@me` object.

use super::{config_layer, default_scope};
use crate::config::{set_if_empty, ProviderClientConfig};
use crate::error::Error;
use crate::oauth::engine::EngineContext;
use crate::oauth::provider::ProviderLayer;
use crate::oauth::user_info::resolve_from_user_info_api;

const AUTHORIZATION_ENDPOINT: &str = "https://discord.com/oauth2/authorize";
const TOKEN_ENDPOINT: &str = "https://discord.com/api/oauth2/token";
const USER_INFO_ENDPOINT: &str = "https://discord.com/api/users/@me";

fn apply_defaults(mut config: ProviderClientConfig) -> Result<ProviderClientConfig, Error> {
    set_if_empty(&mut config.name, "Discord");
    set_if_empty(&mut config.authorization_endpoint, AUTHORIZATION_ENDPOINT);
    set_if_empty(&mut config.token_endpoint, TOKEN_ENDPOINT);
    set_if_empty(&mut config.user_info_endpoint, USER_INFO_ENDPOINT);
    default_scope(&mut config, &["identify", "email"]);
    config
        .user_info_map
        .from_user_info_api
        .or_defaults("id", "email", "verified");
    Ok(config)
}

pub(crate) fn layer(ctx: EngineContext) -> ProviderLayer {
    let defaults = config_layer(apply_defaults);
    ProviderLayer::new(move |hooks| {
        let http = ctx.http.clone();
        defaults.apply(hooks).with_get_user_info(move |config, tokens| {
            let http = http.clone();
            async move { resolve_from_user_info_api(&http, &config, &tokens).await }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpClientBuilder;
    use crate::oauth::types::OAuthTokens;
    use mockito::Server;
    use serde_json::json;

    #[tokio::test]
    async fn test_user_info_from_users_me() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/users/@me")
            .with_status(200)
            .with_body(r#"{"id": "80351110224678912", "email": "nelly@discord.com", "verified": true}"#)
            .create_async()
            .await;

        let mut config = apply_defaults(ProviderClientConfig::default()).unwrap();
        config.user_info_endpoint = format!("{}/api/users/@me", server.url());
        let tokens = OAuthTokens(json!({"access_token": "at"}).as_object().cloned().unwrap());
        let http = HttpClientBuilder::new().build().unwrap();

        let info = resolve_from_user_info_api(&http, &config, &tokens).await.unwrap();

        assert_eq!(info.third_party_user_id, "80351110224678912");
        assert_eq!(info.email.unwrap().id, "nelly@discord.com");
    }

    #[tokio::test]
    async fn test_missing_access_token() {
        let config = apply_defaults(ProviderClientConfig::default()).unwrap();
        let http = HttpClientBuilder::new().build().unwrap();

        let result = resolve_from_user_info_api(&http, &config, &OAuthTokens::default()).await;

        assert!(result.is_err());
    }
}
