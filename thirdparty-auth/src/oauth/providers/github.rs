//! GitHub.
//!
//! GitHub issues no ID token. User info is `/user` plus `/user/emails`,
//! combined as `{"user": ..., "emails": [...]}` with the primary email first.

use serde_json::{Map, Value};

use super::{config_layer, default_scope};
use crate::config::{set_if_empty, ProviderClientConfig};
use crate::error::Error;
use crate::http::HttpClient;
use crate::oauth::engine::EngineContext;
use crate::oauth::params::Params;
use crate::oauth::provider::ProviderLayer;
use crate::oauth::types::{OAuthTokens, RawUserInfo, UserInfo};
use crate::oauth::user_info::{bearer_headers, get_json, map_user_info, require_access_token};

const AUTHORIZATION_ENDPOINT: &str = "https://github.com/login/oauth/authorize";
const TOKEN_ENDPOINT: &str = "https://github.com/login/oauth/access_token";
const USER_INFO_ENDPOINT: &str = "https://api.github.com/user";

fn apply_defaults(mut config: ProviderClientConfig) -> Result<ProviderClientConfig, Error> {
    set_if_empty(&mut config.name, "Github");
    set_if_empty(&mut config.authorization_endpoint, AUTHORIZATION_ENDPOINT);
    set_if_empty(&mut config.token_endpoint, TOKEN_ENDPOINT);
    set_if_empty(&mut config.user_info_endpoint, USER_INFO_ENDPOINT);
    default_scope(&mut config, &["read:user", "user:email"]);
    config
        .user_info_map
        .from_user_info_api
        .or_defaults("user.id", "emails.0.email", "emails.0.verified");
    Ok(config)
}

async fn get_user_info(
    http: &HttpClient,
    config: &ProviderClientConfig,
    tokens: &OAuthTokens,
) -> Result<UserInfo, Error> {
    let access_token = require_access_token(tokens)?;
    let mut headers = bearer_headers(access_token);
    headers.insert(
        "Accept".to_string(),
        "application/vnd.github+json".to_string(),
    );

    let user = get_json(http, &config.user_info_endpoint, &headers, &Params::new()).await?;
    let emails_url = format!("{}/emails", config.user_info_endpoint.trim_end_matches('/'));
    let emails = get_json(http, &emails_url, &headers, &Params::new()).await?;

    let mut raw = Map::new();
    raw.insert("user".to_string(), user);
    raw.insert("emails".to_string(), primary_first(emails, "primary"));

    map_user_info(
        config,
        RawUserInfo {
            from_id_token_payload: None,
            from_user_info_api: Some(raw),
        },
    )
}

/// Move the entry flagged `primary_key` to the front of an email list.
pub(crate) fn primary_first(emails: Value, primary_key: &str) -> Value {
    match emails {
        Value::Array(mut items) => {
            if let Some(index) = items
                .iter()
                .position(|item| item.get(primary_key).and_then(Value::as_bool) == Some(true))
            {
                let primary = items.remove(index);
                items.insert(0, primary);
            }
            Value::Array(items)
        }
        other => other,
    }
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
