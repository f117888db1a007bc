//! LinkedIn ("Sign In with LinkedIn using OpenID Connect").
//!
//! The ID token LinkedIn returns is not verified here; identity comes from the
//! userinfo endpoint alone.

use super::{config_layer, default_scope};
use crate::config::{set_if_empty, ProviderClientConfig};
use crate::error::Error;
use crate::oauth::engine::EngineContext;
use crate::oauth::provider::ProviderLayer;
use crate::oauth::user_info::resolve_from_user_info_api;

const AUTHORIZATION_ENDPOINT: &str = "https://www.linkedin.com/oauth/v2/authorization";
const TOKEN_ENDPOINT: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const USER_INFO_ENDPOINT: &str = "https://api.linkedin.com/v2/userinfo";

fn apply_defaults(mut config: ProviderClientConfig) -> Result<ProviderClientConfig, Error> {
    set_if_empty(&mut config.name, "LinkedIn");
    set_if_empty(&mut config.authorization_endpoint, AUTHORIZATION_ENDPOINT);
    set_if_empty(&mut config.token_endpoint, TOKEN_ENDPOINT);
    set_if_empty(&mut config.user_info_endpoint, USER_INFO_ENDPOINT);
    default_scope(&mut config, &["openid", "profile", "email"]);
    config
        .user_info_map
        .from_user_info_api
        .or_defaults("sub", "email", "email_verified");
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
