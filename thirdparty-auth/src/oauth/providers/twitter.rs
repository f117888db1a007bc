//! Twitter (X) OAuth 2.0.
//!
//! PKCE is mandatory and confidential clients authenticate the token request
//! with HTTP Basic instead of a `client_secret` form field.

use super::{config_layer, default_scope};
use crate::config::{set_if_empty, ProviderClientConfig};
use crate::error::Error;
use crate::http::HttpClient;
use crate::oauth::engine::{
    post_token_request, require_token_endpoint, token_request_params, EngineContext,
};
use crate::oauth::params::Params;
use crate::oauth::provider::ProviderLayer;
use crate::oauth::types::{OAuthTokens, RedirectUriInfo};
use crate::oauth::user_info::resolve_from_user_info_api;

const AUTHORIZATION_ENDPOINT: &str = "https://twitter.com/i/oauth2/authorize";
const TOKEN_ENDPOINT: &str = "https://api.twitter.com/2/oauth2/token";
const USER_INFO_ENDPOINT: &str = "https://api.twitter.com/2/users/me";

fn apply_defaults(mut config: ProviderClientConfig) -> Result<ProviderClientConfig, Error> {
    set_if_empty(&mut config.name, "Twitter");
    set_if_empty(&mut config.authorization_endpoint, AUTHORIZATION_ENDPOINT);
    set_if_empty(&mut config.token_endpoint, TOKEN_ENDPOINT);
    set_if_empty(&mut config.user_info_endpoint, USER_INFO_ENDPOINT);
    default_scope(&mut config, &["users.read", "tweet.read"]);
    config.force_pkce = true;
    config
        .user_info_map
        .from_user_info_api
        .or_defaults("data.id", "", "");
    Ok(config)
}

fn token_params(config: &ProviderClientConfig, redirect_uri_info: &RedirectUriInfo) -> Result<Params, Error> {
    let mut params = token_request_params(config, redirect_uri_info)?;
    params.remove("client_secret");
    Ok(params)
}

async fn exchange(
    http: &HttpClient,
    config: &ProviderClientConfig,
    redirect_uri_info: &RedirectUriInfo,
) -> Result<OAuthTokens, Error> {
    require_token_endpoint(config)?;
    let params = token_params(config, redirect_uri_info)?;

    let client_id = params.get("client_id").cloned().unwrap_or_default();
    let basic_auth = (!config.client_secret.is_empty())
        .then(|| (client_id.as_str(), config.client_secret.as_str()));

    post_token_request(http, &config.token_endpoint, &params, basic_auth).await
}

pub(crate) fn layer(ctx: EngineContext) -> ProviderLayer {
    let defaults = config_layer(apply_defaults);
    ProviderLayer::new(move |hooks| {
        let exchange_http = ctx.http.clone();
        let user_info_http = ctx.http.clone();
        defaults
            .apply(hooks)
            .with_exchange_auth_code_for_oauth_tokens(move |config, redirect_uri_info| {
                let http = exchange_http.clone();
                async move { exchange(&http, &config, &redirect_uri_info).await }
            })
            .with_get_user_info(move |config, tokens| {
                let http = user_info_http.clone();
                async move { resolve_from_user_info_api(&http, &config, &tokens).await }
            })
    })
}
