//! Facebook Login via the Graph API.

use super::{config_layer, default_param, default_scope};
use crate::config::{set_if_empty, ProviderClientConfig};
use crate::error::Error;
use crate::oauth::provider::ProviderLayer;

const AUTHORIZATION_ENDPOINT: &str = "https://www.facebook.com/v12.0/dialog/oauth";
const TOKEN_ENDPOINT: &str = "https://graph.facebook.com/v12.0/oauth/access_token";
const USER_INFO_ENDPOINT: &str = "https://graph.facebook.com/me";

fn apply_defaults(mut config: ProviderClientConfig) -> Result<ProviderClientConfig, Error> {
    set_if_empty(&mut config.name, "Facebook");
    set_if_empty(&mut config.authorization_endpoint, AUTHORIZATION_ENDPOINT);
    set_if_empty(&mut config.token_endpoint, TOKEN_ENDPOINT);
    set_if_empty(&mut config.user_info_endpoint, USER_INFO_ENDPOINT);
    default_scope(&mut config, &["email"]);
    default_param(&mut config.user_info_endpoint_query_params, "fields", "id,email");
    config
        .user_info_map
        .from_user_info_api
        .or_defaults("id", "email", "");
    Ok(config)
}

pub(crate) fn layer() -> ProviderLayer {
    config_layer(apply_defaults)
}
