//! Google defaults.

use super::{config_layer, default_oidc_user_info_map, default_param, default_scope};
use crate::config::{set_if_empty, ProviderClientConfig};
use crate::error::Error;
use crate::oauth::provider::ProviderLayer;

const GOOGLE_DISCOVERY_ENDPOINT: &str = "https://accounts.google.com/";

pub(crate) fn apply_defaults(
    mut config: ProviderClientConfig,
) -> Result<ProviderClientConfig, Error> {
    set_if_empty(&mut config.name, "Google");
    set_if_empty(&mut config.oidc_discovery_endpoint, GOOGLE_DISCOVERY_ENDPOINT);
    default_scope(&mut config, &["openid", "email"]);

    let params = &mut config.authorization_endpoint_query_params;
    default_param(params, "include_granted_scopes", "true");
    default_param(params, "access_type", "offline");

    default_oidc_user_info_map(&mut config);
    Ok(config)
}

pub(crate) fn layer() -> ProviderLayer {
    config_layer(apply_defaults)
}
