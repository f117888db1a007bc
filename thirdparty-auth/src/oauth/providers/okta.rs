//! Okta, discovered from the org's domain.

use super::{config_layer, default_oidc_user_info_map, default_scope, required_additional_config};
use crate::config::{set_if_empty, ProviderClientConfig};
use crate::error::Error;
use crate::oauth::provider::ProviderLayer;

fn apply_defaults(mut config: ProviderClientConfig) -> Result<ProviderClientConfig, Error> {
    set_if_empty(&mut config.name, "Okta");
    if config.oidc_discovery_endpoint.is_empty() {
        let okta_domain = required_additional_config(&config, "oktaDomain", "Okta")?;
        config.oidc_discovery_endpoint = okta_domain.to_string();
    }
    default_scope(&mut config, &["openid", "email"]);
    default_oidc_user_info_map(&mut config);
    Ok(config)
}

pub(crate) fn layer() -> ProviderLayer {
    config_layer(apply_defaults)
}
