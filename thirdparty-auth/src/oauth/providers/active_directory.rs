//! Microsoft Entra ID (Azure Active Directory), discovered per directory.

use super::{config_layer, default_oidc_user_info_map, default_scope, required_additional_config};
use crate::config::{set_if_empty, ProviderClientConfig};
use crate::error::Error;
use crate::oauth::provider::ProviderLayer;

fn apply_defaults(mut config: ProviderClientConfig) -> Result<ProviderClientConfig, Error> {
    set_if_empty(&mut config.name, "Active Directory");
    if config.oidc_discovery_endpoint.is_empty() {
        let directory_id = required_additional_config(&config, "directoryId", "Active Directory")?;
        config.oidc_discovery_endpoint =
            format!("https://login.microsoftonline.com/{}/v2.0/", directory_id);
    }
    default_scope(&mut config, &["openid", "email"]);
    default_oidc_user_info_map(&mut config);
    Ok(config)
}

pub(crate) fn layer() -> ProviderLayer {
    config_layer(apply_defaults)
}
