//! GitLab, discovered from `gitlab.com` or a self-managed instance.

use super::{config_layer, default_oidc_user_info_map, default_scope};
use crate::config::{set_if_empty, ProviderClientConfig};
use crate::error::Error;
use crate::oauth::provider::ProviderLayer;

const DEFAULT_BASE_URL: &str = "https://gitlab.com";

fn apply_defaults(mut config: ProviderClientConfig) -> Result<ProviderClientConfig, Error> {
    set_if_empty(&mut config.name, "Gitlab");
    if config.oidc_discovery_endpoint.is_empty() {
        config.oidc_discovery_endpoint = config
            .additional_config_str("gitlabBaseUrl")
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string();
    }
    default_scope(&mut config, &["openid", "email"]);
    default_oidc_user_info_map(&mut config);
    Ok(config)
}

pub(crate) fn layer() -> ProviderLayer {
    config_layer(apply_defaults)
}
