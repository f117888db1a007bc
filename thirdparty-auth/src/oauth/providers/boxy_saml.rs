//! BoxyHQ SAML Jackson, which fronts SAML IdPs with an OAuth2 facade.

use super::{config_layer, default_scope};
use crate::config::{set_if_empty, ProviderClientConfig};
use crate::error::Error;
use crate::oauth::provider::ProviderLayer;

fn apply_defaults(mut config: ProviderClientConfig) -> Result<ProviderClientConfig, Error> {
    set_if_empty(&mut config.name, "SAML");
    if let Some(boxy_url) = config.additional_config_str("boxyURL") {
        let boxy_url = boxy_url.trim_end_matches('/').to_string();
        set_if_empty(
            &mut config.authorization_endpoint,
            &format!("{}/api/oauth/authorize", boxy_url),
        );
        set_if_empty(
            &mut config.token_endpoint,
            &format!("{}/api/oauth/token", boxy_url),
        );
        set_if_empty(
            &mut config.user_info_endpoint,
            &format!("{}/api/oauth/userinfo", boxy_url),
        );
    }
    default_scope(&mut config, &["openid", "email"]);
    config
        .user_info_map
        .from_user_info_api
        .or_defaults("id", "email", "");
    Ok(config)
}

pub(crate) fn layer() -> ProviderLayer {
    config_layer(apply_defaults)
}
