//! Built-in provider defaults, each a layer over the generic engine.
//!
//! Defaults only fill what the integrator or the core left unset. Providers
//! without a usable OIDC userinfo endpoint replace `get_user_info` with their
//! own REST calls.

use std::sync::Arc;

use super::params::{ParamOverride, ParamOverrides};
use super::provider::ProviderLayer;
use crate::config::ProviderClientConfig;
use crate::error::{config_error, ConfigErrorKind, Error};

pub mod active_directory;
pub mod apple;
pub mod bitbucket;
pub mod boxy_saml;
pub mod discord;
pub mod facebook;
pub mod github;
pub mod gitlab;
pub mod google;
pub mod google_workspaces;
pub mod linkedin;
pub mod okta;
pub mod twitter;

/// A layer that post-processes every resolved config with `f`.
pub(crate) fn config_layer<F>(f: F) -> ProviderLayer
where
    F: Fn(ProviderClientConfig) -> Result<ProviderClientConfig, Error> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    ProviderLayer::new(move |hooks| {
        let f = f.clone();
        hooks.map_config(move |config| f(config))
    })
}

pub(crate) fn default_scope(config: &mut ProviderClientConfig, scope: &[&str]) {
    if config.scope.is_empty() {
        config.scope = scope.iter().map(|s| s.to_string()).collect();
    }
}

/// Set `key` unless it is already set or explicitly removed.
pub(crate) fn default_param(overrides: &mut ParamOverrides, key: &str, value: &str) {
    let entry = overrides.entry(key.to_string()).or_default();
    if *entry == ParamOverride::Keep {
        *entry = ParamOverride::set(value);
    }
}

/// Standard OIDC claim names for both user info sources.
pub(crate) fn default_oidc_user_info_map(config: &mut ProviderClientConfig) {
    config
        .user_info_map
        .from_id_token_payload
        .or_defaults("sub", "email", "email_verified");
    config
        .user_info_map
        .from_user_info_api
        .or_defaults("sub", "email", "email_verified");
}

pub(crate) fn required_additional_config<'a>(
    config: &'a ProviderClientConfig,
    key: &str,
    provider_name: &str,
) -> Result<&'a str, Error> {
    config.additional_config_str(key).ok_or_else(|| {
        config_error(
            ConfigErrorKind::InvalidValue,
            &format!(
                "Please provide the {} in the additionalConfig of the {} provider.",
                key, provider_name
            ),
        )
    })
}
