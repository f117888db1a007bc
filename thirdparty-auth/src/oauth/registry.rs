//! The closed set of built-in providers.

use log::debug;

use super::engine::{generic_hooks, EngineContext};
use super::provider::{compose, Provider, ProviderInput, ProviderLayer};
use super::providers;
use crate::error::{config_error, ConfigErrorKind, Error};

/// Built-in provider families a third-party id can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    ActiveDirectory,
    Apple,
    Bitbucket,
    BoxySaml,
    Discord,
    Facebook,
    Github,
    Gitlab,
    Google,
    GoogleWorkspaces,
    Linkedin,
    Okta,
    Twitter,
    Custom,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 14] = [
        ProviderKind::ActiveDirectory,
        ProviderKind::Apple,
        ProviderKind::Bitbucket,
        ProviderKind::BoxySaml,
        ProviderKind::Discord,
        ProviderKind::Facebook,
        ProviderKind::Github,
        ProviderKind::Gitlab,
        ProviderKind::Google,
        ProviderKind::GoogleWorkspaces,
        ProviderKind::Linkedin,
        ProviderKind::Okta,
        ProviderKind::Twitter,
        ProviderKind::Custom,
    ];

    /// Get the registered identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::ActiveDirectory => "active-directory",
            ProviderKind::Apple => "apple",
            ProviderKind::Bitbucket => "bitbucket",
            ProviderKind::BoxySaml => "boxy-saml",
            ProviderKind::Discord => "discord",
            ProviderKind::Facebook => "facebook",
            ProviderKind::Github => "github",
            ProviderKind::Gitlab => "gitlab",
            ProviderKind::Google => "google",
            ProviderKind::GoogleWorkspaces => "google-workspaces",
            ProviderKind::Linkedin => "linkedin",
            ProviderKind::Okta => "okta",
            ProviderKind::Twitter => "twitter",
            ProviderKind::Custom => "custom",
        }
    }

    /// Resolve a third-party id, which is either a registered id or a
    /// registered id followed by `-<label>`. The longest match wins, so
    /// `google-workspaces-acme` is Google Workspaces rather than Google.
    pub fn from_third_party_id(third_party_id: &str) -> Result<Self, Error> {
        Self::ALL
            .iter()
            .filter(|kind| {
                let id = kind.as_str();
                third_party_id == id
                    || third_party_id
                        .strip_prefix(id)
                        .and_then(|rest| rest.strip_prefix('-'))
                        .is_some_and(|label| !label.is_empty())
            })
            .max_by_key(|kind| kind.as_str().len())
            .copied()
            .ok_or_else(|| {
                config_error(
                    ConfigErrorKind::UnknownProvider,
                    &format!("Unknown third party provider: {}", third_party_id),
                )
            })
    }

    fn default_layer(&self, ctx: &EngineContext) -> Option<ProviderLayer> {
        match self {
            ProviderKind::ActiveDirectory => Some(providers::active_directory::layer()),
            ProviderKind::Apple => Some(providers::apple::layer()),
            ProviderKind::Bitbucket => Some(providers::bitbucket::layer(ctx.clone())),
            ProviderKind::BoxySaml => Some(providers::boxy_saml::layer()),
            ProviderKind::Discord => Some(providers::discord::layer(ctx.clone())),
            ProviderKind::Facebook => Some(providers::facebook::layer()),
            ProviderKind::Github => Some(providers::github::layer(ctx.clone())),
            ProviderKind::Gitlab => Some(providers::gitlab::layer()),
            ProviderKind::Google => Some(providers::google::layer()),
            ProviderKind::GoogleWorkspaces => Some(providers::google_workspaces::layer()),
            ProviderKind::Linkedin => Some(providers::linkedin::layer(ctx.clone())),
            ProviderKind::Okta => Some(providers::okta::layer()),
            ProviderKind::Twitter => Some(providers::twitter::layer(ctx.clone())),
            ProviderKind::Custom => None,
        }
    }
}

/// Build a provider: generic engine, then the kind's defaults, then the caller override.
pub fn create_provider(input: &ProviderInput, ctx: &EngineContext) -> Result<Provider, Error> {
    let third_party_id = &input.config.third_party_id;
    let kind = ProviderKind::from_third_party_id(third_party_id)?;
    debug!("Creating {} provider for {}", kind.as_str(), third_party_id);

    let base = generic_hooks(input.config.clone(), ctx.clone());
    let layers = kind
        .default_layer(ctx)
        .into_iter()
        .chain(input.override_layer.clone());

    Ok(Provider::new(
        third_party_id.clone(),
        compose(base, layers),
        ctx.http.clone(),
    ))
}
