//! The third-party sign-in recipe: the entry point a backend embeds.
//!
//! `ThirdParty` holds the statically declared providers and resolves, per
//! request, the provider for a third-party id with the tenant's core
//! configuration merged in.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info};

use crate::config::merge_static_and_core;
use crate::error::{config_error, ConfigErrorKind, Error};
use crate::http::HttpClient;
use crate::oauth::{
    create_provider, AuthorisationRedirect, EngineContext, JwksCache, Provider, ProviderInput,
    ProviderKind, RedirectUriInfo, UserInfo,
};
use crate::querier::CoreQuerier;

pub struct ThirdParty {
    providers: Vec<ProviderInput>,
    querier: Arc<dyn CoreQuerier>,
    ctx: EngineContext,
}

impl ThirdParty {
    /// Validate the static providers and build the recipe.
    ///
    /// Every third-party id must resolve to a known provider kind and appear
    /// only once.
    pub fn new(
        providers: Vec<ProviderInput>,
        querier: Arc<dyn CoreQuerier>,
        http: HttpClient,
    ) -> Result<Self, Error> {
        let mut seen = HashSet::new();
        for input in &providers {
            let third_party_id = &input.config.third_party_id;
            ProviderKind::from_third_party_id(third_party_id)?;
            if !seen.insert(third_party_id.clone()) {
                return Err(config_error(
                    ConfigErrorKind::InvalidValue,
                    &format!("The providers array has multiple entries for {}", third_party_id),
                ));
            }
        }

        Ok(Self {
            providers,
            querier,
            ctx: EngineContext::new(http),
        })
    }

    /// Share a JWKS cache with other engines or use a custom TTL.
    pub fn with_jwks_cache(mut self, jwks: Arc<JwksCache>) -> Self {
        self.ctx = self.ctx.with_jwks_cache(jwks);
        self
    }

    /// Build the provider for `third_party_id`, merged with the tenant's core
    /// configuration when a tenant is given.
    pub async fn get_provider(
        &self,
        third_party_id: &str,
        tenant_id: Option<&str>,
    ) -> Result<Provider, Error> {
        let merged;
        let inputs = match tenant_id {
            Some(tenant_id) => {
                let core_configs = self.querier.fetch_tenant_provider_configs(tenant_id).await?;
                debug!(
                    "Tenant {} has {} provider configs in core",
                    tenant_id,
                    core_configs.len()
                );
                merged = merge_static_and_core(&self.providers, &core_configs);
                &merged
            }
            None => &self.providers,
        };

        let input = inputs
            .iter()
            .find(|input| input.config.third_party_id == third_party_id)
            .ok_or_else(|| {
                config_error(
                    ConfigErrorKind::UnknownProvider,
                    &format!("The provider {} could not be found in the configuration", third_party_id),
                )
            })?;

        Ok(create_provider(input, &self.ctx)?.with_tenant(tenant_id))
    }

    /// First leg: the URL to send the browser to and the PKCE verifier to keep.
    pub async fn get_authorisation_redirect_url(
        &self,
        third_party_id: &str,
        client_type: Option<&str>,
        tenant_id: Option<&str>,
        redirect_uri_on_provider_dashboard: &str,
    ) -> Result<AuthorisationRedirect, Error> {
        let provider = self.get_provider(third_party_id, tenant_id).await?;
        let config = provider.get_config_for_client_type(client_type).await?;

        let redirect = provider
            .get_authorisation_redirect_url(&config, redirect_uri_on_provider_dashboard)
            .await?;
        info!("Built authorisation redirect for {}", third_party_id);
        Ok(redirect)
    }

    /// Second leg: exchange the callback's code and resolve the user.
    pub async fn exchange_and_get_user_info(
        &self,
        third_party_id: &str,
        client_type: Option<&str>,
        tenant_id: Option<&str>,
        redirect_uri_info: RedirectUriInfo,
    ) -> Result<UserInfo, Error> {
        let provider = self.get_provider(third_party_id, tenant_id).await?;
        let config = provider.get_config_for_client_type(client_type).await?;

        let tokens = provider
            .exchange_auth_code_for_oauth_tokens(&config, redirect_uri_info)
            .await?;
        let user_info = provider.get_user_info(&config, tokens).await?;
        info!(
            "Resolved {} user {}",
            third_party_id, user_info.third_party_user_id
        );
        Ok(user_info)
    }
}
