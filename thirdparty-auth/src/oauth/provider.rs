//! Provider hooks and their composition.
//!
//! A provider is four async hooks. The generic engine supplies the innermost
//! implementation; named-provider defaults and the caller's override are
//! [`ProviderLayer`]s that each receive the hooks built so far and return new
//! ones, usually by capturing a previous hook and post-processing its result.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};

use super::discovery;
use super::types::{AuthorisationRedirect, OAuthTokens, RedirectUriInfo, UserInfo};
use crate::config::{ProviderClientConfig, ProviderConfig};
use crate::error::Error;
use crate::http::HttpClient;

pub type HookFuture<T> = BoxFuture<'static, Result<T, Error>>;

pub type GetConfigForClientType =
    Arc<dyn Fn(Option<String>) -> HookFuture<ProviderClientConfig> + Send + Sync>;
pub type GetAuthorisationRedirectUrl =
    Arc<dyn Fn(ProviderClientConfig, String) -> HookFuture<AuthorisationRedirect> + Send + Sync>;
pub type ExchangeAuthCodeForOAuthTokens =
    Arc<dyn Fn(ProviderClientConfig, RedirectUriInfo) -> HookFuture<OAuthTokens> + Send + Sync>;
pub type GetUserInfo =
    Arc<dyn Fn(ProviderClientConfig, OAuthTokens) -> HookFuture<UserInfo> + Send + Sync>;

/// The overridable surface of a provider.
#[derive(Clone)]
pub struct ProviderHooks {
    pub get_config_for_client_type: GetConfigForClientType,
    pub get_authorisation_redirect_url: GetAuthorisationRedirectUrl,
    pub exchange_auth_code_for_oauth_tokens: ExchangeAuthCodeForOAuthTokens,
    pub get_user_info: GetUserInfo,
}

impl ProviderHooks {
    /// Post-process the config returned by the current `get_config_for_client_type`.
    pub fn map_config<F>(mut self, f: F) -> Self
    where
        F: Fn(ProviderClientConfig) -> Result<ProviderClientConfig, Error> + Send + Sync + 'static,
    {
        let previous = self.get_config_for_client_type.clone();
        let f = Arc::new(f);
        self.get_config_for_client_type = Arc::new(move |client_type: Option<String>| {
            let pending = previous(client_type);
            let f = f.clone();
            async move { f(pending.await?) }.boxed()
        });
        self
    }

    pub fn with_get_authorisation_redirect_url<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ProviderClientConfig, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<AuthorisationRedirect, Error>> + Send + 'static,
    {
        self.get_authorisation_redirect_url =
            Arc::new(move |config: ProviderClientConfig, redirect_uri: String| {
                f(config, redirect_uri).boxed()
            });
        self
    }

    pub fn with_exchange_auth_code_for_oauth_tokens<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ProviderClientConfig, RedirectUriInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<OAuthTokens, Error>> + Send + 'static,
    {
        self.exchange_auth_code_for_oauth_tokens =
            Arc::new(move |config: ProviderClientConfig, redirect_uri_info: RedirectUriInfo| {
                f(config, redirect_uri_info).boxed()
            });
        self
    }

    pub fn with_get_user_info<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ProviderClientConfig, OAuthTokens) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<UserInfo, Error>> + Send + 'static,
    {
        self.get_user_info = Arc::new(move |config: ProviderClientConfig, tokens: OAuthTokens| {
            f(config, tokens).boxed()
        });
        self
    }
}

impl fmt::Debug for ProviderHooks {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("ProviderHooks")
    }
}

/// One interceptor in a provider's chain.
#[derive(Clone)]
pub struct ProviderLayer(Arc<dyn Fn(ProviderHooks) -> ProviderHooks + Send + Sync>);

impl ProviderLayer {
    pub fn new<F>(layer: F) -> Self
    where
        F: Fn(ProviderHooks) -> ProviderHooks + Send + Sync + 'static,
    {
        Self(Arc::new(layer))
    }

    pub fn apply(&self, hooks: ProviderHooks) -> ProviderHooks {
        (self.0)(hooks)
    }
}

impl fmt::Debug for ProviderLayer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("ProviderLayer")
    }
}

/// Apply `layers` in order, each wrapping everything before it.
pub fn compose<I>(base: ProviderHooks, layers: I) -> ProviderHooks
where
    I: IntoIterator<Item = ProviderLayer>,
{
    layers
        .into_iter()
        .fold(base, |hooks, layer| layer.apply(hooks))
}

/// A provider as declared by the integrator: static config plus an optional
/// override applied after every built-in layer.
#[derive(Debug, Clone)]
pub struct ProviderInput {
    pub config: ProviderConfig,
    pub override_layer: Option<ProviderLayer>,
}

impl ProviderInput {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            override_layer: None,
        }
    }

    pub fn with_override(mut self, layer: ProviderLayer) -> Self {
        self.override_layer = Some(layer);
        self
    }
}

/// A fully composed provider, ready to run both OAuth legs.
#[derive(Debug, Clone)]
pub struct Provider {
    id: String,
    tenant_id: Option<String>,
    hooks: ProviderHooks,
    http: HttpClient,
}

impl Provider {
    pub fn new(id: String, hooks: ProviderHooks, http: HttpClient) -> Self {
        Self {
            id,
            tenant_id: None,
            hooks,
            http,
        }
    }

    /// Resolved configs from this provider carry `tenant_id`.
    pub fn with_tenant(mut self, tenant_id: Option<&str>) -> Self {
        self.tenant_id = tenant_id.filter(|t| !t.is_empty()).map(str::to_string);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run the config chain, then fill unset endpoints through discovery.
    pub async fn get_config_for_client_type(
        &self,
        client_type: Option<&str>,
    ) -> Result<ProviderClientConfig, Error> {
        let config = (self.hooks.get_config_for_client_type)(client_type.map(str::to_string))
            .await?
            .with_tenant(self.tenant_id.clone());
        Ok(discovery::augment(&self.http, config).await)
    }

    pub async fn get_authorisation_redirect_url(
        &self,
        config: &ProviderClientConfig,
        redirect_uri_on_provider_dashboard: &str,
    ) -> Result<AuthorisationRedirect, Error> {
        (self.hooks.get_authorisation_redirect_url)(
            config.clone(),
            redirect_uri_on_provider_dashboard.to_string(),
        )
        .await
    }

    pub async fn exchange_auth_code_for_oauth_tokens(
        &self,
        config: &ProviderClientConfig,
        redirect_uri_info: RedirectUriInfo,
    ) -> Result<OAuthTokens, Error> {
        (self.hooks.exchange_auth_code_for_oauth_tokens)(config.clone(), redirect_uri_info).await
    }

    pub async fn get_user_info(
        &self,
        config: &ProviderClientConfig,
        tokens: OAuthTokens,
    ) -> Result<UserInfo, Error> {
        (self.hooks.get_user_info)(config.clone(), tokens).await
    }
}
