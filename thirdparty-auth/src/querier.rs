//! Client for the core service that stores tenant-scoped provider configuration.

use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::error::{config_error, upstream_error, ConfigErrorKind, Error, UpstreamErrorKind};
use crate::http::HttpClient;

/// Source of tenant-scoped provider configuration.
#[async_trait]
pub trait CoreQuerier: Send + Sync {
    /// Fetch the third-party provider configs stored for `tenant_id`.
    async fn fetch_tenant_provider_configs(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<ProviderConfig>, Error>;
}

#[derive(Debug, Deserialize)]
struct TenantResponse {
    status: String,
    #[serde(default, rename = "thirdParty")]
    third_party: Option<TenantThirdParty>,
}

#[derive(Debug, Default, Deserialize)]
struct TenantThirdParty {
    #[serde(default)]
    providers: Vec<ProviderConfig>,
}

/// `CoreQuerier` talking to the core service over HTTP.
pub struct HttpCoreQuerier {
    http: HttpClient,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HttpCoreQuerier {
    /// Create a querier for the core at `base_url` (e.g. `http://localhost:3567`).
    pub fn new(http: HttpClient, base_url: &str) -> Result<Self, Error> {
        // Validate once up front so every request path is well-formed.
        url::Url::parse(base_url)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    /// Send this key in the `api-key` header of every request.
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    fn tenant_url(&self, tenant_id: &str) -> String {
        format!(
            "{}/{}/recipe/multitenancy/tenant/v2",
            self.base_url,
            urlencoding::encode(tenant_id)
        )
    }
}

#[async_trait]
impl CoreQuerier for HttpCoreQuerier {
    async fn fetch_tenant_provider_configs(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<ProviderConfig>, Error> {
        let url = self.tenant_url(tenant_id);
        debug!("Fetching provider configs for tenant {} from core", tenant_id);

        let mut request = self.http.get(&url);
        if let Some(api_key) = &self.api_key {
            request = request.header("api-key", api_key.expose_secret());
        }
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!("Core answered {} for tenant {}", status, tenant_id);
            return Err(upstream_error(
                UpstreamErrorKind::CoreRequestFailed {
                    status: status.as_u16(),
                },
                &body,
            ));
        }

        let tenant: TenantResponse = serde_json::from_str(&body)?;
        match tenant.status.as_str() {
            "OK" => Ok(tenant.third_party.unwrap_or_default().providers),
            "TENANT_NOT_FOUND_ERROR" => Err(config_error(
                ConfigErrorKind::UnknownTenant,
                &format!("Tenant {} does not exist in the core", tenant_id),
            )),
            other => Err(upstream_error(
                UpstreamErrorKind::InvalidResponse,
                &format!("Unexpected core status: {}", other),
            )),
        }
    }
}

/// `CoreQuerier` over a fixed in-memory map, for deployments without tenant
/// configuration in the core.
#[derive(Debug, Clone, Default)]
pub struct StaticCoreQuerier {
    tenants: HashMap<String, Vec<ProviderConfig>>,
}

impl StaticCoreQuerier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(mut self, tenant_id: &str, providers: Vec<ProviderConfig>) -> Self {
        self.tenants.insert(tenant_id.to_string(), providers);
        self
    }
}

#[async_trait]
impl CoreQuerier for StaticCoreQuerier {
    async fn fetch_tenant_provider_configs(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<ProviderConfig>, Error> {
        Ok(self.tenants.get(tenant_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::http::HttpClientBuilder;
    use mockito::Server;

    fn querier(url: &str) -> HttpCoreQuerier {
        HttpCoreQuerier::new(HttpClientBuilder::new().build().unwrap(), url)
            .unwrap()
            .with_api_key(SecretString::new("core-key".to_string()))
    }

    #[tokio::test]
    async fn test_fetch_tenant_provider_configs() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/t1/recipe/multitenancy/tenant/v2")
            .match_header("api-key", "core-key")
            .with_status(200)
            .with_body(
                r#"{
                    "status": "OK",
                    "thirdParty": {
                        "enabled": true,
                        "providers": [
                            {"thirdPartyId": "google", "clients": [{"clientType": "web", "clientId": "c1"}]}
                        ]
                    }
                }"#,
            )
            .create_async()
            .await;

        let configs = querier(&server.url())
            .fetch_tenant_provider_configs("t1")
            .await
            .unwrap();

        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].third_party_id, "google");
        assert_eq!(configs[0].clients[0].client_id, "c1");
    }

    #[tokio::test]
    async fn test_unknown_tenant() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/nope/recipe/multitenancy/tenant/v2")
            .with_status(200)
            .with_body(r#"{"status": "TENANT_NOT_FOUND_ERROR"}"#)
            .create_async()
            .await;

        let err = querier(&server.url())
            .fetch_tenant_provider_configs("nope")
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Config(ConfigErrorKind::UnknownTenant));
    }

    #[tokio::test]
    async fn test_core_failure_carries_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/t1/recipe/multitenancy/tenant/v2")
            .with_status(401)
            .with_body("Invalid API key")
            .create_async()
            .await;

        let err = querier(&server.url())
            .fetch_tenant_provider_configs("t1")
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Upstream(UpstreamErrorKind::CoreRequestFailed { status: 401 })
        );
    }

    #[tokio::test]
    async fn test_static_querier() {
        let querier = StaticCoreQuerier::new().with_tenant(
            "t1",
            vec![ProviderConfig {
                third_party_id: "github".to_string(),
                ..Default::default()
            }],
        );

        assert_eq!(querier.fetch_tenant_provider_configs("t1").await.unwrap().len(), 1);
        assert!(querier.fetch_tenant_provider_configs("t2").await.unwrap().is_empty());
    }
}
