//! OIDC provider discovery via the `.well-known` document.
//!
//! Discovery is advisory: it only fills endpoints that are not configured, and
//! any failure leaves the configuration as it was.

use log::{debug, warn};
use serde::Deserialize;

use crate::config::{set_if_empty, ProviderClientConfig};
use crate::error::{upstream_error, Error, UpstreamErrorKind};
use crate::http::HttpClient;

const WELL_KNOWN_SUFFIX: &str = "/.well-known/openid-configuration";

/// The subset of the discovery document the engine uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OidcConfiguration {
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
}

/// Append the well-known suffix unless the endpoint already ends with it.
pub fn normalise_discovery_endpoint(endpoint: &str) -> String {
    if endpoint.ends_with(WELL_KNOWN_SUFFIX) {
        endpoint.to_string()
    } else {
        format!("{}{}", endpoint.trim_end_matches('/'), WELL_KNOWN_SUFFIX)
    }
}

/// Fetch and parse a discovery document.
pub async fn fetch_oidc_configuration(
    http: &HttpClient,
    endpoint: &str,
) -> Result<OidcConfiguration, Error> {
    let url = normalise_discovery_endpoint(endpoint);
    debug!("Fetching OIDC discovery document from {}", url);

    let response = http.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(upstream_error(
            UpstreamErrorKind::DiscoveryFailed {
                status: status.as_u16(),
            },
            &format!("Discovery endpoint {} answered {}", url, status),
        ));
    }
    Ok(response.json::<OidcConfiguration>().await?)
}

/// Fill unset endpoints from the discovery document, if one is configured.
pub async fn augment(http: &HttpClient, mut config: ProviderClientConfig) -> ProviderClientConfig {
    if config.oidc_discovery_endpoint.is_empty() {
        return config;
    }
    let nothing_to_fill = !config.authorization_endpoint.is_empty()
        && !config.token_endpoint.is_empty()
        && !config.user_info_endpoint.is_empty()
        && !config.jwks_uri.is_empty();
    if nothing_to_fill {
        return config;
    }

    match fetch_oidc_configuration(http, &config.oidc_discovery_endpoint).await {
        Ok(discovered) => {
            let fill = |field: &mut String, value: &Option<String>| {
                if let Some(value) = value {
                    set_if_empty(field, value);
                }
            };
            fill(&mut config.authorization_endpoint, &discovered.authorization_endpoint);
            fill(&mut config.token_endpoint, &discovered.token_endpoint);
            fill(&mut config.user_info_endpoint, &discovered.userinfo_endpoint);
            fill(&mut config.jwks_uri, &discovered.jwks_uri);
        }
        Err(e) => warn!(
            "OIDC discovery failed for {}, using configured endpoints: {}",
            config.third_party_id, e
        ),
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::http::HttpClientBuilder;
    use mockito::Server;

    fn http() -> HttpClient {
        HttpClientBuilder::new().build().unwrap()
    }

    fn discovery_body(base: &str) -> String {
        serde_json::json!({
            "issuer": base,
            "authorization_endpoint": format!("{base}/authorize"),
            "token_endpoint": format!("{base}/token"),
            "userinfo_endpoint": format!("{base}/userinfo"),
            "jwks_uri": format!("{base}/jwks"),
        })
        .to_string()
    }

    #[test]
    fn test_normalise_discovery_endpoint() {
        assert_eq!(
            normalise_discovery_endpoint("https://accounts.google.com/"),
            "https://accounts.google.com/.well-known/openid-configuration"
        );
        assert_eq!(
            normalise_discovery_endpoint("https://idp.example/.well-known/openid-configuration"),
            "https://idp.example/.well-known/openid-configuration"
        );
    }

    #[tokio::test]
    async fn test_augment_fills_only_missing_endpoints() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(200)
            .with_body(discovery_body(&server.url()))
            .create_async()
            .await;

        let config = ProviderClientConfig {
            oidc_discovery_endpoint: server.url(),
            token_endpoint: "https://explicit.example/token".to_string(),
            ..Default::default()
        };

        let config = augment(&http(), config).await;

        assert_eq!(config.authorization_endpoint, format!("{}/authorize", server.url()));
        assert_eq!(config.token_endpoint, "https://explicit.example/token");
        assert_eq!(config.user_info_endpoint, format!("{}/userinfo", server.url()));
        assert_eq!(config.jwks_uri, format!("{}/jwks", server.url()));
    }

    #[tokio::test]
    async fn test_augment_swallows_failures() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(500)
            .create_async()
            .await;

        let config = ProviderClientConfig {
            oidc_discovery_endpoint: server.url(),
            token_endpoint: "https://explicit.example/token".to_string(),
            ..Default::default()
        };

        let config = augment(&http(), config).await;

        assert_eq!(config.token_endpoint, "https://explicit.example/token");
        assert!(config.authorization_endpoint.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_non_2xx_is_an_upstream_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(404)
            .create_async()
            .await;

        let err = fetch_oidc_configuration(&http(), &server.url())
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Upstream(UpstreamErrorKind::DiscoveryFailed { status: 404 })
        );
    }

    #[tokio::test]
    async fn test_augment_without_endpoint_is_a_no_op() {
        let config = augment(&http(), ProviderClientConfig::default()).await;
        assert!(config.authorization_endpoint.is_empty());
    }
}
