//! Selecting the one client configuration a flow runs with.

use super::types::{ProviderClientConfig, ProviderConfig};
use crate::error::{config_error, ConfigErrorKind, Error};

/// Pick the client for `client_type` and merge it with the provider settings.
///
/// Without a client type the provider must have exactly one client.
pub fn select_client(
    config: &ProviderConfig,
    client_type: Option<&str>,
) -> Result<ProviderClientConfig, Error> {
    let client = match client_type {
        None => match config.clients.as_slice() {
            [only] => only,
            _ => {
                return Err(config_error(
                    ConfigErrorKind::AmbiguousClient,
                    "please provide exactly one client config or pass clientType or tenantId",
                ))
            }
        },
        Some(client_type) => config
            .clients
            .iter()
            .find(|client| client.client_type == client_type)
            .ok_or_else(|| {
                config_error(
                    ConfigErrorKind::ClientNotFound,
                    &format!("Could not find client config for clientType: {}", client_type),
                )
            })?,
    };

    Ok(ProviderClientConfig::from_parts(config, client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ClientConfig;
    use crate::error::ErrorKind;

    fn client(client_type: &str, client_id: &str) -> ClientConfig {
        ClientConfig {
            client_type: client_type.to_string(),
            client_id: client_id.to_string(),
            ..Default::default()
        }
    }

    fn provider(clients: Vec<ClientConfig>) -> ProviderConfig {
        ProviderConfig {
            third_party_id: "google".to_string(),
            clients,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_client_without_client_type() {
        let resolved = select_client(&provider(vec![client("", "only")]), None).unwrap();
        assert_eq!(resolved.client_id, "only");
    }

    #[test]
    fn test_multiple_clients_without_client_type_is_ambiguous() {
        let config = provider(vec![client("web", "w"), client("ios", "i")]);

        let err = select_client(&config, None).unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Config(ConfigErrorKind::AmbiguousClient));
        assert!(err
            .to_string()
            .contains("please provide exactly one client config or pass clientType or tenantId"));
    }

    #[test]
    fn test_no_clients_without_client_type_is_ambiguous() {
        let err = select_client(&provider(vec![]), None).unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Config(ConfigErrorKind::AmbiguousClient));
    }

    #[test]
    fn test_select_by_client_type() {
        let config = provider(vec![client("web", "w"), client("ios", "i")]);
        assert_eq!(select_client(&config, Some("ios")).unwrap().client_id, "i");
    }

    #[test]
    fn test_unknown_client_type() {
        let config = provider(vec![client("web", "w")]);

        let err = select_client(&config, Some("android")).unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Config(ConfigErrorKind::ClientNotFound));
        assert!(err
            .to_string()
            .contains("Could not find client config for clientType: android"));
    }
}
