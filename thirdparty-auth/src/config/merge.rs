//! Merging static provider configuration with tenant configuration from the core.

use log::debug;

use super::types::{overwrite_if_set, ProviderConfig};
use crate::oauth::ProviderInput;

/// Overlay the core's tenant configuration on the static provider inputs.
///
/// With no core configs the static inputs are returned verbatim. Otherwise the
/// core list is the tenant's whole provider set: each core config is merged
/// with the static input of the same `third_party_id` (see [`merge_config`])
/// and keeps that input's `override_layer`. Static providers the core does not
/// list are not available to the tenant.
pub fn merge_static_and_core(
    static_inputs: &[ProviderInput],
    core_configs: &[ProviderConfig],
) -> Vec<ProviderInput> {
    if core_configs.is_empty() {
        return static_inputs.to_vec();
    }

    core_configs
        .iter()
        .map(|core| {
            match static_inputs
                .iter()
                .find(|input| input.config.third_party_id == core.third_party_id)
            {
                Some(input) => ProviderInput {
                    config: merge_config(&input.config, core),
                    override_layer: input.override_layer.clone(),
                },
                None => {
                    debug!("Adding core-only provider {}", core.third_party_id);
                    ProviderInput::new(core.clone())
                }
            }
        })
        .collect()
}

/// Merge one static config with the core's config for the same provider.
///
/// Every non-empty scalar or map on the core config replaces the static value.
/// Clients are matched by `client_type`: a core client replaces the matching
/// static client in place, and a core client with no static counterpart is
/// not added. Function-valued hooks always come from the static config.
pub fn merge_config(static_config: &ProviderConfig, core: &ProviderConfig) -> ProviderConfig {
    let mut merged = static_config.clone();

    overwrite_if_set(&mut merged.name, &core.name);
    overwrite_if_set(&mut merged.authorization_endpoint, &core.authorization_endpoint);
    overwrite_if_set(&mut merged.token_endpoint, &core.token_endpoint);
    overwrite_if_set(&mut merged.user_info_endpoint, &core.user_info_endpoint);
    overwrite_if_set(&mut merged.jwks_uri, &core.jwks_uri);
    overwrite_if_set(&mut merged.oidc_discovery_endpoint, &core.oidc_discovery_endpoint);

    if !core.authorization_endpoint_query_params.is_empty() {
        merged.authorization_endpoint_query_params =
            core.authorization_endpoint_query_params.clone();
    }
    if !core.token_endpoint_body_params.is_empty() {
        merged.token_endpoint_body_params = core.token_endpoint_body_params.clone();
    }
    if !core.user_info_endpoint_query_params.is_empty() {
        merged.user_info_endpoint_query_params = core.user_info_endpoint_query_params.clone();
    }
    if !core.user_info_endpoint_headers.is_empty() {
        merged.user_info_endpoint_headers = core.user_info_endpoint_headers.clone();
    }

    merged
        .user_info_map
        .from_id_token_payload
        .overwrite_with(&core.user_info_map.from_id_token_payload);
    merged
        .user_info_map
        .from_user_info_api
        .overwrite_with(&core.user_info_map.from_user_info_api);

    if core.require_email.is_some() {
        merged.require_email = core.require_email;
    }

    for core_client in &core.clients {
        match merged
            .clients
            .iter_mut()
            .find(|client| client.client_type == core_client.client_type)
        {
            Some(slot) => *slot = core_client.clone(),
            // TODO: decide with the core team whether core-only client types
            // should be appended; today they are ignored.
            None => debug!(
                "Ignoring core client type '{}' for {}: no static counterpart",
                core_client.client_type, core.third_party_id
            ),
        }
    }

    merged
}
