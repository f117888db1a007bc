//! Provider and client configuration types.
//!
//! `ProviderConfig` is what an integrator (or the core service, per tenant)
//! declares; `ProviderClientConfig` is the fully merged view for one flow.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::oauth::params::ParamOverrides;

/// Decoded claims of a verified ID token.
pub type IdTokenPayload = Map<String, Value>;

/// Custom check run on every verified ID token payload.
#[derive(Clone)]
pub struct IdTokenPayloadValidator(
    Arc<dyn Fn(&IdTokenPayload, &ProviderClientConfig) -> Result<(), Error> + Send + Sync>,
);

impl IdTokenPayloadValidator {
    pub fn new<F>(validate: F) -> Self
    where
        F: Fn(&IdTokenPayload, &ProviderClientConfig) -> Result<(), Error> + Send + Sync + 'static,
    {
        Self(Arc::new(validate))
    }

    pub fn validate(
        &self,
        payload: &IdTokenPayload,
        config: &ProviderClientConfig,
    ) -> Result<(), Error> {
        (self.0)(payload, config)
    }
}

impl fmt::Debug for IdTokenPayloadValidator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("IdTokenPayloadValidator")
    }
}

/// Builds a placeholder email from `(third_party_user_id, third_party_id)`.
#[derive(Clone)]
pub struct FakeEmailGenerator(Arc<dyn Fn(&str, &str) -> String + Send + Sync>);

impl FakeEmailGenerator {
    pub fn new<F>(generate: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(generate))
    }

    pub fn generate(&self, third_party_user_id: &str, third_party_id: &str) -> String {
        (self.0)(third_party_user_id, third_party_id)
    }
}

impl Default for FakeEmailGenerator {
    fn default() -> Self {
        Self::new(|user_id, third_party_id| {
            format!("{}.{}@fakeemail.invalid", user_id, third_party_id)
        })
    }
}

impl fmt::Debug for FakeEmailGenerator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("FakeEmailGenerator")
    }
}

/// Dot-delimited field paths into one raw user info source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoMapFields {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email_verified: String,
}

impl UserInfoMapFields {
    /// Fill each empty path with the given default.
    pub fn or_defaults(&mut self, user_id: &str, email: &str, email_verified: &str) {
        set_if_empty(&mut self.user_id, user_id);
        set_if_empty(&mut self.email, email);
        set_if_empty(&mut self.email_verified, email_verified);
    }

    /// Overwrite each path that `other` sets.
    pub(crate) fn overwrite_with(&mut self, other: &UserInfoMapFields) {
        overwrite_if_set(&mut self.user_id, &other.user_id);
        overwrite_if_set(&mut self.email, &other.email);
        overwrite_if_set(&mut self.email_verified, &other.email_verified);
    }
}

/// Where to find the canonical fields in each raw source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoMap {
    #[serde(default, deserialize_with = "null_as_default")]
    pub from_id_token_payload: UserInfoMapFields,
    #[serde(
        default,
        rename = "fromUserInfoAPI",
        deserialize_with = "null_as_default"
    )]
    pub from_user_info_api: UserInfoMapFields,
}

/// One credential set for a provider.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_type: String,
    pub client_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_secret: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scope: Vec<String>,
    #[serde(default, rename = "forcePKCE", deserialize_with = "null_as_default")]
    pub force_pkce: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub additional_config: Map<String, Value>,
}

/// Static configuration for one upstream provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub third_party_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clients: Vec<ClientConfig>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub authorization_endpoint: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authorization_endpoint_query_params: ParamOverrides,

    #[serde(default, deserialize_with = "null_as_default")]
    pub token_endpoint: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub token_endpoint_body_params: ParamOverrides,

    #[serde(default, deserialize_with = "null_as_default")]
    pub user_info_endpoint: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_info_endpoint_query_params: ParamOverrides,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_info_endpoint_headers: ParamOverrides,

    #[serde(default, rename = "jwksURI", deserialize_with = "null_as_default")]
    pub jwks_uri: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub oidc_discovery_endpoint: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub user_info_map: UserInfoMap,
    #[serde(default)]
    pub require_email: Option<bool>,

    #[serde(skip)]
    pub validate_id_token_payload: Option<IdTokenPayloadValidator>,
    #[serde(skip)]
    pub generate_fake_email: Option<FakeEmailGenerator>,
}

/// The merged configuration for one flow: provider-level settings plus exactly
/// one selected client.
#[derive(Debug, Clone, Default)]
pub struct ProviderClientConfig {
    pub third_party_id: String,
    pub name: String,
    /// Set when the flow was resolved for a tenant.
    pub tenant_id: Option<String>,

    pub client_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: Vec<String>,
    pub force_pkce: bool,
    pub additional_config: Map<String, Value>,

    pub authorization_endpoint: String,
    pub authorization_endpoint_query_params: ParamOverrides,
    pub token_endpoint: String,
    pub token_endpoint_body_params: ParamOverrides,
    pub user_info_endpoint: String,
    pub user_info_endpoint_query_params: ParamOverrides,
    pub user_info_endpoint_headers: ParamOverrides,
    pub jwks_uri: String,
    pub oidc_discovery_endpoint: String,

    pub user_info_map: UserInfoMap,
    pub require_email: bool,
    pub validate_id_token_payload: Option<IdTokenPayloadValidator>,
    pub generate_fake_email: Option<FakeEmailGenerator>,
}

impl ProviderClientConfig {
    /// Merge provider-level settings with one of its clients.
    pub fn from_parts(provider: &ProviderConfig, client: &ClientConfig) -> Self {
        Self {
            third_party_id: provider.third_party_id.clone(),
            name: provider.name.clone(),
            tenant_id: None,
            client_type: client.client_type.clone(),
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            scope: client.scope.clone(),
            force_pkce: client.force_pkce,
            additional_config: client.additional_config.clone(),
            authorization_endpoint: provider.authorization_endpoint.clone(),
            authorization_endpoint_query_params: provider
                .authorization_endpoint_query_params
                .clone(),
            token_endpoint: provider.token_endpoint.clone(),
            token_endpoint_body_params: provider.token_endpoint_body_params.clone(),
            user_info_endpoint: provider.user_info_endpoint.clone(),
            user_info_endpoint_query_params: provider.user_info_endpoint_query_params.clone(),
            user_info_endpoint_headers: provider.user_info_endpoint_headers.clone(),
            jwks_uri: provider.jwks_uri.clone(),
            oidc_discovery_endpoint: provider.oidc_discovery_endpoint.clone(),
            user_info_map: provider.user_info_map.clone(),
            require_email: provider.require_email.unwrap_or(true),
            validate_id_token_payload: provider.validate_id_token_payload.clone(),
            generate_fake_email: provider.generate_fake_email.clone(),
        }
    }

    /// PKCE is used iff there is no client secret or it is forced.
    pub fn uses_pkce(&self) -> bool {
        self.client_secret.is_empty() || self.force_pkce
    }

    /// A string value from `additional_config`, if present and non-empty.
    pub fn additional_config_str(&self, key: &str) -> Option<&str> {
        self.additional_config
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn with_tenant(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }
}

pub(crate) fn set_if_empty(field: &mut String, value: &str) {
    if field.is_empty() {
        *field = value.to_string();
    }
}

pub(crate) fn overwrite_if_set(field: &mut String, value: &str) {
    if !value.is_empty() {
        *field = value.to_string();
    }
}

// The core sends explicit nulls for unset fields.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
