//! Turning provider tokens into the canonical user identity.

use log::{debug, warn};
use serde_json::{Map, Value};

use super::engine::EngineContext;
use super::id_token::verify_id_token;
use super::params::{apply_overrides, Params};
use super::types::{OAuthTokens, RawUserInfo, UserInfo, UserInfoEmail};
use crate::config::ProviderClientConfig;
use crate::error::{
    data_mapping_error, upstream_error, DataMappingErrorKind, Error, UpstreamErrorKind,
};
use crate::http::HttpClient;

/// Collect raw user info from the verified ID token and the userinfo endpoint,
/// then map it onto the canonical identity.
pub async fn resolve_user_info(
    ctx: &EngineContext,
    config: &ProviderClientConfig,
    tokens: &OAuthTokens,
) -> Result<UserInfo, Error> {
    let mut raw = RawUserInfo::default();

    if let Some(id_token) = tokens.id_token() {
        if !config.jwks_uri.is_empty() {
            let payload = verify_id_token(&ctx.jwks, &config.jwks_uri, id_token).await?;
            if let Some(validator) = &config.validate_id_token_payload {
                validator.validate(&payload, config)?;
            }
            raw.from_id_token_payload = Some(payload);
        }
    }

    if let Some(access_token) = tokens.access_token() {
        if !config.user_info_endpoint.is_empty() {
            raw.from_user_info_api = Some(fetch_user_info_api(&ctx.http, config, access_token).await?);
        }
    }

    map_user_info(config, raw)
}

/// User info from the userinfo endpoint alone, for providers without usable ID tokens.
pub(crate) async fn resolve_from_user_info_api(
    http: &HttpClient,
    config: &ProviderClientConfig,
    tokens: &OAuthTokens,
) -> Result<UserInfo, Error> {
    let access_token = require_access_token(tokens)?;
    let raw = RawUserInfo {
        from_id_token_payload: None,
        from_user_info_api: Some(fetch_user_info_api(http, config, access_token).await?),
    };
    map_user_info(config, raw)
}

pub(crate) fn require_access_token(tokens: &OAuthTokens) -> Result<&str, Error> {
    tokens.access_token().ok_or_else(|| {
        upstream_error(
            UpstreamErrorKind::InvalidResponse,
            "access_token missing from token response",
        )
    })
}

/// GET the configured userinfo endpoint with the access token as bearer.
///
/// Configured headers and query params are applied over the defaults.
pub async fn fetch_user_info_api(
    http: &HttpClient,
    config: &ProviderClientConfig,
    access_token: &str,
) -> Result<Map<String, Value>, Error> {
    let mut headers = Params::new();
    headers.insert("Authorization".to_string(), format!("Bearer {}", access_token));
    apply_overrides(&mut headers, &config.user_info_endpoint_headers);

    let mut query = Params::new();
    apply_overrides(&mut query, &config.user_info_endpoint_query_params);

    let value = get_json(http, &config.user_info_endpoint, &headers, &query).await?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(upstream_error(
            UpstreamErrorKind::InvalidResponse,
            "userinfo endpoint did not return a JSON object",
        )),
    }
}

/// GET a JSON document from a provider API.
pub(crate) async fn get_json(
    http: &HttpClient,
    url: &str,
    headers: &Params,
    query: &Params,
) -> Result<Value, Error> {
    debug!("Fetching user info from {}", url);

    let mut request = http.get(url).query(query);
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("User info request to {} answered {}", url, status);
        return Err(upstream_error(
            UpstreamErrorKind::UserInfoFailed {
                status: status.as_u16(),
            },
            &body,
        ));
    }

    Ok(response.json::<Value>().await?)
}

/// Headers for a bearer-authenticated provider API call.
pub(crate) fn bearer_headers(access_token: &str) -> Params {
    Params::from([("Authorization".to_string(), format!("Bearer {}", access_token))])
}

/// Map raw provider data onto the canonical identity using `config.user_info_map`.
///
/// Each field prefers the ID token payload over the userinfo response. A
/// missing user id is fatal; a missing email is not, unless a fake email is
/// to be generated.
pub fn map_user_info(config: &ProviderClientConfig, raw: RawUserInfo) -> Result<UserInfo, Error> {
    let map = &config.user_info_map;
    let lookup = |id_token_path: &str, user_info_path: &str| {
        raw.from_id_token_payload
            .as_ref()
            .and_then(|payload| value_at_path(payload, id_token_path))
            .or_else(|| {
                raw.from_user_info_api
                    .as_ref()
                    .and_then(|api| value_at_path(api, user_info_path))
            })
    };

    let user_id = lookup(
        &map.from_id_token_payload.user_id,
        &map.from_user_info_api.user_id,
    )
    .and_then(value_as_string)
    .ok_or_else(|| {
        data_mapping_error(
            DataMappingErrorKind::MissingRequiredField,
            &format!(
                "userId not found in user info from {}; check userInfoMap",
                config.third_party_id
            ),
        )
    })?;

    let email = lookup(&map.from_id_token_payload.email, &map.from_user_info_api.email)
        .and_then(value_as_string);
    let is_verified = lookup(
        &map.from_id_token_payload.email_verified,
        &map.from_user_info_api.email_verified,
    )
    .is_some_and(is_true);

    let email = match email {
        Some(id) => Some(UserInfoEmail { id, is_verified }),
        None if !config.require_email => {
            let generator = config.generate_fake_email.clone().unwrap_or_default();
            Some(UserInfoEmail {
                id: generator.generate(&user_id, &config.third_party_id),
                is_verified: true,
            })
        }
        None => None,
    };

    let mut third_party_user_id = user_id;
    if let Some(tenant_id) = config.tenant_id.as_deref().filter(|t| !t.is_empty()) {
        third_party_user_id.push('|');
        third_party_user_id.push_str(tenant_id);
    }

    Ok(UserInfo {
        third_party_user_id,
        email,
        raw_user_info_from_provider: raw,
    })
}

/// Follow a dot-delimited path through objects and arrays; `null` counts as absent.
fn value_at_path<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    (!current.is_null()).then_some(current)
}

// Ids and emails are strings or numbers; anything else counts as absent.
fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Only a real `true` or the exact string "true" count.
fn is_true(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        _ => false,
    }
}
