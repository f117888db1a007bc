//! Sign in with Apple.
//!
//! Apple has no static client secret. When none is configured it is minted as
//! an ES256 JWT from `additionalConfig.{keyId, teamId, privateKey}`.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;

use super::{config_layer, default_param, default_scope};
use crate::config::{set_if_empty, ProviderClientConfig};
use crate::error::{ConfigErrorKind, Error, ErrorKind};
use crate::oauth::provider::ProviderLayer;

const APPLE_DISCOVERY_ENDPOINT: &str = "https://appleid.apple.com/";
const APPLE_AUDIENCE: &str = "https://appleid.apple.com";
const CLIENT_SECRET_VALIDITY_DAYS: i64 = 180;

#[derive(Debug, Serialize)]
struct ClientSecretClaims<'a> {
    iss: &'a str,
    iat: i64,
    exp: i64,
    aud: &'a str,
    sub: &'a str,
}

/// Mint the JWT Apple accepts as `client_secret`.
pub fn generate_client_secret(
    client_id: &str,
    key_id: &str,
    team_id: &str,
    private_key: &str,
) -> Result<String, Error> {
    // Keys pasted into JSON or env vars often carry escaped newlines
    let pem = private_key.replace("\\n", "\n");
    let key = EncodingKey::from_ec_pem(pem.as_bytes()).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Config(ConfigErrorKind::InvalidValue),
    })?;

    let now = Utc::now();
    let claims = ClientSecretClaims {
        iss: team_id,
        iat: now.timestamp(),
        exp: (now + Duration::days(CLIENT_SECRET_VALIDITY_DAYS)).timestamp(),
        aud: APPLE_AUDIENCE,
        sub: client_id,
    };
    let mut header = Header::new(Algorithm::ES256);
    header.kid = Some(key_id.to_string());

    encode(&header, &claims, &key).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Config(ConfigErrorKind::InvalidValue),
    })
}

fn apply_defaults(mut config: ProviderClientConfig) -> Result<ProviderClientConfig, Error> {
    set_if_empty(&mut config.name, "Apple");
    set_if_empty(&mut config.oidc_discovery_endpoint, APPLE_DISCOVERY_ENDPOINT);
    default_scope(&mut config, &["openid", "email"]);
    default_param(
        &mut config.authorization_endpoint_query_params,
        "response_mode",
        "form_post",
    );
    config
        .user_info_map
        .from_id_token_payload
        .or_defaults("sub", "email", "email_verified");

    if config.client_secret.is_empty() {
        let minted = match (
            config.additional_config_str("keyId"),
            config.additional_config_str("teamId"),
            config.additional_config_str("privateKey"),
        ) {
            (Some(key_id), Some(team_id), Some(private_key)) => Some(generate_client_secret(
                &config.client_id,
                key_id,
                team_id,
                private_key,
            )?),
            _ => None,
        };
        if let Some(secret) = minted {
            config.client_secret = secret;
        }
    }

    Ok(config)
}

pub(crate) fn layer() -> ProviderLayer {
    config_layer(apply_defaults)
}
