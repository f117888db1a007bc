//! Google Workspaces: Google restricted to a hosted domain.
//!
//! The `hd` value comes from `additionalConfig.hd`; `*` admits any workspace
//! domain but still requires the claim, which rejects consumer accounts.

use serde_json::Value;

use super::{config_layer, default_param, google};
use crate::config::{set_if_empty, IdTokenPayload, IdTokenPayloadValidator, ProviderClientConfig};
use crate::error::{token_validation_error, Error, TokenValidationErrorKind};
use crate::oauth::provider::ProviderLayer;

const ANY_DOMAIN: &str = "*";

fn apply_defaults(mut config: ProviderClientConfig) -> Result<ProviderClientConfig, Error> {
    set_if_empty(&mut config.name, "Google Workspaces");
    let mut config = google::apply_defaults(config)?;

    let hd = config
        .additional_config_str("hd")
        .unwrap_or(ANY_DOMAIN)
        .to_string();
    default_param(&mut config.authorization_endpoint_query_params, "hd", &hd);

    let configured = config.validate_id_token_payload.take();
    config.validate_id_token_payload = Some(IdTokenPayloadValidator::new(move |payload, config| {
        if let Some(configured) = &configured {
            configured.validate(payload, config)?;
        }
        validate_hosted_domain(payload, config)
    }));

    Ok(config)
}

fn validate_hosted_domain(payload: &IdTokenPayload, config: &ProviderClientConfig) -> Result<(), Error> {
    let expected = config.additional_config_str("hd").unwrap_or(ANY_DOMAIN);
    match payload
        .get("hd")
        .and_then(Value::as_str)
        .filter(|hd| !hd.is_empty())
    {
        None => Err(token_validation_error(
            TokenValidationErrorKind::PayloadRejected,
            "id token has no hd claim",
        )),
        Some(hd) if expected == ANY_DOMAIN || hd == expected => Ok(()),
        Some(hd) => Err(token_validation_error(
            TokenValidationErrorKind::PayloadRejected,
            &format!("hd claim {} does not match {}", hd, expected),
        )),
    }
}

pub(crate) fn layer() -> ProviderLayer {
    config_layer(apply_defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::oauth::params::ParamOverride;
    use serde_json::json;

    fn payload(value: Value) -> IdTokenPayload {
        value.as_object().cloned().unwrap()
    }

    fn config_for(hd: Option<&str>) -> ProviderClientConfig {
        let mut config = ProviderClientConfig::default();
        if let Some(hd) = hd {
            config.additional_config.insert("hd".to_string(), hd.into());
        }
        apply_defaults(config).unwrap()
    }

    #[test]
    fn test_inherits_google_defaults_and_sends_hd() {
        let config = config_for(Some("acme.com"));

        assert_eq!(config.name, "Google Workspaces");
        assert_eq!(config.scope, vec!["openid", "email"]);
        assert_eq!(
            config.authorization_endpoint_query_params["hd"],
            ParamOverride::set("acme.com")
        );
    }

    #[test]
    fn test_specific_domain_must_match() {
        let config = config_for(Some("acme.com"));
        let validator = config.validate_id_token_payload.clone().unwrap();

        assert!(validator.validate(&payload(json!({"hd": "acme.com"})), &config).is_ok());
        let err = validator
            .validate(&payload(json!({"hd": "evil.com"})), &config)
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::TokenValidation(TokenValidationErrorKind::PayloadRejected)
        );
    }

    #[test]
    fn test_wildcard_still_requires_claim() {
        let config = config_for(None);
        let validator = config.validate_id_token_payload.clone().unwrap();

        assert_eq!(config.authorization_endpoint_query_params["hd"], ParamOverride::set("*"));
        assert!(validator.validate(&payload(json!({"hd": "any.org"})), &config).is_ok());
        assert!(validator.validate(&payload(json!({"sub": "1"})), &config).is_err());
    }

    #[test]
    fn test_configured_validator_still_runs() {
        let mut config = ProviderClientConfig::default();
        config.validate_id_token_payload = Some(IdTokenPayloadValidator::new(|_, _| {
            Err(token_validation_error(
                TokenValidationErrorKind::PayloadRejected,
                "custom check",
            ))
        }));
        let config = apply_defaults(config).unwrap();
        let validator = config.validate_id_token_payload.clone().unwrap();

        let err = validator
            .validate(&payload(json!({"hd": "acme.com"})), &config)
            .unwrap_err();
        assert!(err.to_string().contains("custom check"));
    }
}
