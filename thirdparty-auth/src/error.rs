//! Error types for the `thirdparty-auth` crate.
//!
//! Follows the same pattern as the other layers: a root Error struct holding an
//! error kind tree and an optional source for error chaining.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for thirdparty-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in thirdparty-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Config(ConfigErrorKind),
    Upstream(UpstreamErrorKind),
    TokenValidation(TokenValidationErrorKind),
    DataMapping(DataMappingErrorKind),
    Http(HttpErrorKind),
}

/// Integrator mistakes: never silently defaulted.
#[derive(Debug, PartialEq)]
pub enum ConfigErrorKind {
    AmbiguousClient,
    ClientNotFound,
    MissingEndpoint,
    UnknownProvider,
    UnknownTenant,
    InvalidValue,
}

/// Failures reported by a provider or the core service.
#[derive(Debug, PartialEq)]
pub enum UpstreamErrorKind {
    ExchangeFailed { status: u16 },
    UserInfoFailed { status: u16 },
    CoreRequestFailed { status: u16 },
    DiscoveryFailed { status: u16 },
    JwksFetchFailed { status: u16 },
    InvalidResponse,
}

/// Errors from ID token verification. Fatal for the login attempt.
#[derive(Debug, PartialEq)]
pub enum TokenValidationErrorKind {
    InvalidIdToken,
    KeyNotFound,
    PayloadRejected,
}

/// Errors from mapping raw provider data onto the canonical user info.
#[derive(Debug, PartialEq)]
pub enum DataMappingErrorKind {
    MissingRequiredField,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Config(kind) => write!(f, "Configuration error: {:?}", kind)?,
            ErrorKind::Upstream(kind) => write!(f, "Upstream error: {:?}", kind)?,
            ErrorKind::TokenValidation(kind) => write!(f, "Token validation error: {:?}", kind)?,
            ErrorKind::DataMapping(kind) => write!(f, "Data mapping error: {:?}", kind)?,
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind)?,
        }
        match &self.source {
            Some(source) => write!(f, " ({})", source),
            None => Ok(()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else if err.is_decode() {
            ErrorKind::Upstream(UpstreamErrorKind::InvalidResponse)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            other => Error {
                source: Some(Box::new(other)),
                error_kind: ErrorKind::Http(HttpErrorKind::Network),
            },
        }
    }
}

// Malformed JSON only ever comes back from an upstream answer.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Upstream(UpstreamErrorKind::InvalidResponse),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Config(ConfigErrorKind::InvalidValue),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::TokenValidation(TokenValidationErrorKind::InvalidIdToken),
        }
    }
}

/// Helper function to create configuration errors.
pub fn config_error(kind: ConfigErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Config(kind),
    }
}

/// Helper function to create upstream errors.
pub fn upstream_error(kind: UpstreamErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Upstream(kind),
    }
}

/// Helper function to create token validation errors.
///
/// Custom `ValidateIdTokenPayload` hooks should reject payloads with
/// `TokenValidationErrorKind::PayloadRejected`.
pub fn token_validation_error(kind: TokenValidationErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::TokenValidation(kind),
    }
}

/// Helper function to create data mapping errors.
pub fn data_mapping_error(kind: DataMappingErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::DataMapping(kind),
    }
}
