//! # thirdparty-auth
//!
//! Third-party sign-in over OAuth 2.0 and OpenID Connect:
//! - Provider configuration, with per-tenant overrides fetched from the core
//! - Authorisation URLs with PKCE and development-key relay routing
//! - Code exchange, ID token verification against cached JWKS, user info mapping
//! - Built-in providers (Google, Apple, GitHub, Okta, ...) layered over a generic engine
//!
//! ## Usage
//!
//! ```rust,ignore
//! use thirdparty_auth::{
//!     http::HttpClientBuilder,
//!     oauth::ProviderInput,
//!     querier::StaticCoreQuerier,
//!     ThirdParty,
//! };
//!
//! let recipe = ThirdParty::new(
//!     vec![ProviderInput::new(google_config)],
//!     Arc::new(StaticCoreQuerier::new()),
//!     HttpClientBuilder::new().build()?,
//! )?;
//! let redirect = recipe
//!     .get_authorisation_redirect_url("google", Some("web"), None, "https://app.example/cb")
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod querier;
pub mod recipe;

// Re-export commonly used types
pub use config::{ClientConfig, ProviderClientConfig, ProviderConfig};
pub use error::{Error, ErrorKind};
pub use recipe::ThirdParty;
