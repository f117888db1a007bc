//! OAuth 2.0 / OIDC provider engine.
//!
//! The generic engine builds authorisation URLs (with PKCE and dev-key relay
//! routing), exchanges codes for tokens, and maps provider data onto the
//! canonical identity. Named providers are layers over it.

mod discovery;
mod id_token;
mod jwks;
mod registry;

pub mod dev_keys;
pub mod engine;
pub mod params;
pub mod pkce;
pub mod provider;
pub mod providers;
pub mod types;
pub mod user_info;

pub use discovery::{augment, fetch_oidc_configuration, normalise_discovery_endpoint, OidcConfiguration};
pub use engine::{generic_hooks, EngineContext};
pub use id_token::verify_id_token;
pub use jwks::{JwksCache, DEFAULT_JWKS_TTL_SECONDS};
pub use params::{ParamOverride, ParamOverrides};
pub use pkce::{generate_s256, PkceChallenge, PkceVerifier};
pub use provider::{compose, Provider, ProviderHooks, ProviderInput, ProviderLayer};
pub use registry::{create_provider, ProviderKind};
pub use types::{
    AuthorisationRedirect, OAuthTokens, RawUserInfo, RedirectUriInfo, UserInfo, UserInfoEmail,
};
