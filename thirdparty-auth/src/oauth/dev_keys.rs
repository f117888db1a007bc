//! Development client ids.
//!
//! Sandbox credentials published for zero-config sign-in are registered with a
//! relay instead of the developer's redirect URI. Both OAuth legs route through
//! the relay when one of these ids is configured.

/// Relay the browser is sent to instead of the provider's authorization endpoint.
pub const DEV_OAUTH_AUTHORIZATION_URL: &str =
    "https://supertokens.io/dev/oauth/redirect-to-provider";

/// Redirect URI registered with the provider for development client ids.
pub const DEV_OAUTH_REDIRECT_URL: &str = "https://supertokens.io/dev/oauth/redirect-to-app";

/// Query parameter carrying the provider's real authorization endpoint to the relay.
pub const ACTUAL_REDIRECT_URI_PARAM: &str = "actual_redirect_uri";

const DEV_KEY_IDENTIFIER: &str = "4398792-";

const DEV_OAUTH_CLIENT_IDS: &[&str] = &[
    "1060725074195-kmeum4crr01uirfl2op9kd5acmi9jutn.apps.googleusercontent.com",
    "467101b197249757c71f",
];

/// Returns true if `client_id` is one of the published development client ids.
pub fn is_dev_client_id(client_id: &str) -> bool {
    client_id.starts_with(DEV_KEY_IDENTIFIER) || DEV_OAUTH_CLIENT_IDS.contains(&client_id)
}

/// The client id the upstream provider knows for a development client id.
pub fn actual_client_id(client_id: &str) -> &str {
    client_id
        .strip_prefix(DEV_KEY_IDENTIFIER)
        .unwrap_or(client_id)
}
