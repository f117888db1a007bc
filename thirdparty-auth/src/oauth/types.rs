//! Values passed between the two OAuth legs and returned to the caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where to send the browser, plus the PKCE verifier the caller must keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorisationRedirect {
    pub url_with_query_params: String,
    /// Must be threaded back unchanged into [`RedirectUriInfo`]; the engine never stores it.
    pub pkce_code_verifier: Option<String>,
}

/// What the caller saw on the callback leg.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectUriInfo {
    pub redirect_uri_on_provider_dashboard: String,
    pub redirect_uri_query_params: HashMap<String, String>,
    pub pkce_code_verifier: Option<String>,
}

/// Raw token endpoint response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OAuthTokens(pub Map<String, Value>);

impl OAuthTokens {
    pub fn access_token(&self) -> Option<&str> {
        self.get_str("access_token")
    }

    pub fn id_token(&self) -> Option<&str> {
        self.get_str("id_token")
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Unmapped provider data, one map per source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUserInfo {
    pub from_id_token_payload: Option<Map<String, Value>>,
    #[serde(rename = "fromUserInfoAPI")]
    pub from_user_info_api: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoEmail {
    pub id: String,
    pub is_verified: bool,
}

/// The canonical identity produced by a completed flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub third_party_user_id: String,
    pub email: Option<UserInfoEmail>,
    pub raw_user_info_from_provider: RawUserInfo,
}

impl UserInfo {
    pub fn is_verified(&self) -> bool {
        self.email.as_ref().is_some_and(|email| email.is_verified)
    }
}
