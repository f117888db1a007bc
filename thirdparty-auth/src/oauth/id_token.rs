//! ID token verification against a provider's JWKS.

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use log::debug;

use super::jwks::JwksCache;
use crate::config::IdTokenPayload;
use crate::error::{token_validation_error, Error, TokenValidationErrorKind};

/// Verify the signature and registered claims of `id_token` and return its payload.
///
/// The signing key is looked up by the header's `kid`; a token without a
/// `kid` is accepted only when the set holds exactly one key. An unknown `kid`
/// triggers one refetch of the key set in case the provider rotated keys.
///
/// Audience is not checked here. Providers that need it install a payload
/// validator.
pub async fn verify_id_token(
    jwks: &JwksCache,
    jwks_uri: &str,
    id_token: &str,
) -> Result<IdTokenPayload, Error> {
    let header = decode_header(id_token)?;
    let kid = header.kid.as_deref();

    let cached = jwks.get_or_fetch(jwks_uri).await?;
    let key = match find_key(&cached, kid) {
        Some(key) => key.clone(),
        None => {
            debug!("Signing key {:?} not in cached JWKS for {}, refetching", kid, jwks_uri);
            let refreshed = jwks.refresh(jwks_uri).await?;
            find_key(&refreshed, kid).cloned().ok_or_else(|| {
                token_validation_error(
                    TokenValidationErrorKind::KeyNotFound,
                    &format!("No signing key found for kid {:?}", kid),
                )
            })?
        }
    };

    let decoding_key = DecodingKey::from_jwk(&key)?;
    let mut validation = Validation::new(header.alg);
    validation.validate_aud = false;

    let token = decode::<IdTokenPayload>(id_token, &decoding_key, &validation)?;
    Ok(token.claims)
}

fn find_key<'a>(keys: &'a JwkSet, kid: Option<&str>) -> Option<&'a Jwk> {
    match kid {
        Some(kid) => keys.find(kid),
        None => match keys.keys.as_slice() {
            [only] => Some(only),
            _ => None,
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::http::HttpClientBuilder;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use mockito::Server;
    use serde_json::json;

    pub(crate) const TEST_SECRET: &[u8] = b"jwks-test-secret-with-plenty-of-entropy";
    const TEST_SECRET_B64: &str = "andrcy10ZXN0LXNlY3JldC13aXRoLXBsZW50eS1vZi1lbnRyb3B5";

    pub(crate) fn jwks_body(kid: &str) -> String {
        json!({
            "keys": [{"kty": "oct", "kid": kid, "alg": "HS256", "k": TEST_SECRET_B64}]
        })
        .to_string()
    }

    /// Sign `claims` with the test secret, adding a one hour expiry.
    pub(crate) fn mint_id_token(kid: Option<&str>, mut claims: serde_json::Value) -> String {
        claims["exp"] = json!(chrono::Utc::now().timestamp() + 3600);
        let mut header = Header::new(Algorithm::HS256);
        header.kid = kid.map(str::to_string);
        encode(&header, &claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap()
    }

    fn cache() -> JwksCache {
        JwksCache::new(HttpClientBuilder::new().build().unwrap())
    }

    #[tokio::test]
    async fn test_verifies_token_signed_with_published_key() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/jwks")
            .with_status(200)
            .with_body(jwks_body("k1"))
            .create_async()
            .await;
        let token = mint_id_token(Some("k1"), json!({"sub": "user-1", "aud": "someone-else"}));

        let payload = verify_id_token(&cache(), &format!("{}/jwks", server.url()), &token)
            .await
            .unwrap();

        assert_eq!(payload["sub"], "user-1");
    }

    #[tokio::test]
    async fn test_token_without_kid_uses_single_key() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/jwks")
            .with_status(200)
            .with_body(jwks_body("k1"))
            .create_async()
            .await;
        let token = mint_id_token(None, json!({"sub": "user-1"}));

        let payload = verify_id_token(&cache(), &format!("{}/jwks", server.url()), &token)
            .await
            .unwrap();

        assert_eq!(payload["sub"], "user-1");
    }

    #[tokio::test]
    async fn test_unknown_kid_refetches_once_then_fails() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/jwks")
            .with_status(200)
            .with_body(jwks_body("k1"))
            .expect(2)
            .create_async()
            .await;
        let token = mint_id_token(Some("rotated"), json!({"sub": "user-1"}));

        let err = verify_id_token(&cache(), &format!("{}/jwks", server.url()), &token)
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::TokenValidation(TokenValidationErrorKind::KeyNotFound)
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bad_signature_is_rejected() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/jwks")
            .with_status(200)
            .with_body(jwks_body("k1"))
            .create_async()
            .await;
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("k1".to_string());
        let forged = encode(
            &header,
            &json!({"sub": "attacker", "exp": chrono::Utc::now().timestamp() + 3600}),
            &EncodingKey::from_secret(b"some-other-secret-entirely"),
        )
        .unwrap();

        let err = verify_id_token(&cache(), &format!("{}/jwks", server.url()), &forged)
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::TokenValidation(TokenValidationErrorKind::InvalidIdToken)
        );
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected_before_fetching_keys() {
        let err = verify_id_token(&cache(), "http://127.0.0.1:1/jwks", "not-a-jwt")
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::TokenValidation(TokenValidationErrorKind::InvalidIdToken)
        );
    }
}
