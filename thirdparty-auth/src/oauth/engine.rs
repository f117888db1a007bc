//! The generic OAuth2/OIDC engine: the innermost layer of every provider.

use std::sync::Arc;

use futures_util::future::{self, FutureExt};
use log::{debug, info, warn};
use reqwest::header::ACCEPT;
use url::{form_urlencoded, Url};

use super::dev_keys::{
    actual_client_id, is_dev_client_id, ACTUAL_REDIRECT_URI_PARAM, DEV_OAUTH_AUTHORIZATION_URL,
    DEV_OAUTH_REDIRECT_URL,
};
use super::jwks::JwksCache;
use super::params::{apply_overrides, Params};
use super::pkce::{generate_s256, DEFAULT_VERIFIER_LENGTH};
use super::provider::ProviderHooks;
use super::types::{AuthorisationRedirect, OAuthTokens, RedirectUriInfo};
use super::user_info::resolve_user_info;
use crate::config::{select_client, ProviderClientConfig, ProviderConfig};
use crate::error::{config_error, upstream_error, ConfigErrorKind, Error, UpstreamErrorKind};
use crate::http::HttpClient;

/// Shared collaborators for every provider built by one engine.
#[derive(Clone)]
pub struct EngineContext {
    pub http: HttpClient,
    pub jwks: Arc<JwksCache>,
}

impl EngineContext {
    pub fn new(http: HttpClient) -> Self {
        let jwks = Arc::new(JwksCache::new(http.clone()));
        Self { http, jwks }
    }

    /// Use an existing JWKS cache, e.g. one shared between engines or with a custom TTL.
    pub fn with_jwks_cache(mut self, jwks: Arc<JwksCache>) -> Self {
        self.jwks = jwks;
        self
    }
}

/// Hooks implementing plain OAuth2 plus OIDC for `config`.
pub fn generic_hooks(config: ProviderConfig, ctx: EngineContext) -> ProviderHooks {
    let config = Arc::new(config);

    let exchange_ctx = ctx.clone();
    let user_info_ctx = ctx;

    ProviderHooks {
        get_config_for_client_type: Arc::new(move |client_type: Option<String>| {
            future::ready(select_client(&config, client_type.as_deref())).boxed()
        }),
        get_authorisation_redirect_url: Arc::new(
            |config: ProviderClientConfig, redirect_uri: String| {
                future::ready(build_authorisation_redirect(&config, &redirect_uri)).boxed()
            },
        ),
        exchange_auth_code_for_oauth_tokens: Arc::new(
            move |config: ProviderClientConfig, redirect_uri_info: RedirectUriInfo| {
                let http = exchange_ctx.http.clone();
                async move { exchange_code(&http, &config, &redirect_uri_info).await }.boxed()
            },
        ),
        get_user_info: Arc::new(move |config: ProviderClientConfig, tokens: OAuthTokens| {
            let ctx = user_info_ctx.clone();
            async move { resolve_user_info(&ctx, &config, &tokens).await }.boxed()
        }),
    }
}

/// Build the URL the browser is sent to for the first leg.
///
/// PKCE is added when the client has no secret or forces it. Configured query
/// params are applied after the computed ones. Development client ids are
/// routed through the relay with the real client id and endpoint. With no
/// authorization endpoint configured the result is the query string alone.
pub fn build_authorisation_redirect(
    config: &ProviderClientConfig,
    redirect_uri_on_provider_dashboard: &str,
) -> Result<AuthorisationRedirect, Error> {
    let mut params = Params::new();
    if !config.scope.is_empty() {
        params.insert("scope".to_string(), config.scope.join(" "));
    }
    params.insert("client_id".to_string(), config.client_id.clone());
    params.insert(
        "redirect_uri".to_string(),
        redirect_uri_on_provider_dashboard.to_string(),
    );
    params.insert("response_type".to_string(), "code".to_string());

    let pkce_code_verifier = if config.uses_pkce() {
        let (challenge, verifier) = generate_s256(DEFAULT_VERIFIER_LENGTH)?;
        params.insert("code_challenge".to_string(), challenge.as_str().to_string());
        params.insert("code_challenge_method".to_string(), "S256".to_string());
        Some(verifier.into_string())
    } else {
        None
    };

    apply_overrides(&mut params, &config.authorization_endpoint_query_params);

    let mut base = config.authorization_endpoint.as_str();
    if is_dev_client_id(&config.client_id) {
        debug!("Routing {} authorisation through the dev relay", config.third_party_id);
        params.insert(
            "client_id".to_string(),
            actual_client_id(&config.client_id).to_string(),
        );
        params.insert(
            ACTUAL_REDIRECT_URI_PARAM.to_string(),
            config.authorization_endpoint.clone(),
        );
        base = DEV_OAUTH_AUTHORIZATION_URL;
    }

    // Without an endpoint the caller gets the bare query to append itself
    let url_with_query_params = if base.is_empty() {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&params)
            .finish();
        format!("?{}", query)
    } else {
        Url::parse_with_params(base, &params)?.to_string()
    };
    Ok(AuthorisationRedirect {
        url_with_query_params,
        pkce_code_verifier,
    })
}

/// Form body for the authorization code grant.
pub fn token_request_params(
    config: &ProviderClientConfig,
    redirect_uri_info: &RedirectUriInfo,
) -> Result<Params, Error> {
    let code = redirect_uri_info
        .redirect_uri_query_params
        .get("code")
        .filter(|code| !code.is_empty())
        .ok_or_else(|| {
            upstream_error(
                UpstreamErrorKind::InvalidResponse,
                "Authorization code missing from redirect query params",
            )
        })?;

    let mut params = Params::new();
    params.insert("client_id".to_string(), config.client_id.clone());
    params.insert(
        "redirect_uri".to_string(),
        redirect_uri_info.redirect_uri_on_provider_dashboard.clone(),
    );
    params.insert("code".to_string(), code.clone());
    params.insert("grant_type".to_string(), "authorization_code".to_string());
    if !config.client_secret.is_empty() {
        params.insert("client_secret".to_string(), config.client_secret.clone());
    }
    if let Some(verifier) = &redirect_uri_info.pkce_code_verifier {
        params.insert("code_verifier".to_string(), verifier.clone());
    }

    apply_overrides(&mut params, &config.token_endpoint_body_params);

    if is_dev_client_id(&config.client_id) {
        params.insert(
            "client_id".to_string(),
            actual_client_id(&config.client_id).to_string(),
        );
        params.insert("redirect_uri".to_string(), DEV_OAUTH_REDIRECT_URL.to_string());
    }

    Ok(params)
}

/// Exchange the callback's authorization code for tokens.
pub async fn exchange_code(
    http: &HttpClient,
    config: &ProviderClientConfig,
    redirect_uri_info: &RedirectUriInfo,
) -> Result<OAuthTokens, Error> {
    require_token_endpoint(config)?;
    let params = token_request_params(config, redirect_uri_info)?;
    post_token_request(http, &config.token_endpoint, &params, None).await
}

pub(crate) fn require_token_endpoint(config: &ProviderClientConfig) -> Result<(), Error> {
    if config.token_endpoint.is_empty() {
        return Err(config_error(
            ConfigErrorKind::MissingEndpoint,
            &format!(
                "tokenEndpoint is not configured for provider {}",
                config.third_party_id
            ),
        ));
    }
    Ok(())
}

/// POST a form to a token endpoint and return the raw token map.
///
/// With `basic_auth` the client credentials go in the Authorization header.
pub async fn post_token_request(
    http: &HttpClient,
    token_endpoint: &str,
    params: &Params,
    basic_auth: Option<(&str, &str)>,
) -> Result<OAuthTokens, Error> {
    debug!("Exchanging authorization code at {}", token_endpoint);

    let mut request = http
        .post(token_endpoint)
        .header(ACCEPT, "application/json")
        .form(params);
    if let Some((client_id, client_secret)) = basic_auth {
        request = request.basic_auth(client_id, Some(client_secret));
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("Token endpoint {} answered {}: {}", token_endpoint, status, body);
        return Err(upstream_error(
            UpstreamErrorKind::ExchangeFailed {
                status: status.as_u16(),
            },
            &body,
        ));
    }

    let tokens = response.json::<OAuthTokens>().await?;
    info!("Exchanged authorization code at {}", token_endpoint);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::http::HttpClientBuilder;
    use crate::oauth::params::ParamOverride;
    use mockito::{Matcher, Server};
    use std::collections::HashMap;

    fn config() -> ProviderClientConfig {
        ProviderClientConfig {
            third_party_id: "custom".to_string(),
            client_id: "cid".to_string(),
            authorization_endpoint: "https://idp.example/authorize".to_string(),
            token_endpoint: "https://idp.example/token".to_string(),
            scope: vec!["openid".to_string(), "email".to_string()],
            ..Default::default()
        }
    }

    fn query(url: &str) -> HashMap<String, String> {
        Url::parse(url).unwrap().query_pairs().into_owned().collect()
    }

    fn callback(code: &str, verifier: Option<&str>) -> RedirectUriInfo {
        RedirectUriInfo {
            redirect_uri_on_provider_dashboard: "https://app.example/callback".to_string(),
            redirect_uri_query_params: HashMap::from([("code".to_string(), code.to_string())]),
            pkce_code_verifier: verifier.map(str::to_string),
        }
    }

    #[test]
    fn test_public_client_always_uses_pkce() {
        let redirect = build_authorisation_redirect(&config(), "https://app.example/callback").unwrap();
        let params = query(&redirect.url_with_query_params);

        assert!(redirect
            .url_with_query_params
            .starts_with("https://idp.example/authorize?"));
        assert_eq!(params["client_id"], "cid");
        assert_eq!(params["redirect_uri"], "https://app.example/callback");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], "openid email");
        assert_eq!(params["code_challenge_method"], "S256");

        let verifier = redirect.pkce_code_verifier.unwrap();
        let expected = crate::oauth::pkce::PkceVerifier::from_string(verifier).challenge();
        assert_eq!(params["code_challenge"], expected.as_str());
    }

    #[test]
    fn test_confidential_client_skips_pkce_unless_forced() {
        let mut config = config();
        config.client_secret = "secret".to_string();

        let redirect = build_authorisation_redirect(&config, "https://app.example/cb").unwrap();
        assert!(!redirect.url_with_query_params.contains("code_challenge"));
        assert!(redirect.pkce_code_verifier.is_none());

        config.force_pkce = true;
        let redirect = build_authorisation_redirect(&config, "https://app.example/cb").unwrap();
        assert!(redirect.url_with_query_params.contains("code_challenge="));
        assert!(redirect.pkce_code_verifier.is_some());
    }

    #[test]
    fn test_query_param_overrides_remove_and_set() {
        let mut config = config();
        config.authorization_endpoint_query_params = [
            ("response_type".to_string(), ParamOverride::Remove),
            ("prompt".to_string(), ParamOverride::set("consent")),
            ("scope".to_string(), ParamOverride::Keep),
        ]
        .into_iter()
        .collect();

        let redirect = build_authorisation_redirect(&config, "https://app.example/cb").unwrap();
        let params = query(&redirect.url_with_query_params);

        assert!(!params.contains_key("response_type"));
        assert_eq!(params["prompt"], "consent");
        assert_eq!(params["scope"], "openid email");
    }

    #[test]
    fn test_empty_scope_is_not_sent() {
        let mut config = config();
        config.scope.clear();

        let redirect = build_authorisation_redirect(&config, "https://app.example/cb").unwrap();

        assert!(!query(&redirect.url_with_query_params).contains_key("scope"));
    }

    #[test]
    fn test_dev_client_id_routes_through_relay() {
        let mut config = config();
        config.client_id = "4398792-io.example.sandbox".to_string();
        config.client_secret = "dev-secret".to_string();

        let redirect = build_authorisation_redirect(&config, "https://app.example/cb").unwrap();
        let params = query(&redirect.url_with_query_params);

        assert!(redirect
            .url_with_query_params
            .starts_with(DEV_OAUTH_AUTHORIZATION_URL));
        assert_eq!(params["client_id"], "io.example.sandbox");
        assert_eq!(params[ACTUAL_REDIRECT_URI_PARAM], "https://idp.example/authorize");
        assert_eq!(params["redirect_uri"], "https://app.example/cb");
    }

    #[test]
    fn test_without_authorization_endpoint_returns_bare_query() {
        let mut config = config();
        config.authorization_endpoint.clear();

        let redirect = build_authorisation_redirect(&config, "https://app.example/cb").unwrap();
        let query = redirect
            .url_with_query_params
            .strip_prefix('?')
            .expect("query-only url");
        let params: HashMap<String, String> =
            form_urlencoded::parse(query.as_bytes()).into_owned().collect();

        assert_eq!(params["client_id"], "cid");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["redirect_uri"], "https://app.example/cb");
        assert!(params.contains_key("code_challenge"));
    }

    #[test]
    fn test_token_params_include_secret_and_verifier() {
        let mut config = config();
        config.client_secret = "secret".to_string();
        config.token_endpoint_body_params =
            [("audience".to_string(), ParamOverride::set("api"))].into_iter().collect();

        let params = token_request_params(&config, &callback("abc", Some("verifier"))).unwrap();

        assert_eq!(params["code"], "abc");
        assert_eq!(params["grant_type"], "authorization_code");
        assert_eq!(params["client_secret"], "secret");
        assert_eq!(params["code_verifier"], "verifier");
        assert_eq!(params["redirect_uri"], "https://app.example/callback");
        assert_eq!(params["audience"], "api");
    }

    #[test]
    fn test_token_params_for_dev_client_id_use_relay_redirect() {
        let mut config = config();
        config.client_id = "4398792-io.example.sandbox".to_string();

        let params = token_request_params(&config, &callback("abc", None)).unwrap();

        assert_eq!(params["client_id"], "io.example.sandbox");
        assert_eq!(params["redirect_uri"], DEV_OAUTH_REDIRECT_URL);
        assert!(!params.contains_key("client_secret"));
    }

    #[test]
    fn test_missing_code_is_rejected() {
        let info = RedirectUriInfo::default();

        let err = token_request_params(&config(), &info).unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Upstream(UpstreamErrorKind::InvalidResponse)
        );
    }

    #[tokio::test]
    async fn test_exchange_code_returns_raw_tokens() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_header("accept", "application/json")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("code".into(), "abc".into()),
                Matcher::UrlEncoded("client_id".into(), "cid".into()),
                Matcher::UrlEncoded("code_verifier".into(), "verifier".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token": "at", "id_token": "it", "token_type": "Bearer"}"#)
            .create_async()
            .await;
        let mut config = config();
        config.token_endpoint = format!("{}/token", server.url());
        let http = HttpClientBuilder::new().build().unwrap();

        let tokens = exchange_code(&http, &config, &callback("abc", Some("verifier")))
            .await
            .unwrap();

        assert_eq!(tokens.access_token(), Some("at"));
        assert_eq!(tokens.id_token(), Some("it"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_failure_carries_status_and_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;
        let mut config = config();
        config.token_endpoint = format!("{}/token", server.url());
        let http = HttpClientBuilder::new().build().unwrap();

        let err = exchange_code(&http, &config, &callback("abc", None))
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Upstream(UpstreamErrorKind::ExchangeFailed { status: 400 })
        );
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_exchange_without_token_endpoint() {
        let mut config = config();
        config.token_endpoint.clear();
        let http = HttpClientBuilder::new().build().unwrap();

        let err = exchange_code(&http, &config, &callback("abc", None))
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Config(ConfigErrorKind::MissingEndpoint));
    }
}
