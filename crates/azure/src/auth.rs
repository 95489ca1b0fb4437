//! OAuth2 client-credentials tokens for a service principal.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use kvdemo_core::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token response omits `expires_in`.
const DEFAULT_LIFETIME_SECS: u64 = 3600;

/// Source of bearer tokens for one audience.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A bearer token that is valid for at least a minute.
    async fn token(&self) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// Client-credentials grant against the identity provider, cached until
/// one minute before expiry.
pub struct ClientSecretCredential {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    scope: String,
    cache: Mutex<Option<(String, Instant)>>,
}

impl std::fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl ClientSecretCredential {
    /// A credential for `scope`, exchanging secrets at `{login}/{tenant}/oauth2/v2.0/token`.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        login: &str,
        tenant_id: &str,
        client_id: impl Into<String>,
        client_secret: SecretString,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/{tenant_id}/oauth2/v2.0/token", login.trim_end_matches('/')),
            client_id: client_id.into(),
            client_secret,
            scope: scope.into(),
            cache: Mutex::new(None),
        }
    }

    async fn request_token(&self) -> Result<(String, Duration)> {
        tracing::debug!(scope = %self.scope, "Requesting access token");
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", self.scope.as_str()),
        ];
        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::authentication(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::authentication(format!("token response unreadable: {e}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .and_then(|err| err.error_description.or(err.error))
                .unwrap_or(body);
            return Err(Error::authentication(format!(
                "identity provider returned {}: {detail}",
                status.as_u16()
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::authentication(format!("token response malformed: {e}")))?;
        let token = parsed
            .access_token
            .ok_or_else(|| Error::authentication("no access_token in token response"))?;
        let lifetime = Duration::from_secs(parsed.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS));
        Ok((token, lifetime.saturating_sub(EXPIRY_MARGIN)))
    }
}

#[async_trait]
impl TokenProvider for ClientSecretCredential {
    async fn token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;
        if let Some((token, expiry)) = cache.as_ref()
            && Instant::now() < *expiry
        {
            return Ok(token.clone());
        }

        let (token, valid_for) = self.request_token().await?;
        *cache = Some((token.clone(), Instant::now() + valid_for));
        Ok(token)
    }
}

/// A fixed token, for tests.
#[cfg(test)]
pub(crate) struct StaticToken(pub String);

#[cfg(test)]
#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    oid: Option<String>,
}

/// Directory object id (`oid` claim) of the principal a token was issued to.
///
/// # Errors
///
/// Returns an authentication error if the token is not a JWT or has no `oid`.
pub fn principal_object_id(token: &str) -> Result<String> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| Error::authentication("access token is not a JWT"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error::authentication(format!("access token payload is not base64: {e}")))?;
    let claims: Claims = serde_json::from_slice(&bytes)
        .map_err(|e| Error::authentication(format!("access token claims unreadable: {e}")))?;
    claims
        .oid
        .ok_or_else(|| Error::authentication("access token has no oid claim"))
}

#[cfg(test)]
pub(crate) fn fake_jwt(oid: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"oid":"{oid}","tid":"tenant"}}"#));
    format!("{header}.{claims}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvdemo_core::ErrorKind;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credential(server: &MockServer) -> ClientSecretCredential {
        ClientSecretCredential::new(
            reqwest::Client::new(),
            &server.uri(),
            "tenant-id",
            "client-id",
            SecretString::from("client-secret"),
            "https://management.azure.com/.default",
        )
    }

    #[tokio::test]
    async fn test_token_exchange_and_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-id/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=client-id"))
            .and(body_string_contains("client_secret=client-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "expires_in": 3599,
                "access_token": "token-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = credential(&server);
        assert_eq!(credential.token().await.unwrap(), "token-1");
        assert_eq!(credential.token().await.unwrap(), "token-1");
    }

    #[tokio::test]
    async fn test_short_lived_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-id/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "expires_in": 30,
                "access_token": "short"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let credential = credential(&server);
        credential.token().await.unwrap();
        credential.token().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_secret_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .mount(&server)
            .await;

        let err = credential(&server).token().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(err.to_string().contains("AADSTS7000215"));
        assert!(!err.to_string().contains("client-secret"));
    }

    #[tokio::test]
    async fn test_missing_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"expires_in": 10})),
            )
            .mount(&server)
            .await;

        let err = credential(&server).token().await.unwrap_err();
        assert!(err.to_string().contains("no access_token"));
    }

    #[test]
    fn test_principal_object_id() {
        let token = fake_jwt("4a5b6c7d-0000-0000-0000-000000000001");
        assert_eq!(
            principal_object_id(&token).unwrap(),
            "4a5b6c7d-0000-0000-0000-000000000001"
        );
    }

    #[test]
    fn test_principal_object_id_rejects_opaque_tokens() {
        assert!(principal_object_id("opaque").is_err());
        assert!(principal_object_id("a.!!!.c").is_err());

        let no_oid = format!("h.{}.s", URL_SAFE_NO_PAD.encode(br#"{"tid":"t"}"#));
        assert!(principal_object_id(&no_oid).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let credential = ClientSecretCredential::new(
            reqwest::Client::new(),
            "https://login.microsoftonline.com",
            "t",
            "c",
            SecretString::from("super-secret-value"),
            "scope",
        );
        assert!(!format!("{credential:?}").contains("super-secret-value"));
    }
}
