//! Service-account OAuth2 for the Sheets API
//!
//! A JWT assertion signed with the service account's RSA key is exchanged at the
//! token endpoint for a short-lived bearer token. The token is cached and reused until
//! shortly before it expires.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::ServiceAccountCredentials;
use crate::error::{Result, SheetError};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Anything that can hand out a bearer token for the Sheets API
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

pub struct ServiceAccountTokens {
    credentials: ServiceAccountCredentials,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    pub fn new(credentials: ServiceAccountCredentials, http: reqwest::Client) -> Self {
        Self {
            credentials,
            http,
            cached: Mutex::new(None),
        }
    }

    fn claims(&self, now: DateTime<Utc>) -> AssertionClaims {
        AssertionClaims {
            iss: self.credentials.client_email.clone(),
            scope: SHEETS_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        }
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| SheetError::Upstream(format!("Invalid service account key: {}", e)))?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.credentials.private_key_id.clone());

        jsonwebtoken::encode(&header, &self.claims(now), &key)
            .map_err(|e| SheetError::Upstream(format!("Failed to sign token assertion: {}", e)))
    }

    async fn fetch_token(&self, now: DateTime<Utc>) -> Result<CachedToken> {
        let assertion = self.sign_assertion(now)?;

        let resp = self
            .http
            .post(&self.credentials.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = resp.status();
        let body: TokenResponse = resp.json().await.map_err(|e| {
            SheetError::Upstream(format!("Token response invalid ({}): {}", status, e))
        })?;

        if !status.is_success() {
            let msg = body
                .error_description
                .or(body.error)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(SheetError::Upstream(format!("Token request failed: {}", msg)));
        }

        let token = body.access_token.ok_or_else(|| {
            SheetError::Upstream("Token response missing access_token".to_string())
        })?;
        let lifetime = body.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);

        Ok(CachedToken {
            token,
            expires_at: now + Duration::seconds(lifetime - EXPIRY_MARGIN_SECS),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> Result<String> {
        // Held across the request so concurrent callers share one refresh.
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > now) {
            debug!("reusing cached access token");
            return Ok(token.token.clone());
        }

        let fresh = self.fetch_token(now).await?;
        info!(
            "obtained access token for {} (valid until {})",
            self.credentials.client_email,
            fresh.expires_at.to_rfc3339()
        );
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}

/// Fixed token, for exercising the Sheets client without a token endpoint
#[cfg(test)]
pub(crate) struct StaticToken(pub &'static str);

#[cfg(test)]
#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const TEST_KEY: &str = include_str!("./testdata/service_account_key.pem");

    fn credentials(token_uri: String) -> ServiceAccountCredentials {
        ServiceAccountCredentials {
            account_type: "service_account".to_string(),
            project_id: "demo-project".to_string(),
            private_key_id: "key-123".to_string(),
            private_key: TEST_KEY.to_string(),
            client_email: "bot@demo-project.iam.gserviceaccount.com".to_string(),
            client_id: "1234567890".to_string(),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_uri,
            auth_provider_x509_cert_url: "https://www.googleapis.com/oauth2/v1/certs".to_string(),
            client_x509_cert_url: "https://www.googleapis.com/robot/v1/metadata/x509/bot"
                .to_string(),
        }
    }

    #[test]
    fn test_claims_shape() {
        let tokens = ServiceAccountTokens::new(
            credentials("https://oauth2.googleapis.com/token".to_string()),
            reqwest::Client::new(),
        );
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(
            tokens.claims(now),
            AssertionClaims {
                iss: "bot@demo-project.iam.gserviceaccount.com".to_string(),
                scope: SHEETS_SCOPE.to_string(),
                aud: "https://oauth2.googleapis.com/token".to_string(),
                iat: 1_700_000_000,
                exp: 1_700_003_600,
            }
        );
    }

    #[test]
    fn test_assertion_header_carries_key_id() {
        let tokens = ServiceAccountTokens::new(
            credentials("https://oauth2.googleapis.com/token".to_string()),
            reqwest::Client::new(),
        );
        let jwt = tokens.sign_assertion(Utc::now()).unwrap();
        let header = jsonwebtoken::decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("key-123"));
    }

    #[tokio::test]
    async fn test_token_is_fetched_once_and_cached() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/token")
                    .body_includes("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer")
                    .body_includes("assertion=");
                then.status(200).json_body(serde_json::json!({
                    "access_token": "ya29.test-token",
                    "expires_in": 3599,
                    "token_type": "Bearer"
                }));
            })
            .await;

        let tokens =
            ServiceAccountTokens::new(credentials(server.url("/token")), reqwest::Client::new());

        assert_eq!(tokens.access_token().await.unwrap(), "ya29.test-token");
        assert_eq!(tokens.access_token().await.unwrap(), "ya29.test-token");
        token_mock.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn test_token_endpoint_error_is_upstream() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(400).json_body(serde_json::json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid JWT Signature."
                }));
            })
            .await;

        let tokens =
            ServiceAccountTokens::new(credentials(server.url("/token")), reqwest::Client::new());

        match tokens.access_token().await {
            Err(SheetError::Upstream(msg)) => assert!(msg.contains("Invalid JWT Signature.")),
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bad_key_fails_before_any_request() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(200);
            })
            .await;

        let mut creds = credentials(server.url("/token"));
        creds.private_key = "not a pem".to_string();
        let tokens = ServiceAccountTokens::new(creds, reqwest::Client::new());

        assert!(matches!(
            tokens.access_token().await,
            Err(SheetError::Upstream(_))
        ));
        token_mock.assert_calls_async(0).await;
    }
}
