//! HTTP client for the PSA REST API.
//!
//! One client instance corresponds to one PSA connection. The client owns
//! the OAuth client-credentials flow and caches the access token in memory
//! until shortly before expiry; resource services layer on top of the raw
//! JSON request methods exposed here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use url::Url;
use uuid::Uuid;

use crate::cache::ResponseCache;

/// Tokens are refreshed this many seconds before their reported expiry.
const TOKEN_EXPIRY_SKEW_SECONDS: u64 = 60;

/// Decrypted OAuth client credentials for one PSA tenant.
#[derive(Debug, Clone)]
pub struct PsaCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub tenant: Option<String>,
}

/// Errors surfaced by PSA API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("PSA authentication failed with status {status}: {message}")]
    Authentication { status: u16, message: String },
    #[error("transient PSA API failure: {message}")]
    Transient { message: String },
    #[error("PSA API returned status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("failed to decode PSA API response: {0}")]
    Decode(String),
    #[error("{resource} not found")]
    NotFound { resource: String },
    #[error("PSA API write to {endpoint} returned no records")]
    WriteFailed { endpoint: String },
    #[error("invalid PSA URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Whether retrying the same call later could reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transient { .. })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug)]
struct AccessToken {
    token: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// PSA API client bound to a single connection.
pub struct PsaClient {
    http: reqwest::Client,
    base_url: String,
    credentials: PsaCredentials,
    connection_id: Uuid,
    token: Mutex<Option<AccessToken>>,
    cache: Arc<ResponseCache>,
}

impl PsaClient {
    /// Creates a client for the given connection.
    pub fn new(
        connection_id: Uuid,
        base_url: &str,
        credentials: PsaCredentials,
        cache: Arc<ResponseCache>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transient {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url,
            credentials,
            connection_id,
            token: Mutex::new(None),
            cache,
        })
    }

    /// The connection this client operates on behalf of.
    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url, ApiError> {
        let full = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        Url::parse(&full).map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    /// Runs the OAuth client-credentials flow against the token endpoint.
    async fn authenticate(&self) -> Result<AccessToken, ApiError> {
        let mut url = self.endpoint_url("auth/token")?;
        if let Some(ref tenant) = self.credentials.tenant {
            url.query_pairs_mut().append_pair("tenant", tenant);
        }

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ApiError::Transient {
                message: format!("token request failed: {e}"),
            })?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Authentication {
                status: status.as_u16(),
                message: body,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Transient {
                message: format!("token endpoint returned {status}: {body}"),
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        let lifetime = token
            .expires_in
            .saturating_sub(TOKEN_EXPIRY_SKEW_SECONDS)
            .max(1);

        tracing::debug!(
            connection_id = %self.connection_id,
            expires_in = token.expires_in,
            "Obtained PSA access token"
        );

        Ok(AccessToken {
            token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }

    /// Returns a valid bearer token, reusing the cached one when possible.
    async fn access_token(&self) -> Result<String, ApiError> {
        let mut guard = self.token.lock().await;
        if let Some(ref token) = *guard
            && token.is_valid()
        {
            return Ok(token.token.clone());
        }

        let fresh = self.authenticate().await?;
        let value = fresh.token.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    /// Drops the cached token so the next call re-authenticates.
    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn handle_response(
        &self,
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<Value, ApiError> {
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                resource: endpoint.to_string(),
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Authentication {
                status: status.as_u16(),
                message: body,
            });
        }
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Transient {
                message: format!("{endpoint} returned {status}: {body}"),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn execute(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.endpoint_url(endpoint)?;

        // One retry with a fresh token when the cached one is rejected.
        for attempt in 0..2 {
            let token = self.access_token().await?;

            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .bearer_auth(&token);
            if !params.is_empty() {
                request = request.query(params);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(|e| ApiError::Transient {
                message: format!("{endpoint} request failed: {e}"),
            })?;

            match self.handle_response(endpoint, response).await {
                Err(ApiError::Authentication { status, .. }) if attempt == 0 => {
                    tracing::debug!(
                        connection_id = %self.connection_id,
                        endpoint,
                        status,
                        "Access token rejected, re-authenticating"
                    );
                    self.invalidate_token().await;
                }
                other => return other,
            }
        }

        unreachable!("second attempt always returns")
    }

    /// Forces a token acquisition without issuing any other request.
    ///
    /// Used by connection tests to verify stored credentials end to end.
    pub async fn verify_credentials(&self) -> Result<(), ApiError> {
        self.access_token().await.map(|_| ())
    }

    /// Issues a GET request and returns the raw JSON payload.
    pub async fn get(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<Value, ApiError> {
        self.execute(reqwest::Method::GET, endpoint, params, None)
            .await
    }

    /// Issues a GET request through the response cache.
    pub async fn get_cached(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        ttl_seconds: u64,
    ) -> Result<Value, ApiError> {
        if let Some(hit) = self.cache.get(self.connection_id, endpoint, params) {
            return Ok(hit);
        }

        let value = self.get(endpoint, params).await?;
        self.cache
            .set(self.connection_id, endpoint, value.clone(), ttl_seconds, params);
        Ok(value)
    }

    /// Issues a POST request with a JSON body.
    pub async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, ApiError> {
        self.execute(reqwest::Method::POST, endpoint, &[], Some(body))
            .await
    }

    /// Issues a DELETE request.
    pub async fn delete(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.execute(reqwest::Method::DELETE, endpoint, &[], None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> PsaCredentials {
        PsaCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            tenant: None,
        }
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = PsaClient::new(
            Uuid::new_v4(),
            "not a url",
            credentials(),
            Arc::new(ResponseCache::default()),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_trailing_slash_stripped_from_base_url() {
        let client = PsaClient::new(
            Uuid::new_v4(),
            "https://psa.example.com/api/",
            credentials(),
            Arc::new(ResponseCache::default()),
            Duration::from_secs(5),
        )
        .expect("valid url");

        let url = client.endpoint_url("tickets").expect("valid endpoint");
        assert_eq!(url.as_str(), "https://psa.example.com/api/tickets");
    }

    #[test]
    fn test_transient_classification() {
        assert!(
            ApiError::Transient {
                message: "timeout".to_string()
            }
            .is_transient()
        );
        assert!(
            !ApiError::Authentication {
                status: 401,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !ApiError::NotFound {
                resource: "tickets/1".to_string()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let token = AccessToken {
            token: "t".to_string(),
            expires_at: Instant::now() - Duration::from_secs(1),
        };
        assert!(!token.is_valid());
    }
}
