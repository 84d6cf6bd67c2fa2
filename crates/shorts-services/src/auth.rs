//! OAuth token cache for the upload and analytics clients.
//!
//! Credentials live in a token file produced by an out-of-band
//! authorization flow. Access tokens are cached in memory and
//! refreshed with the stored refresh token shortly before expiry.
//! There is no interactive re-auth path here: when the refresh token
//! is missing or rejected the caller gets an error telling the
//! operator to re-run authorization.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{ServiceError, ServiceResult};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the recorded expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    #[serde(default)]
    access_token: Option<String>,
    refresh_token: Option<String>,
    client_id: String,
    client_secret: String,
    #[serde(default)]
    token_uri: Option<String>,
    #[serde(default)]
    expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        let margin = chrono::Duration::from_std(EXPIRY_MARGIN).unwrap_or_default();
        Utc::now() + margin < self.expires_at
    }
}

pub struct OAuthTokenCache {
    http: reqwest::Client,
    token_path: PathBuf,
    token_uri_override: Option<String>,
    cached: RwLock<Option<CachedToken>>,
}

impl OAuthTokenCache {
    pub fn new(token_path: impl Into<PathBuf>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_path: token_path.into(),
            token_uri_override: None,
            cached: RwLock::new(None),
        }
    }

    pub fn with_token_uri(mut self, uri: impl Into<String>) -> Self {
        self.token_uri_override = Some(uri.into());
        self
    }

    /// Returns a bearer token, refreshing it first when the cached one
    /// is absent or close to expiry.
    pub async fn access_token(&self) -> ServiceResult<String> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if token.is_fresh() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref() {
            if token.is_fresh() {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.refresh().await?;
        let access = token.access_token.clone();
        *cached = Some(token);
        Ok(access)
    }

    async fn refresh(&self) -> ServiceResult<CachedToken> {
        let file = load_token_file(&self.token_path).await?;

        // Stored access tokens are usable until their recorded expiry.
        if let (Some(access), Some(expiry)) = (&file.access_token, file.expiry) {
            let candidate = CachedToken {
                access_token: access.clone(),
                expires_at: expiry,
            };
            if candidate.is_fresh() {
                debug!("using stored access token");
                return Ok(candidate);
            }
        }

        let Some(refresh_token) = file.refresh_token.as_deref() else {
            return Err(ServiceError::auth(
                "token file has no refresh token; re-run the authorization flow",
            ));
        };

        let token_uri = self
            .token_uri_override
            .clone()
            .or(file.token_uri.clone())
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        let response = self
            .http
            .post(&token_uri)
            .form(&[
                ("client_id", file.client_id.as_str()),
                ("client_secret", file.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::auth(format!(
                "token refresh rejected ({status}): {body}; re-run the authorization flow"
            )));
        }

        let refreshed: RefreshResponse = response.json().await?;
        let expires_in = refreshed.expires_in.unwrap_or(3600);
        info!(expires_in, "refreshed OAuth access token");
        Ok(CachedToken {
            access_token: refreshed.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in),
        })
    }
}

async fn load_token_file(path: &Path) -> ServiceResult<TokenFile> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        ServiceError::auth(format!(
            "cannot read token file {}: {e}; re-run the authorization flow",
            path.display()
        ))
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ServiceError::auth(format!("token file is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn write_token_file(dir: &tempfile::TempDir, json: serde_json::Value) -> PathBuf {
        let path = dir.path().join("token.json");
        tokio::fs::write(&path, serde_json::to_vec(&json).unwrap())
            .await
            .unwrap();
        path
    }

    #[tokio::test]
    async fn missing_token_file_requires_reauth() {
        let cache = OAuthTokenCache::new("/nonexistent/token.json");
        let err = cache.access_token().await.unwrap_err();
        match err {
            ServiceError::Auth(msg) => assert!(msg.contains("re-run the authorization flow")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn refreshes_with_stored_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh-token",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = write_token_file(
            &dir,
            serde_json::json!({
                "refresh_token": "rt",
                "client_id": "cid",
                "client_secret": "cs"
            }),
        )
        .await;

        let cache = OAuthTokenCache::new(path).with_token_uri(server.uri());
        assert_eq!(cache.access_token().await.unwrap(), "fresh-token");
        // Second call hits the in-memory cache.
        assert_eq!(cache.access_token().await.unwrap(), "fresh-token");
    }

    #[tokio::test]
    async fn rejected_refresh_requires_reauth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = write_token_file(
            &dir,
            serde_json::json!({
                "refresh_token": "revoked",
                "client_id": "cid",
                "client_secret": "cs"
            }),
        )
        .await;

        let cache = OAuthTokenCache::new(path).with_token_uri(server.uri());
        let err = cache.access_token().await.unwrap_err();
        assert!(matches!(err, ServiceError::Auth(_)));
    }

    #[tokio::test]
    async fn stored_unexpired_access_token_skips_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_token_file(
            &dir,
            serde_json::json!({
                "access_token": "stored",
                "refresh_token": "rt",
                "client_id": "cid",
                "client_secret": "cs",
                "expiry": Utc::now() + chrono::Duration::hours(1)
            }),
        )
        .await;

        // token_uri points nowhere; a refresh attempt would error.
        let cache = OAuthTokenCache::new(path).with_token_uri("http://127.0.0.1:1");
        assert_eq!(cache.access_token().await.unwrap(), "stored");
    }
}
