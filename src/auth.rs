//! OAuth credential provider backed by a token cache file.
//!
//! The cache (`token.json` by default) is written by the interactive consent
//! flow, which runs outside this tool. At startup the provider loads it; when
//! the access token is expired, or the store rejects it mid-run, the provider
//! exchanges the refresh token at the OAuth token endpoint and rewrites the
//! cache. The provider is injected into the store client as an explicit
//! dependency, never read from global state.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::contract::{ConfigError, StoreAccessError};

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed proactively.
const EXPIRY_SLACK_SECONDS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedToken {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expiry: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct TokenProvider {
    http: reqwest::Client,
    cache_path: PathBuf,
    client_id: String,
    client_secret: String,
    state: Mutex<CachedToken>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenProvider {
    /// Load the cached token. A missing or unparsable cache is a configuration
    /// error: the operator has to complete the consent flow first.
    pub fn from_cache(
        cache_path: PathBuf,
        client_id: String,
        client_secret: String,
    ) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(&cache_path).map_err(|_| ConfigError::TokenCacheMissing {
            path: cache_path.display().to_string(),
        })?;
        let token: CachedToken =
            serde_json::from_str(&raw).map_err(|e| ConfigError::TokenCacheInvalid {
                path: cache_path.display().to_string(),
                reason: e.to_string(),
            })?;
        debug!(path = %cache_path.display(), "Loaded OAuth token cache");
        Ok(Self {
            http: reqwest::Client::new(),
            cache_path,
            client_id,
            client_secret,
            state: Mutex::new(token),
        })
    }

    /// Current access token, refreshed first if it is expired or about to be.
    pub async fn access_token(&self) -> Result<String, StoreAccessError> {
        let mut state = self.state.lock().await;
        if is_expired(&state) {
            self.refresh_locked(&mut state).await?;
        }
        Ok(state.access_token.clone())
    }

    /// Force a refresh after the store rejected the current token.
    pub async fn invalidate(&self) -> Result<String, StoreAccessError> {
        let mut state = self.state.lock().await;
        self.refresh_locked(&mut state).await?;
        Ok(state.access_token.clone())
    }

    async fn refresh_locked(&self, state: &mut CachedToken) -> Result<(), StoreAccessError> {
        debug!("Refreshing access token via refresh_token grant");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", state.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&params)
            .send()
            .await
            .map_err(|e| StoreAccessError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<unreadable body>"));
            return Err(if status.as_u16() == 400 || status.as_u16() == 401 {
                StoreAccessError::Auth(format!("token refresh rejected ({status}): {body}"))
            } else {
                StoreAccessError::Http {
                    status: status.as_u16(),
                    message: body,
                }
            });
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| StoreAccessError::Network(e.to_string()))?;
        state.access_token = refreshed.access_token;
        state.expiry = refreshed
            .expires_in
            .map(|seconds| Utc::now() + Duration::seconds(seconds));

        // A stale cache only costs an extra refresh next run; don't fail over it.
        if let Err(e) = self.write_cache(state) {
            warn!(error = %e, path = %self.cache_path.display(), "Failed to rewrite token cache");
        }
        Ok(())
    }

    fn write_cache(&self, state: &CachedToken) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.cache_path, json)
    }
}

fn is_expired(token: &CachedToken) -> bool {
    match token.expiry {
        Some(expiry) => Utc::now() + Duration::seconds(EXPIRY_SLACK_SECONDS) >= expiry,
        // No recorded expiry: assume valid until the store says otherwise.
        None => false,
    }
}
