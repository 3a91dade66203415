// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Credential Manager
//!
//! Keeps the Strava OAuth access token valid without user interaction.
//! The manager refreshes lazily at the point of use, never on a timer,
//! and serializes refresh attempts so concurrent callers coalesce into
//! a single token exchange (a stale refresh token must never be reused
//! after the provider rotates it).

use crate::clock::Clock;
use crate::constants::token::REFRESH_MARGIN_SECS;
use crate::errors::{Result, StravaError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Durable OAuth credential record
///
/// `expires_at` is the authoritative source of validity; the access
/// token is never used past it. The record is created once by the
/// `auth-setup` helper and afterwards only overwritten on refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub client_id: String,
    pub client_secret: String,
}

/// Read/write access to the durable credential record
///
/// Implementation-agnostic by design: a file, an environment-backed
/// store, or a secret manager all satisfy the same contract.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<Credential>;
    async fn save(&self, credential: &Credential) -> anyhow::Result<()>;
}

/// Credential record persisted as a TOML file
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[async_trait::async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> anyhow::Result<Credential> {
        use anyhow::Context;
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read credentials from {}", self.path.display()))?;
        toml::from_str(&content).context("Failed to parse credentials file")
    }

    async fn save(&self, credential: &Credential) -> anyhow::Result<()> {
        use anyhow::Context;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = toml::to_string_pretty(credential)?;
        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("Failed to write credentials to {}", self.path.display()))
    }
}

/// In-memory store for tests and ephemeral setups
pub struct MemoryCredentialStore {
    credential: RwLock<Credential>,
}

impl MemoryCredentialStore {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential: RwLock::new(credential),
        }
    }

    /// Snapshot of the stored record
    pub async fn current(&self) -> Credential {
        self.credential.read().await.clone()
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> anyhow::Result<Credential> {
        Ok(self.credential.read().await.clone())
    }

    async fn save(&self, credential: &Credential) -> anyhow::Result<()> {
        *self.credential.write().await = credential.clone();
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

/// Guarantees a valid access token before each outbound call
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    http: reqwest::Client,
    token_url: String,
    safety_margin: Duration,
    // Write lock doubles as the single-flight critical section for
    // refresh exchanges.
    current: RwLock<Option<Credential>>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_token_url(store, clock, crate::constants::strava::TOKEN_URL)
    }

    /// Manager pointed at a non-default token endpoint (tests)
    pub fn with_token_url(
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            http: reqwest::Client::new(),
            token_url: token_url.into(),
            safety_margin: Duration::seconds(REFRESH_MARGIN_SECS),
            current: RwLock::new(None),
        }
    }

    fn is_fresh(&self, credential: &Credential) -> bool {
        self.clock.now() < credential.expires_at - self.safety_margin
    }

    /// Return a valid access token, refreshing first if the current one
    /// is inside the safety margin of its expiry.
    ///
    /// Concurrent callers observing an expiring token coalesce into one
    /// refresh exchange: the write lock serializes them and the
    /// re-check after acquiring it lets late arrivals reuse the result.
    pub async fn ensure_valid(&self) -> Result<String> {
        if let Some(credential) = self.current.read().await.as_ref() {
            if self.is_fresh(credential) {
                return Ok(credential.access_token.clone());
            }
        }

        let mut slot = self.current.write().await;
        let credential = match slot.take() {
            Some(credential) => credential,
            None => self
                .store
                .load()
                .await
                .map_err(|e| StravaError::Auth(format!("cannot load credential: {e}")))?,
        };

        if self.is_fresh(&credential) {
            let token = credential.access_token.clone();
            *slot = Some(credential);
            return Ok(token);
        }

        debug!("access token expires soon, refreshing");
        let refreshed = self.refresh_exchange(&credential).await?;
        // Persisting the record is the last step of a successful
        // refresh; a half-updated record must never become visible.
        self.store
            .save(&refreshed)
            .await
            .map_err(|e| StravaError::Auth(format!("cannot persist refreshed credential: {e}")))?;
        let token = refreshed.access_token.clone();
        *slot = Some(refreshed);
        info!("access token refreshed");
        Ok(token)
    }

    /// Refresh regardless of the cached expiry. Used by the gateway
    /// after a 401, which proves the token is invalid upstream.
    ///
    /// `stale_token` is the token the caller just saw rejected; when it
    /// no longer matches the current credential another caller already
    /// rotated it, and that result is reused without a second exchange.
    pub async fn force_refresh(&self, stale_token: &str) -> Result<String> {
        let mut slot = self.current.write().await;
        let credential = match slot.take() {
            Some(credential) => credential,
            None => self
                .store
                .load()
                .await
                .map_err(|e| StravaError::Auth(format!("cannot load credential: {e}")))?,
        };

        if credential.access_token != stale_token {
            let token = credential.access_token.clone();
            *slot = Some(credential);
            return Ok(token);
        }

        warn!("access token rejected upstream, forcing refresh");
        let refreshed = self.refresh_exchange(&credential).await?;
        self.store
            .save(&refreshed)
            .await
            .map_err(|e| StravaError::Auth(format!("cannot persist refreshed credential: {e}")))?;
        let token = refreshed.access_token.clone();
        *slot = Some(refreshed);
        Ok(token)
    }

    /// One token-endpoint exchange. No internal retry: retries are the
    /// gateway's responsibility and a stale token must not be reused.
    async fn refresh_exchange(&self, credential: &Credential) -> Result<Credential> {
        let params = [
            ("client_id", credential.client_id.as_str()),
            ("client_secret", credential.client_secret.as_str()),
            ("refresh_token", credential.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| StravaError::Auth(format!("token refresh request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StravaError::Auth(format!(
                "token refresh rejected (status {}): {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| StravaError::Auth(format!("malformed token response: {e}")))?;

        Ok(Credential {
            access_token: token.access_token,
            // Strava rotates the refresh token on every exchange; keep
            // the old one only if the provider omits a new one.
            refresh_token: token
                .refresh_token
                .unwrap_or_else(|| credential.refresh_token.clone()),
            expires_at: self.clock.now() + Duration::seconds(token.expires_in),
            client_id: credential.client_id.clone(),
            client_secret: credential.client_secret.clone(),
        })
    }
}
