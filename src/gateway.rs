// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # API Gateway
//!
//! The single choke-point for all upstream Strava calls. Every fetch
//! goes through the same sequence: ensure a valid access token, pass
//! the local rate limiter, then issue the HTTP request and interpret
//! the response:
//!
//! - 2xx: parse and return the body
//! - 401: force one token refresh and retry exactly once
//! - 429: surface provider-side throttling with its Retry-After hint
//! - 5xx / transport errors: bounded exponential backoff
//! - other 4xx: surface as-is, never retried

use crate::constants::retry;
use crate::errors::{Result, StravaError};
use crate::models::Activity;
use crate::rate_limit::RateLimiter;
use crate::token::TokenManager;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct StravaGateway {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenManager>,
    limiter: Arc<RateLimiter>,
}

impl StravaGateway {
    pub fn new(tokens: Arc<TokenManager>, limiter: Arc<RateLimiter>) -> Self {
        Self::with_base_url(tokens, limiter, crate::constants::strava::API_BASE)
    }

    /// Gateway pointed at a non-default API base (tests)
    pub fn with_base_url(
        tokens: Arc<TokenManager>,
        limiter: Arc<RateLimiter>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            tokens,
            limiter,
        }
    }

    /// Issue an authenticated GET against the Strava API
    pub async fn fetch(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let mut token = self.tokens.ensure_valid().await?;
        // Local quota check happens before any HTTP attempt; a rejected
        // request consumes no quota and is never silently dropped.
        self.limiter.acquire()?;

        let url = format!("{}{}", self.base_url, path);
        let mut refreshed_after_401 = false;
        let mut attempts: u32 = 0;
        let mut backoff = retry::INITIAL_BACKOFF;

        loop {
            let outcome = self
                .http
                .get(&url)
                .query(query)
                .bearer_auth(&token)
                .send()
                .await;

            let transient_reason = match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return serde_json::from_str(&body).map_err(|e| StravaError::Api {
                            status: status.as_u16(),
                            body: format!("unparseable response body: {e}"),
                        });
                    }

                    match status.as_u16() {
                        401 => {
                            if refreshed_after_401 {
                                return Err(StravaError::Auth(
                                    "access token rejected twice by upstream".to_string(),
                                ));
                            }
                            // The cached expiry lied; the 401 is authoritative.
                            token = self.tokens.force_refresh(&token).await?;
                            refreshed_after_401 = true;
                            continue;
                        }
                        429 => {
                            let retry_after = response
                                .headers()
                                .get("Retry-After")
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.parse::<u64>().ok())
                                .map(Duration::from_secs);
                            warn!("upstream rate limit hit on {path}");
                            return Err(StravaError::RateLimited { retry_after });
                        }
                        status_code if status_code >= 500 => {
                            format!("upstream returned status {status_code}")
                        }
                        status_code => {
                            let body = response.text().await.unwrap_or_default();
                            return Err(StravaError::Api {
                                status: status_code,
                                body,
                            });
                        }
                    }
                }
                Err(e) => format!("request failed: {e}"),
            };

            // Transient failure: walk the backoff schedule
            attempts += 1;
            if attempts >= retry::MAX_ATTEMPTS {
                return Err(StravaError::UpstreamUnavailable {
                    attempts,
                    message: transient_reason,
                });
            }
            debug!(
                "transient failure on {path} ({transient_reason}), retry {attempts} in {:?}",
                backoff
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    /// List the athlete's most recent activities
    pub async fn list_activities(&self, per_page: Option<usize>) -> Result<Vec<Activity>> {
        let mut query = Vec::new();
        if let Some(per_page) = per_page {
            query.push(("per_page", per_page.to_string()));
        }

        let body = self.fetch("/athlete/activities", &query).await?;
        serde_json::from_value(body)
            .map_err(|e| StravaError::Validation(format!("malformed activity list: {e}")))
    }

    /// Fetch a single activity by id
    pub async fn get_activity(&self, id: u64) -> Result<Activity> {
        let body = self.fetch(&format!("/activities/{id}"), &[]).await?;
        serde_json::from_value(body)
            .map_err(|e| StravaError::Validation(format!("malformed activity record: {e}")))
    }
}
