// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error taxonomy shared by the credential manager, rate limiter,
//! gateway and analysis engine. Every failure carries enough structure
//! for the protocol adapter to produce an actionable error without
//! inspecting internals.

use std::time::Duration;

/// Errors surfaced by the Strava bridge core
#[derive(Debug, thiserror::Error)]
pub enum StravaError {
    /// Credential invalid or unrefreshable. Fatal for the current
    /// request, non-fatal for the process.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Local or upstream quota hit. Recoverable by waiting.
    #[error("rate limit exceeded")]
    RateLimited {
        /// Time until the next request slot opens, when known
        retry_after: Option<Duration>,
    },

    /// Network failure or 5xx responses that survived the retry budget
    #[error("upstream unavailable after {attempts} attempts: {message}")]
    UpstreamUnavailable { attempts: u32, message: String },

    /// Unexpected API response, surfaced as-is and never retried
    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// Structurally invalid activity data, rejected rather than coerced
    #[error("invalid activity data: {0}")]
    Validation(String),
}

impl StravaError {
    /// Retry hint for rate-limited failures
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            StravaError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StravaError>;
