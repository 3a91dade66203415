// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Constants Module
//!
//! Application constants and environment-based configuration values.

use std::env;

/// Strava endpoint URLs
pub mod strava {
    /// Base URL for the Strava v3 REST API
    pub const API_BASE: &str = "https://www.strava.com/api/v3";

    /// OAuth authorization endpoint (browser consent)
    pub const AUTH_URL: &str = "https://www.strava.com/oauth/authorize";

    /// OAuth token endpoint (code exchange and refresh)
    pub const TOKEN_URL: &str = "https://www.strava.com/oauth/token";

    /// Scopes requested during the initial authorization
    pub const OAUTH_SCOPES: &str = "read,activity:read_all";
}

/// Upstream request quotas, enforced locally before any HTTP call
pub mod rate_limit {
    /// Short rolling window length in seconds (15 minutes)
    pub const SHORT_WINDOW_SECS: i64 = 900;

    /// Maximum requests admitted per short window
    pub const SHORT_WINDOW_LIMIT: usize = 100;

    /// Long rolling window length in seconds (24 hours)
    pub const DAILY_WINDOW_SECS: i64 = 86_400;

    /// Maximum requests admitted per long window
    pub const DAILY_WINDOW_LIMIT: usize = 1_000;
}

/// Token refresh policy
pub mod token {
    /// Refresh this many seconds before the recorded expiry. Absorbs
    /// clock skew and in-flight request latency.
    pub const REFRESH_MARGIN_SECS: i64 = 60;
}

/// Retry policy for transient upstream failures
pub mod retry {
    use std::time::Duration;

    /// Total attempts for a single gateway call (first try included)
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Delay before the first retry; doubles per attempt
    pub const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
}

/// Protocol-related constants
pub mod protocol {
    use std::env;

    /// JSON-RPC version (standard, not configurable)
    pub const JSONRPC_VERSION: &str = "2.0";

    pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

    pub const SERVER_NAME: &str = "strava-mcp-server";

    /// Server version from Cargo.toml
    pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Get MCP Protocol version from environment or default
    pub fn mcp_protocol_version() -> String {
        env::var("MCP_PROTOCOL_VERSION").unwrap_or_else(|_| MCP_PROTOCOL_VERSION.to_string())
    }
}

/// Environment-based configuration
pub mod env_config {
    use super::env;

    /// Get MCP server port from environment or default
    pub fn mcp_port() -> u16 {
        env::var("MCP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080)
    }

    /// Get OAuth callback port for auth-setup from environment or default
    pub fn callback_port() -> u16 {
        env::var("OAUTH_CALLBACK_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .unwrap_or(8000)
    }

    /// Get log level from environment or default
    pub fn log_level() -> String {
        env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    }
}
