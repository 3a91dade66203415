// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration loading for the Strava MCP bridge
//!
//! Configuration comes from the environment (optionally via a `.env`
//! file): the OAuth application credentials plus the path of the
//! durable credential record. When the credential file does not exist
//! yet, an initial record can be seeded from `STRAVA_ACCESS_TOKEN`,
//! `STRAVA_REFRESH_TOKEN` and `STRAVA_TOKEN_EXPIRES_AT`, matching the
//! env-based storage of early deployments.

use crate::token::Credential;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Strava OAuth application client id
    pub client_id: String,
    /// Strava OAuth application client secret
    pub client_secret: String,
    /// Location of the durable credential record
    pub credentials_path: PathBuf,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let client_id =
            env::var("STRAVA_CLIENT_ID").context("STRAVA_CLIENT_ID is not set")?;
        let client_secret =
            env::var("STRAVA_CLIENT_SECRET").context("STRAVA_CLIENT_SECRET is not set")?;

        let credentials_path = match env::var("STRAVA_CREDENTIALS_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_credentials_path(),
        };

        Ok(Self {
            client_id,
            client_secret,
            credentials_path,
        })
    }

    /// Build an initial credential record from environment tokens, if
    /// all three are present
    pub fn initial_credential_from_env(&self) -> Option<Credential> {
        let access_token = env::var("STRAVA_ACCESS_TOKEN").ok()?;
        let refresh_token = env::var("STRAVA_REFRESH_TOKEN").ok()?;
        let expires_at = env::var("STRAVA_TOKEN_EXPIRES_AT")
            .ok()?
            .parse::<i64>()
            .ok()
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))?;

        Some(Credential {
            access_token,
            refresh_token,
            expires_at,
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
        })
    }
}

fn default_credentials_path() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("strava-mcp-server/credentials.toml"))
        .unwrap_or_else(|| PathBuf::from("credentials.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_credentials_path_has_file_name() {
        let path = default_credentials_path();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("credentials.toml")
        );
    }

    #[test]
    fn test_initial_credential_requires_all_tokens() {
        let config = Config {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            credentials_path: PathBuf::from("credentials.toml"),
        };

        // Env vars unset in the test environment
        env::remove_var("STRAVA_ACCESS_TOKEN");
        env::remove_var("STRAVA_REFRESH_TOKEN");
        env::remove_var("STRAVA_TOKEN_EXPIRES_AT");
        assert!(config.initial_credential_from_env().is_none());
    }
}
