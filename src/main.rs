// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use strava_mcp_server::clock::SystemClock;
use strava_mcp_server::config::Config;
use strava_mcp_server::constants::env_config;
use strava_mcp_server::gateway::StravaGateway;
use strava_mcp_server::logging::LoggingConfig;
use strava_mcp_server::mcp::McpServer;
use strava_mcp_server::rate_limit::RateLimiter;
use strava_mcp_server::token::{CredentialStore, FileCredentialStore, TokenManager};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// MCP port (default: from MCP_PORT or 8080)
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the credentials file location
    #[arg(short, long)]
    credentials: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    LoggingConfig::from_env().init()?;

    let args = Args::parse();
    let config = Config::load()?;
    let port = args.port.unwrap_or_else(env_config::mcp_port);

    let credentials_path = args
        .credentials
        .map(Into::into)
        .unwrap_or_else(|| config.credentials_path.clone());
    let store = FileCredentialStore::new(&credentials_path);

    // First run without an auth-setup pass: seed the record from the
    // environment tokens when they are available.
    if !store.exists() {
        let seeded = config
            .initial_credential_from_env()
            .context("no credentials file found; run auth-setup or set STRAVA_ACCESS_TOKEN, STRAVA_REFRESH_TOKEN and STRAVA_TOKEN_EXPIRES_AT")?;
        store.save(&seeded).await?;
        info!("seeded credentials file from environment tokens");
    }

    info!("Starting Strava MCP Server on port {}", port);

    let clock = Arc::new(SystemClock);
    let tokens = Arc::new(TokenManager::new(Arc::new(store), clock.clone()));
    let limiter = Arc::new(RateLimiter::new(clock));
    let gateway = Arc::new(StravaGateway::new(tokens, limiter));

    let server = McpServer::new(gateway);
    server.run(port).await?;

    Ok(())
}
