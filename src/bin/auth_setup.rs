// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! One-shot OAuth authorization helper
//!
//! Prints the Strava consent URL, waits for the redirect on a local
//! listener, exchanges the authorization code and writes the initial
//! credential record. Run this once before starting the server.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::info;
use url::Url;

use strava_mcp_server::config::Config;
use strava_mcp_server::constants::{env_config, strava};
use strava_mcp_server::token::{Credential, CredentialStore, FileCredentialStore};

const SUCCESS_HTML: &str = "HTTP/1.1 200 OK\r\n\
    Content-Type: text/html\r\n\r\n\
    <html><body>\
    <h1>Authorization successful!</h1>\
    <p>You can close this window and return to the terminal.</p>\
    </body></html>";

const ERROR_HTML: &str = "HTTP/1.1 400 Bad Request\r\n\
    Content-Type: text/html\r\n\r\n\
    <html><body>\
    <h1>Authorization failed</h1>\
    <p>No authorization code received. Check the terminal for details.</p>\
    </body></html>";

#[derive(Parser, Debug)]
#[command(name = "auth-setup")]
#[command(about = "Set up OAuth authorization for the Strava MCP server")]
struct Args {
    /// Callback port (default: from OAUTH_CALLBACK_PORT or 8000)
    #[arg(long)]
    port: Option<u16>,

    /// Override the credentials file location
    #[arg(short, long)]
    credentials: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CodeExchangeResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::load()?;
    let port = args.port.unwrap_or_else(env_config::callback_port);

    let credentials_path = args
        .credentials
        .map(Into::into)
        .unwrap_or_else(|| config.credentials_path.clone());

    let redirect_uri = format!("http://localhost:{}/callback", port);
    let auth_url = build_auth_url(&config.client_id, &redirect_uri)?;

    println!("\nPlease visit this URL to authorize the application:");
    println!("{}\n", auth_url);

    let code = wait_for_callback(port).await?;
    info!("authorization code received, exchanging for tokens");

    let credential = exchange_code(&config, &code).await?;
    let store = FileCredentialStore::new(&credentials_path);
    store.save(&credential).await?;

    println!(
        "Authorization complete. Credentials written to {}",
        credentials_path.display()
    );
    Ok(())
}

fn build_auth_url(client_id: &str, redirect_uri: &str) -> Result<String> {
    let mut url = Url::parse(strava::AUTH_URL)?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", strava::OAUTH_SCOPES);
    Ok(url.to_string())
}

/// Accept one connection on the callback port and extract the code
async fn wait_for_callback(port: u16) -> Result<String> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Listening for OAuth callback on port {}", port);

    loop {
        let (socket, _) = listener.accept().await?;
        let (reader, mut writer) = socket.into_split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
            continue;
        }

        // Parse the GET request line: "GET /callback?code=... HTTP/1.1"
        let extracted = line
            .split_whitespace()
            .nth(1)
            .and_then(|path| Url::parse(&format!("http://localhost{}", path)).ok())
            .and_then(|url| {
                let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
                params.get("code").cloned()
            });

        match extracted {
            Some(code) => {
                writer.write_all(SUCCESS_HTML.as_bytes()).await.ok();
                return Ok(code);
            }
            None => {
                writer.write_all(ERROR_HTML.as_bytes()).await.ok();
            }
        }
    }
}

async fn exchange_code(config: &Config, code: &str) -> Result<Credential> {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("code", code),
        ("grant_type", "authorization_code"),
    ];

    let response = reqwest::Client::new()
        .post(strava::TOKEN_URL)
        .form(&params)
        .send()
        .await
        .context("code exchange request failed")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("code exchange rejected (status {}): {}", status, body);
    }

    let token: CodeExchangeResponse = response
        .json()
        .await
        .context("malformed token response")?;

    Ok(Credential {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at: Utc::now() + Duration::seconds(token.expires_in),
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
    })
}
