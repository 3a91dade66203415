// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Thin MCP protocol adapter over the gateway and analysis engine
//!
//! Serializes core results into JSON-RPC responses and maps the error
//! taxonomy onto protocol-level failures; it holds no business logic
//! of its own.

pub mod schema;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::constants::protocol;
use crate::errors::StravaError;
use crate::gateway::StravaGateway;
use crate::intelligence;
use crate::mcp::schema::{create_strava_tools, InitializeResponse};

// JSON-RPC Error Codes (as defined in the JSON-RPC 2.0 specification)
const ERROR_METHOD_NOT_FOUND: i32 = -32601;
const ERROR_INVALID_PARAMS: i32 = -32602;
const ERROR_INTERNAL_ERROR: i32 = -32603;

// Application error codes, one per error kind in the core taxonomy
const ERROR_AUTH: i32 = -32001;
const ERROR_RATE_LIMITED: i32 = -32002;
const ERROR_UPSTREAM_UNAVAILABLE: i32 = -32003;
const ERROR_API: i32 = -32004;
const ERROR_VALIDATION: i32 = -32005;

/// Default activity page size when a tool call does not pass `limit`
const DEFAULT_ACTIVITY_LIMIT: usize = 10;

pub struct McpServer {
    gateway: Arc<StravaGateway>,
}

impl McpServer {
    pub fn new(gateway: Arc<StravaGateway>) -> Self {
        Self { gateway }
    }

    /// Serve line-delimited JSON-RPC over TCP
    pub async fn run(self, port: u16) -> Result<()> {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
        info!("MCP server listening on port {}", port);

        loop {
            let (socket, addr) = listener.accept().await?;
            info!("New connection from {}", addr);

            let gateway = self.gateway.clone();

            tokio::spawn(async move {
                let (reader, mut writer) = socket.into_split();
                let mut reader = BufReader::new(reader);
                let mut line = String::new();

                while reader.read_line(&mut line).await.unwrap_or(0) > 0 {
                    if let Ok(request) = serde_json::from_str::<McpRequest>(&line) {
                        let response = handle_request(request, &gateway).await;
                        match serde_json::to_string(&response) {
                            Ok(response_str) => {
                                writer.write_all(response_str.as_bytes()).await.ok();
                                writer.write_all(b"\n").await.ok();
                            }
                            Err(e) => warn!("failed to serialize response: {e}"),
                        }
                    }
                    line.clear();
                }
            });
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct McpRequest {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Value,
}

#[derive(Debug, Serialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
    pub id: Value,
}

#[derive(Debug, Serialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpResponse {
    fn success(result: Value, id: Value) -> Self {
        Self {
            jsonrpc: protocol::JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn failure(code: i32, message: String, data: Option<Value>, id: Value) -> Self {
        Self {
            jsonrpc: protocol::JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(McpError {
                code,
                message,
                data,
            }),
            id,
        }
    }
}

/// Map a core error to its JSON-RPC representation
///
/// The retry hint travels in the error data so hosts can schedule a
/// retry without parsing the message text.
pub fn error_response(err: &StravaError, id: Value) -> McpResponse {
    let code = match err {
        StravaError::Auth(_) => ERROR_AUTH,
        StravaError::RateLimited { .. } => ERROR_RATE_LIMITED,
        StravaError::UpstreamUnavailable { .. } => ERROR_UPSTREAM_UNAVAILABLE,
        StravaError::Api { .. } => ERROR_API,
        StravaError::Validation(_) => ERROR_VALIDATION,
    };
    let data = err
        .retry_after()
        .map(|d| json!({ "retry_after_secs": d.as_secs() }));
    McpResponse::failure(code, err.to_string(), data, id)
}

pub async fn handle_request(request: McpRequest, gateway: &StravaGateway) -> McpResponse {
    match request.method.as_str() {
        "initialize" => {
            let init_response = InitializeResponse::new(
                protocol::mcp_protocol_version(),
                protocol::SERVER_NAME.to_string(),
                protocol::SERVER_VERSION.to_string(),
            );

            match serde_json::to_value(&init_response) {
                Ok(result) => McpResponse::success(result, request.id),
                Err(e) => McpResponse::failure(
                    ERROR_INTERNAL_ERROR,
                    format!("failed to build initialize response: {e}"),
                    None,
                    request.id,
                ),
            }
        }
        "tools/list" => {
            let tools = create_strava_tools();
            McpResponse::success(json!({ "tools": tools }), request.id)
        }
        "tools/call" => {
            let params = request.params.unwrap_or_default();
            let tool_name = params["name"].as_str().unwrap_or("").to_string();
            let args = params["arguments"].clone();

            handle_tool_call(&tool_name, &args, gateway, request.id).await
        }
        _ => McpResponse::failure(
            ERROR_METHOD_NOT_FOUND,
            "Method not found".to_string(),
            None,
            request.id,
        ),
    }
}

async fn handle_tool_call(
    tool_name: &str,
    args: &Value,
    gateway: &StravaGateway,
    id: Value,
) -> McpResponse {
    let limit = args["limit"]
        .as_u64()
        .map(|n| n as usize)
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT);

    match tool_name {
        "get_activities" => {
            match gateway.list_activities(Some(limit)).await {
                Ok(activities) => match serde_json::to_value(&activities) {
                    Ok(result) => McpResponse::success(result, id),
                    Err(e) => McpResponse::failure(
                        ERROR_INTERNAL_ERROR,
                        e.to_string(),
                        None,
                        id,
                    ),
                },
                Err(e) => error_response(&e, id),
            }
        }
        "get_activity" => {
            let activity_id = match args["activity_id"].as_u64() {
                Some(activity_id) => activity_id,
                None => {
                    return McpResponse::failure(
                        ERROR_INVALID_PARAMS,
                        "activity_id is required".to_string(),
                        None,
                        id,
                    )
                }
            };

            match gateway.get_activity(activity_id).await {
                Ok(activity) => match serde_json::to_value(&activity) {
                    Ok(result) => McpResponse::success(result, id),
                    Err(e) => McpResponse::failure(
                        ERROR_INTERNAL_ERROR,
                        e.to_string(),
                        None,
                        id,
                    ),
                },
                Err(e) => error_response(&e, id),
            }
        }
        "analyze_activity" => {
            let activity_id = match args["activity_id"].as_u64() {
                Some(activity_id) => activity_id,
                None => {
                    return McpResponse::failure(
                        ERROR_INVALID_PARAMS,
                        "activity_id is required".to_string(),
                        None,
                        id,
                    )
                }
            };

            let analysis = match gateway.get_activity(activity_id).await {
                Ok(activity) => intelligence::analyze_activity(&activity),
                Err(e) => return error_response(&e, id),
            };

            match analysis {
                Ok(analysis) => match serde_json::to_value(&analysis) {
                    Ok(result) => McpResponse::success(result, id),
                    Err(e) => McpResponse::failure(
                        ERROR_INTERNAL_ERROR,
                        e.to_string(),
                        None,
                        id,
                    ),
                },
                Err(e) => error_response(&e, id),
            }
        }
        "analyze_training_load" => {
            let summary = match gateway.list_activities(Some(limit)).await {
                Ok(activities) => intelligence::analyze_training_load(&activities),
                Err(e) => return error_response(&e, id),
            };

            match summary {
                Ok(summary) => match serde_json::to_value(&summary) {
                    Ok(result) => McpResponse::success(result, id),
                    Err(e) => McpResponse::failure(
                        ERROR_INTERNAL_ERROR,
                        e.to_string(),
                        None,
                        id,
                    ),
                },
                Err(e) => error_response(&e, id),
            }
        }
        "get_activity_recommendations" => {
            let summary = match gateway.list_activities(Some(limit)).await {
                Ok(activities) => intelligence::analyze_training_load(&activities),
                Err(e) => return error_response(&e, id),
            };

            match summary {
                Ok(summary) => {
                    let recommendations = intelligence::get_activity_recommendations(&summary);
                    McpResponse::success(
                        json!({
                            "summary": summary,
                            "recommendations": recommendations,
                        }),
                        id,
                    )
                }
                Err(e) => error_response(&e, id),
            }
        }
        _ => McpResponse::failure(
            ERROR_METHOD_NOT_FOUND,
            "Unknown tool".to_string(),
            None,
            id,
        ),
    }
}
