// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! MCP Protocol Schema Definitions
//!
//! Type-safe definitions for the MCP protocol messages and the tool
//! schemas this server advertises.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identity advertised in the initialize handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// A tool as advertised to the MCP host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonSchema,
}

/// JSON Schema describing a tool's argument object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, PropertySchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

/// A single named property inside a tool argument schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Capability set offered by this server (tools only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: Vec<ToolSchema>,
}

/// Full payload of a successful `initialize` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    pub capabilities: ServerCapabilities,
}

impl InitializeResponse {
    pub fn new(protocol_version: String, server_name: String, server_version: String) -> Self {
        Self {
            protocol_version,
            server_info: ServerInfo {
                name: server_name,
                version: server_version,
            },
            capabilities: ServerCapabilities {
                tools: create_strava_tools(),
            },
        }
    }
}

/// Create all tool schemas exposed by this server
pub fn create_strava_tools() -> Vec<ToolSchema> {
    vec![
        create_get_activities_tool(),
        create_get_activity_tool(),
        create_analyze_activity_tool(),
        create_analyze_training_load_tool(),
        create_recommendations_tool(),
    ]
}

fn limit_property() -> (String, PropertySchema) {
    (
        "limit".to_string(),
        PropertySchema {
            property_type: "number".to_string(),
            description: Some("Maximum number of recent activities to fetch".to_string()),
        },
    )
}

fn activity_id_property() -> (String, PropertySchema) {
    (
        "activity_id".to_string(),
        PropertySchema {
            property_type: "number".to_string(),
            description: Some("Strava activity identifier".to_string()),
        },
    )
}

/// Create the get_activities tool schema
fn create_get_activities_tool() -> ToolSchema {
    let properties = HashMap::from([limit_property()]);

    ToolSchema {
        name: "get_activities".to_string(),
        description: "Get the athlete's recent Strava activities".to_string(),
        input_schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: None,
        },
    }
}

/// Create the get_activity tool schema
fn create_get_activity_tool() -> ToolSchema {
    let properties = HashMap::from([activity_id_property()]);

    ToolSchema {
        name: "get_activity".to_string(),
        description: "Get a single Strava activity by id".to_string(),
        input_schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: Some(vec!["activity_id".to_string()]),
        },
    }
}

/// Create the analyze_activity tool schema
fn create_analyze_activity_tool() -> ToolSchema {
    let properties = HashMap::from([activity_id_property()]);

    ToolSchema {
        name: "analyze_activity".to_string(),
        description: "Analyze pace and effort level of a single activity".to_string(),
        input_schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: Some(vec!["activity_id".to_string()]),
        },
    }
}

/// Create the analyze_training_load tool schema
fn create_analyze_training_load_tool() -> ToolSchema {
    let properties = HashMap::from([limit_property()]);

    ToolSchema {
        name: "analyze_training_load".to_string(),
        description: "Summarize training volume and heart-rate zone distribution \
                      across recent activities"
            .to_string(),
        input_schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: None,
        },
    }
}

/// Create the get_activity_recommendations tool schema
fn create_recommendations_tool() -> ToolSchema {
    let properties = HashMap::from([limit_property()]);

    ToolSchema {
        name: "get_activity_recommendations".to_string(),
        description: "Get training guidance derived from recent training load".to_string(),
        input_schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: None,
        },
    }
}
