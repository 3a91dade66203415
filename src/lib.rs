// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Strava MCP Server
//!
//! A Model Context Protocol (MCP) server that bridges the Strava API
//! to AI assistants. The server keeps an OAuth credential valid
//! without user intervention, respects Strava's request quotas, and
//! derives training-load metrics from raw activity records.
//!
//! ## Architecture
//!
//! - **Token**: credential lifecycle with lazy, single-flight refresh
//! - **Rate limit**: rolling 15-minute and daily request windows
//! - **Gateway**: the single choke-point for upstream HTTP calls
//! - **Intelligence**: pure analysis of activities and training load
//! - **MCP**: thin protocol adapter exposing the core as tools
//!
//! ## Quick Start
//!
//! 1. Run the `auth-setup` binary once to authorize with Strava
//! 2. Start the server with `strava-mcp-server`
//! 3. Connect from Claude or another MCP client

/// Wire-level activity data models
pub mod models;

/// Tagged error taxonomy shared by the core components
pub mod errors;

/// Injectable clock capability
pub mod clock;

/// Credential record, stores and the token lifecycle manager
pub mod token;

/// Rolling-window request rate limiting
pub mod rate_limit;

/// Authenticated, quota-aware gateway to the Strava API
pub mod gateway;

/// Activity analysis and training-load intelligence
pub mod intelligence;

/// Model Context Protocol server implementation
pub mod mcp;

/// Environment-based configuration
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Production logging and structured output
pub mod logging;
