//! Experian Credit Score Tool Host Library
//!
//! This library exposes an Experian credit-profile lookup as a tool that a
//! language-model agent can call over JSON-RPC (stdio or HTTP), together with
//! the client side used to drive a loan risk assessment.
//!
//! # Modules
//!
//! - `assessment`: Loan risk assessment flow for the client shell.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `experian_client`: Experian OAuth token and Credit Profile client.
//! - `handlers`: HTTP request handlers.
//! - `llm`: OpenAI-compatible chat-completion client.
//! - `mcp_client`: Tool-host client over HTTP or a spawned stdio server.
//! - `mcp_server`: JSON-RPC dispatcher.
//! - `models`: Tool result models.
//! - `prompts`: Prompt templates.
//! - `redaction`: SSN masking for logs.
//! - `reducer`: Credit report reduction.
//! - `report_request`: Credit report request body.
//! - `rpc`: JSON-RPC 2.0 wire types.
//! - `services`: Report sources (live Experian or saved fixture).
//! - `session`: Experian access token lifecycle.
//! - `tools`: Tool trait and the `credit_score` tool.
//! - `transport`: stdio and streamable-http transports.

pub mod assessment;
pub mod config;
pub mod errors;
pub mod experian_client;
pub mod handlers;
pub mod llm;
pub mod mcp_client;
pub mod mcp_server;
pub mod models;
pub mod prompts;
pub mod redaction;
pub mod reducer;
pub mod report_request;
pub mod rpc;
pub mod services;
pub mod session;
pub mod tools;
pub mod transport;
