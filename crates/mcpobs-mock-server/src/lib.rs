// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! mcpobs-mock-server
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Disposable in-process MCP capability server.
//!
//! [`create_server`] builds an [`McpServer`] pre-populated with one tool of
//! each flavor (`greet`, `get_image`), a fixed resource (`config://version`),
//! a resource template (`users://{user_id}/profile`) and a prompt
//! (`summarize_request`). Invoke it through [`TracedClient`] to produce spans
//! and metrics on whatever providers are installed globally.

/// Server errors.
pub mod error;
/// Standard test server.
pub mod factory;
/// Capability registry.
pub mod server;
/// URI templates.
pub mod template;
/// Telemetry-producing client.
pub mod traced;

pub use error::{Result, ServerError};
pub use factory::{DEFAULT_SERVER_NAME, SERVER_VERSION, create_default_server, create_server};
pub use server::{
    Arguments, Content, McpServer, PromptInfo, PromptMessage, ResourceInfo, ResourceTemplateInfo,
    Role, TemplateParams, ToolInfo, str_arg,
};
pub use template::UriTemplate;
pub use traced::{Method, TracedClient};
