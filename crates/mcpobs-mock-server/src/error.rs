// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors returned by the mock server.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Failures when invoking a capability on an [`McpServer`](crate::McpServer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    /// No tool is registered under this name.
    #[error("unknown tool: {name}")]
    UnknownTool {
        /// Requested tool name.
        name: String,
    },

    /// Neither a static resource nor a template matches this URI.
    #[error("unknown resource: {uri}")]
    UnknownResource {
        /// Requested URI.
        uri: String,
    },

    /// No prompt is registered under this name.
    #[error("unknown prompt: {name}")]
    UnknownPrompt {
        /// Requested prompt name.
        name: String,
    },

    /// A required argument was not supplied.
    #[error("missing argument '{argument}'")]
    MissingArgument {
        /// Argument name.
        argument: String,
    },

    /// An argument was supplied with the wrong shape.
    #[error("invalid argument '{argument}': {reason}")]
    InvalidArgument {
        /// Argument name.
        argument: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A resource template could not be parsed.
    #[error("invalid resource template '{template}': {reason}")]
    InvalidTemplate {
        /// The offending template.
        template: String,
        /// Parser detail.
        reason: String,
    },

    /// Encoding image content failed.
    #[error("failed to encode image: {reason}")]
    ImageEncoding {
        /// Encoder detail.
        reason: String,
    },
}

impl ServerError {
    /// Stable, low-cardinality identifier suitable for an `error.type`
    /// attribute.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownTool { .. } => "unknown_tool",
            Self::UnknownResource { .. } => "unknown_resource",
            Self::UnknownPrompt { .. } => "unknown_prompt",
            Self::MissingArgument { .. } => "missing_argument",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::InvalidTemplate { .. } => "invalid_template",
            Self::ImageEncoding { .. } => "image_encoding",
        }
    }
}
