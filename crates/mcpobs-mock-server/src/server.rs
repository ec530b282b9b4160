// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory capability registry: tools, resources, resource templates and
//! prompts.

use crate::error::{Result, ServerError};
use crate::template::UriTemplate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Named arguments passed to tools and prompts.
pub type Arguments = serde_json::Map<String, Value>;

/// Placeholder values bound by a resource template.
pub type TemplateParams = BTreeMap<String, String>;

type ToolFn = Arc<dyn Fn(&Arguments) -> Result<Content> + Send + Sync>;
type ResourceFn = Arc<dyn Fn() -> Result<Content> + Send + Sync>;
type TemplateFn = Arc<dyn Fn(&TemplateParams) -> Result<Content> + Send + Sync>;
type PromptFn = Arc<dyn Fn(&Arguments) -> Result<Vec<PromptMessage>> + Send + Sync>;

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// Value produced by a tool or resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// Encoded image bytes.
    Image {
        /// Encoded bytes.
        data: Vec<u8>,
        /// MIME type of `data`.
        mime_type: String,
    },
    /// Structured JSON.
    Json {
        /// The value.
        value: Value,
    },
}

impl Content {
    /// Text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// The text, if this is text content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// The JSON value, if this is JSON content.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json { value } => Some(value),
            _ => None,
        }
    }
}

/// Author of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// End user.
    User,
    /// Model.
    Assistant,
}

/// One message of a rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Message author.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl PromptMessage {
    /// A user-authored message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Advertised metadata for a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Arguments that must be supplied on every call.
    #[serde(default)]
    pub required: Vec<String>,
}

impl ToolInfo {
    /// Tool with no required arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a required argument.
    #[must_use]
    pub fn with_required(mut self, argument: impl Into<String>) -> Self {
        self.required.push(argument.into());
        self
    }
}

/// Advertised metadata for a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptInfo {
    /// Prompt name.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Arguments that must be supplied on every render.
    #[serde(default)]
    pub required: Vec<String>,
}

impl PromptInfo {
    /// Prompt with no required arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a required argument.
    #[must_use]
    pub fn with_required(mut self, argument: impl Into<String>) -> Self {
        self.required.push(argument.into());
        self
    }
}

/// Advertised metadata for a static resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    /// Fixed URI.
    pub uri: String,
    /// Name of the producing handler.
    pub name: String,
}

/// Advertised metadata for a resource template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTemplateInfo {
    /// Template with `{name}` placeholders.
    pub uri_template: String,
    /// Name of the producing handler.
    pub name: String,
}

struct Tool {
    info: ToolInfo,
    handler: ToolFn,
}

struct StaticResource {
    info: ResourceInfo,
    handler: ResourceFn,
}

struct TemplateResource {
    name: String,
    template: UriTemplate,
    handler: TemplateFn,
}

struct Prompt {
    info: PromptInfo,
    handler: PromptFn,
}

fn check_required(required: &[String], args: &Arguments) -> Result<()> {
    match required.iter().find(|a| !args.contains_key(a.as_str())) {
        Some(missing) => Err(ServerError::MissingArgument {
            argument: missing.clone(),
        }),
        None => Ok(()),
    }
}

/// Read a string argument.
pub fn str_arg<'a>(args: &'a Arguments, name: &str) -> Result<&'a str> {
    let value = args.get(name).ok_or_else(|| ServerError::MissingArgument {
        argument: name.to_string(),
    })?;
    value.as_str().ok_or_else(|| ServerError::InvalidArgument {
        argument: name.to_string(),
        reason: format!("expected a string, got {value}"),
    })
}

// ---------------------------------------------------------------------------
// McpServer
// ---------------------------------------------------------------------------

/// A disposable, in-process capability server.
///
/// Every handler runs synchronously on the calling thread. Registering a
/// capability under an existing name or URI replaces the previous entry.
pub struct McpServer {
    name: String,
    tools: BTreeMap<String, Tool>,
    resources: BTreeMap<String, StaticResource>,
    templates: Vec<TemplateResource>,
    prompts: BTreeMap<String, Prompt>,
}

impl fmt::Debug for McpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpServer")
            .field("name", &self.name)
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field(
                "templates",
                &self
                    .templates
                    .iter()
                    .map(|t| t.template.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("prompts", &self.prompts.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl McpServer {
    /// Create a server with nothing registered.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: BTreeMap::new(),
            resources: BTreeMap::new(),
            templates: Vec::new(),
            prompts: BTreeMap::new(),
        }
    }

    /// Server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // -- registration -------------------------------------------------------

    /// Register a tool.
    pub fn add_tool<F>(&mut self, info: ToolInfo, handler: F) -> &mut Self
    where
        F: Fn(&Arguments) -> Result<Content> + Send + Sync + 'static,
    {
        debug!(server = %self.name, tool = %info.name, "registered tool");
        self.tools.insert(
            info.name.clone(),
            Tool {
                info,
                handler: Arc::new(handler),
            },
        );
        self
    }

    /// Register a resource served at a fixed URI.
    pub fn add_resource<F>(
        &mut self,
        uri: impl Into<String>,
        name: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn() -> Result<Content> + Send + Sync + 'static,
    {
        let info = ResourceInfo {
            uri: uri.into(),
            name: name.into(),
        };
        debug!(server = %self.name, uri = %info.uri, "registered resource");
        self.resources.insert(
            info.uri.clone(),
            StaticResource {
                info,
                handler: Arc::new(handler),
            },
        );
        self
    }

    /// Register a resource whose URI contains `{name}` placeholders.
    pub fn add_resource_template<F>(
        &mut self,
        uri_template: &str,
        name: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self>
    where
        F: Fn(&TemplateParams) -> Result<Content> + Send + Sync + 'static,
    {
        let template = UriTemplate::parse(uri_template)?;
        debug!(server = %self.name, template = %template, "registered resource template");
        self.templates
            .retain(|t| t.template.as_str() != template.as_str());
        self.templates.push(TemplateResource {
            name: name.into(),
            template,
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    /// Register a prompt.
    pub fn add_prompt<F>(&mut self, info: PromptInfo, handler: F) -> &mut Self
    where
        F: Fn(&Arguments) -> Result<Vec<PromptMessage>> + Send + Sync + 'static,
    {
        debug!(server = %self.name, prompt = %info.name, "registered prompt");
        self.prompts.insert(
            info.name.clone(),
            Prompt {
                info,
                handler: Arc::new(handler),
            },
        );
        self
    }

    // -- invocation ---------------------------------------------------------

    /// Invoke a tool.
    pub fn call_tool(&self, name: &str, args: &Arguments) -> Result<Content> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ServerError::UnknownTool {
                name: name.to_string(),
            })?;
        check_required(&tool.info.required, args)?;
        (tool.handler)(args)
    }

    /// Read a resource, trying fixed URIs before templates.
    pub fn read_resource(&self, uri: &str) -> Result<Content> {
        if let Some(resource) = self.resources.get(uri) {
            return (resource.handler)();
        }
        for entry in &self.templates {
            if let Some(params) = entry.template.match_uri(uri) {
                return (entry.handler)(&params);
            }
        }
        Err(ServerError::UnknownResource {
            uri: uri.to_string(),
        })
    }

    /// Render a prompt.
    pub fn get_prompt(&self, name: &str, args: &Arguments) -> Result<Vec<PromptMessage>> {
        let prompt = self
            .prompts
            .get(name)
            .ok_or_else(|| ServerError::UnknownPrompt {
                name: name.to_string(),
            })?;
        check_required(&prompt.info.required, args)?;
        (prompt.handler)(args)
    }

    // -- discovery ----------------------------------------------------------

    /// Registered tools, sorted by name.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools.values().map(|t| t.info.clone()).collect()
    }

    /// Registered static resources, sorted by URI.
    pub fn list_resources(&self) -> Vec<ResourceInfo> {
        self.resources.values().map(|r| r.info.clone()).collect()
    }

    /// Registered resource templates, in registration order.
    pub fn list_resource_templates(&self) -> Vec<ResourceTemplateInfo> {
        self.templates
            .iter()
            .map(|t| ResourceTemplateInfo {
                uri_template: t.template.as_str().to_string(),
                name: t.name.clone(),
            })
            .collect()
    }

    /// Registered prompts, sorted by name.
    pub fn list_prompts(&self) -> Vec<PromptInfo> {
        self.prompts.values().map(|p| p.info.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
