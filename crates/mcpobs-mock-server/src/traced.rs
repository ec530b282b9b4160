// SPDX-License-Identifier: MIT OR Apache-2.0
//! A client that invokes server capabilities and records telemetry through
//! the global OpenTelemetry providers.
//!
//! Every call produces a `Client` span and a child `Internal` span named
//! after its target: the tool name, the requested resource URI, or the
//! prompt name. Durations go to the `mcp.client.operation.duration`
//! histogram and calls are counted in `mcp.client.operation.count`.

use crate::error::Result;
use crate::server::{Arguments, Content, McpServer, PromptMessage};
use opentelemetry::trace::{Span as _, SpanKind, Status, TraceContextExt as _, Tracer as _};
use opentelemetry::{Context, KeyValue, global};
use std::time::Instant;
use tracing::debug;

/// Instrumentation scope used for spans and metrics.
pub const INSTRUMENTATION_SCOPE: &str = "mcpobs-mock-server";

/// Attribute naming the protocol method.
pub const METHOD_NAME: &str = "mcp.method.name";
/// Attribute naming the invoked tool.
pub const TOOL_NAME: &str = "mcp.tool.name";
/// Attribute carrying the requested resource URI.
pub const RESOURCE_URI: &str = "mcp.resource.uri";
/// Attribute naming the rendered prompt.
pub const PROMPT_NAME: &str = "mcp.prompt.name";
/// Attribute naming the serving server.
pub const SERVER_NAME: &str = "mcp.server.name";
/// Attribute set on failed calls.
pub const ERROR_TYPE: &str = "error.type";

/// Histogram of call durations in seconds.
pub const OPERATION_DURATION: &str = "mcp.client.operation.duration";
/// Counter of calls.
pub const OPERATION_COUNT: &str = "mcp.client.operation.count";

/// Protocol method of a traced call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `tools/call`
    CallTool,
    /// `resources/read`
    ReadResource,
    /// `prompts/get`
    GetPrompt,
}

impl Method {
    /// Wire name of the method.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CallTool => "tools/call",
            Self::ReadResource => "resources/read",
            Self::GetPrompt => "prompts/get",
        }
    }

    fn target_key(self) -> &'static str {
        match self {
            Self::CallTool => TOOL_NAME,
            Self::ReadResource => RESOURCE_URI,
            Self::GetPrompt => PROMPT_NAME,
        }
    }
}

/// Calls into an [`McpServer`] with tracing and metrics.
#[derive(Debug, Clone, Copy)]
pub struct TracedClient<'a> {
    server: &'a McpServer,
}

impl<'a> TracedClient<'a> {
    /// Wrap `server`.
    pub fn new(server: &'a McpServer) -> Self {
        Self { server }
    }

    /// The wrapped server.
    pub fn server(&self) -> &'a McpServer {
        self.server
    }

    /// Invoke a tool.
    pub fn call_tool(&self, name: &str, args: &Arguments) -> Result<Content> {
        self.traced(Method::CallTool, name, |s| s.call_tool(name, args))
    }

    /// Read a resource.
    pub fn read_resource(&self, uri: &str) -> Result<Content> {
        self.traced(Method::ReadResource, uri, |s| s.read_resource(uri))
    }

    /// Render a prompt.
    pub fn get_prompt(&self, name: &str, args: &Arguments) -> Result<Vec<PromptMessage>> {
        self.traced(Method::GetPrompt, name, |s| s.get_prompt(name, args))
    }

    fn traced<T>(
        &self,
        method: Method,
        target: &str,
        call: impl FnOnce(&McpServer) -> Result<T>,
    ) -> Result<T> {
        let tracer = global::tracer(INSTRUMENTATION_SCOPE);
        let attributes = vec![
            KeyValue::new(METHOD_NAME, method.as_str()),
            KeyValue::new(method.target_key(), target.to_string()),
            KeyValue::new(SERVER_NAME, self.server.name().to_string()),
        ];

        let client_span = tracer
            .span_builder(target.to_string())
            .with_kind(SpanKind::Client)
            .with_attributes(attributes.clone())
            .start(&tracer);
        let cx = Context::current_with_span(client_span);
        let mut handler_span = tracer
            .span_builder(target.to_string())
            .with_kind(SpanKind::Internal)
            .with_attributes(attributes)
            .start_with_context(&tracer, &cx);

        let started = Instant::now();
        let result = call(self.server);
        let elapsed = started.elapsed().as_secs_f64();

        let mut metric_attributes = vec![KeyValue::new(METHOD_NAME, method.as_str())];
        if let Err(err) = &result {
            debug!(method = method.as_str(), call_target = target, error = %err, "traced call failed");
            let error_type = KeyValue::new(ERROR_TYPE, err.code());
            handler_span.set_attribute(error_type.clone());
            handler_span.set_status(Status::error(err.to_string()));
            cx.span().set_attribute(error_type.clone());
            cx.span().set_status(Status::error(err.to_string()));
            metric_attributes.push(error_type);
        } else {
            handler_span.set_status(Status::Ok);
            cx.span().set_status(Status::Ok);
        }
        handler_span.end();
        cx.span().end();

        let meter = global::meter(INSTRUMENTATION_SCOPE);
        meter
            .f64_histogram(OPERATION_DURATION)
            .with_unit("s")
            .with_description("Duration of MCP client operations.")
            .build()
            .record(elapsed, &metric_attributes);
        meter
            .u64_counter(OPERATION_COUNT)
            .with_description("Number of MCP client operations.")
            .build()
            .add(1, &metric_attributes);

        result
    }
}
