// SPDX-License-Identifier: MIT OR Apache-2.0
//! Harness configuration.

use crate::error::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Service identity stamped on every provider the harness assembles.
pub const DEFAULT_SERVICE_NAME: &str = "mcp";

/// Instrumentation scope used by [`TelemetryHarness::tracer`](crate::TelemetryHarness::tracer).
pub const DEFAULT_TRACER_SCOPE: &str = "mcpobs-harness";

const SERVICE_NAME_KEY: &str = "service.name";

// ---------------------------------------------------------------------------
// HarnessConfig
// ---------------------------------------------------------------------------

/// Settings used when assembling per-test providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Value of the `service.name` resource attribute.
    pub service_name: String,
    /// Extra resource attributes (deterministic ordering).
    pub resource_attributes: BTreeMap<String, String>,
    /// Scope name for tracers handed out by the harness.
    pub tracer_scope: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            resource_attributes: BTreeMap::new(),
            tracer_scope: DEFAULT_TRACER_SCOPE.to_string(),
        }
    }
}

impl HarnessConfig {
    /// Parse a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| HarnessError::ConfigParse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Override the service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Add an extra resource attribute.
    #[must_use]
    pub fn with_resource_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.resource_attributes.insert(key.into(), value.into());
        self
    }

    /// Check the configuration for semantic problems.
    pub fn validate(&self) -> Result<()> {
        let mut reasons = Vec::new();
        if self.service_name.trim().is_empty() {
            reasons.push("service_name must not be empty".to_string());
        }
        if self.tracer_scope.trim().is_empty() {
            reasons.push("tracer_scope must not be empty".to_string());
        }
        for key in self.resource_attributes.keys() {
            if key.trim().is_empty() {
                reasons.push("resource attribute keys must not be empty".to_string());
            } else if key == SERVICE_NAME_KEY {
                reasons.push(format!("'{SERVICE_NAME_KEY}' is set through service_name"));
            }
        }
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::ConfigInvalid { reasons })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
