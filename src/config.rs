use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{Result, RunnerError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerOptions {
    #[serde(default)]
    pub plugins: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Configuration snapshot handed to a runner. It is never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerConfig {
    #[serde(default)]
    pub service_call_id: Option<String>,
    #[serde(default)]
    pub test_definition: Option<String>,
    #[serde(default)]
    pub test_compilation: Option<String>,
    /// Selected provider name per provider type (runner, proxy, communicator, ...).
    #[serde(default)]
    pub provider: BTreeMap<String, String>,
    #[serde(default)]
    pub options: RunnerOptions,
    /// Element the runner renders into.
    #[serde(default)]
    pub render_to: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| RunnerError::configuration(format!("Invalid runner configuration: {}", e)))
    }

    pub fn with_service_call_id(mut self, service_call_id: impl Into<String>) -> Self {
        self.service_call_id = Some(service_call_id.into());
        self
    }

    pub fn with_plugin_config(mut self, plugin: impl Into<String>, config: Value) -> Self {
        self.options.plugins.insert(plugin.into(), config);
        self
    }

    pub fn selected_provider(&self, kind: &str) -> Option<&str> {
        self.provider.get(kind).map(String::as_str)
    }
}
