pub mod component;
pub mod loader;

pub use component::{Container, MemoryContainer, RunnerComponent};
pub use loader::{LoadedProviders, ModuleCatalog, ProviderLoader, ProviderModule};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{RunnerConfig, RunnerOptions};
use crate::error::{Result, RunnerError};
use crate::providers::ElementId;

pub const REQUIRED_PROPERTIES: [&str; 3] = ["providers", "options", "serviceCallId"];

/// Where a provider comes from: its registration name and the module to load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub bundle: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl ProviderDescriptor {
    pub fn new(id: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            module: Some(module.into()),
            ..Default::default()
        }
    }

    /// `id`, falling back to `name`.
    pub fn identifier(&self) -> Option<&str> {
        self.id.as_deref().or(self.name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderSelection {
    Many(Vec<ProviderDescriptor>),
    One(ProviderDescriptor),
}

impl ProviderSelection {
    pub fn descriptors(&self) -> Vec<&ProviderDescriptor> {
        match self {
            ProviderSelection::Many(list) => list.iter().collect(),
            ProviderSelection::One(descriptor) => vec![descriptor],
        }
    }

    pub fn primary(&self) -> Option<&ProviderDescriptor> {
        match self {
            ProviderSelection::Many(list) => list.first(),
            ProviderSelection::One(descriptor) => Some(descriptor),
        }
    }
}

/// Configuration of a mounted runner session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    pub service_call_id: String,
    pub providers: BTreeMap<String, ProviderSelection>,
    pub options: RunnerOptions,
    /// Explicit provider choice per kind, wins over `providers`.
    #[serde(default)]
    pub provider: BTreeMap<String, String>,
    #[serde(default)]
    pub load_from_bundle: bool,
    #[serde(default)]
    pub test_definition: Option<String>,
    #[serde(default)]
    pub test_compilation: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub fn validate_configuration(config: &Value) -> Result<()> {
    let object = config.as_object().ok_or_else(|| {
        RunnerError::configuration(format!(
            "The runner configuration must be an object, '{}' received",
            json_type(config)
        ))
    })?;

    if REQUIRED_PROPERTIES.iter().any(|property| !object.contains_key(*property)) {
        return Err(RunnerError::configuration(format!(
            "The runner configuration must contains at least the following properties : {}",
            REQUIRED_PROPERTIES.join(",")
        )));
    }
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Provider name selected for `kind`: the explicit `provider` entry, else the
/// identifier of the single or first descriptor listed under `providers`.
pub fn selected_provider(kind: &str, config: &HostConfig) -> Option<String> {
    if let Some(name) = config.provider.get(kind).filter(|name| !name.is_empty()) {
        return Some(name.clone());
    }
    config
        .providers
        .get(kind)
        .and_then(ProviderSelection::primary)
        .and_then(ProviderDescriptor::identifier)
        .map(str::to_string)
}

impl HostConfig {
    pub fn from_value(value: Value) -> Result<Self> {
        validate_configuration(&value)?;
        serde_json::from_value(value)
            .map_err(|e| RunnerError::configuration(format!("Invalid runner configuration: {}", e)))
    }

    /// Loads a JSON, TOML or YAML file, picked by extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RunnerError::configuration(format!("Unable to read {}: {}", path.display(), e))
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let value: Value = match extension.as_str() {
            "json" => serde_json::from_str(&content).map_err(|e| e.to_string()),
            "toml" => toml::from_str::<toml::Value>(&content)
                .map_err(|e| e.to_string())
                .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
            other => Err(format!("unsupported format '{}'", other)),
        }
        .map_err(|e| {
            RunnerError::configuration(format!("Unable to parse {}: {}", path.display(), e))
        })?;

        Self::from_value(value)
    }

    pub fn selected_provider(&self, kind: &str) -> Option<String> {
        selected_provider(kind, self)
    }

    /// Runner configuration for a session rendered into `render_to`. Every
    /// provider kind but `plugins` gets its selected provider.
    pub fn runner_config(&self, render_to: ElementId) -> RunnerConfig {
        let mut provider = self.provider.clone();
        for kind in self.providers.keys().filter(|kind| kind.as_str() != "plugins") {
            if provider.contains_key(kind) {
                continue;
            }
            if let Some(name) = self.selected_provider(kind) {
                provider.insert(kind.clone(), name);
            }
        }

        let mut extra = self.extra.clone();
        extra.insert("loadFromBundle".to_string(), Value::Bool(self.load_from_bundle));

        RunnerConfig {
            service_call_id: Some(self.service_call_id.clone()),
            test_definition: self.test_definition.clone(),
            test_compilation: self.test_compilation.clone(),
            provider,
            options: self.options.clone(),
            render_to: Some(render_to),
            extra,
        }
    }
}
