use std::sync::Arc;

use crate::config::RunnerConfig;
use crate::engine::Runner;
use crate::error::Result;
use crate::plugins::PluginFactory;
use crate::providers::{validate_runner_provider, ProviderRegistry, RunnerProvider};

pub const RUNNER_PROVIDER_KIND: &str = "runner";

/// Owns the runner provider registry and builds runners out of it.
#[derive(Clone)]
pub struct RunnerFactory {
    registry: Arc<ProviderRegistry<RunnerProvider>>,
}

impl RunnerFactory {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(ProviderRegistry::with_validator(
            RUNNER_PROVIDER_KIND,
            validate_runner_provider,
        )))
    }

    pub fn with_registry(registry: Arc<ProviderRegistry<RunnerProvider>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> Arc<ProviderRegistry<RunnerProvider>> {
        self.registry.clone()
    }

    pub fn register_provider(&self, name: impl Into<String>, provider: RunnerProvider) -> Result<()> {
        self.registry.register(name, provider)
    }

    pub fn get_provider(&self, name: &str) -> Result<Arc<RunnerProvider>> {
        self.registry.get(name)
    }

    pub fn clear_providers(&self) {
        self.registry.clear();
    }

    /// Resolves the provider and builds a runner. Nothing runs before `init()`.
    pub fn create(
        &self,
        provider_name: &str,
        plugins: Vec<PluginFactory>,
        config: RunnerConfig,
    ) -> Result<Runner> {
        let provider = self.registry.get(provider_name)?;
        Runner::new(provider_name, provider, plugins, config)
    }
}

impl Default for RunnerFactory {
    fn default() -> Self {
        Self::new()
    }
}
