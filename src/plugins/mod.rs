pub mod basic;

pub use basic::{BasicPlugin, PluginContext, PluginDefinition};

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::engine::Runner;
use crate::error::RunnerError;
use crate::providers::AreaBroker;
use crate::types::Stage;

/// A runner extension. Lifecycle hooks default to no-ops.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn get_state(&self, name: &str) -> bool;

    fn set_state(&self, name: &str, active: bool) -> std::result::Result<(), RunnerError>;

    async fn install(&self) -> Result<()> {
        Ok(())
    }

    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn render(&self) -> Result<()> {
        Ok(())
    }

    async fn finish(&self) -> Result<()> {
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        Ok(())
    }
}

pub type PluginFactory = Arc<dyn Fn(&Runner, Arc<dyn AreaBroker>) -> Arc<dyn Plugin> + Send + Sync>;

pub fn plugin_factory<F>(factory: F) -> PluginFactory
where
    F: Fn(&Runner, Arc<dyn AreaBroker>) -> Arc<dyn Plugin> + Send + Sync + 'static,
{
    Arc::new(factory)
}

pub async fn run_plugin_stage(plugin: Arc<dyn Plugin>, stage: Stage) -> Result<()> {
    match stage {
        Stage::Install => plugin.install().await,
        Stage::Init => plugin.init().await,
        Stage::Render => plugin.render().await,
        Stage::Finish => plugin.finish().await,
        Stage::Flush => plugin.flush().await,
        Stage::Destroy => plugin.destroy().await,
        // provider only
        Stage::LoadPersistentStates => Ok(()),
    }
}

/// Plugins indexed by name, in registration order. A name collision replaces
/// the earlier plugin in place.
#[derive(Clone, Default)]
pub struct PluginSet {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, plugin: Arc<dyn Plugin>) {
        match self.plugins.iter().position(|p| p.name() == plugin.name()) {
            Some(index) => self.plugins[index] = plugin,
            None => self.plugins.push(plugin),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.name() == name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    pub fn all(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins.clone()
    }
}
