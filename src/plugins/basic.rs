use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use super::{Plugin, PluginFactory};
use crate::engine::{Runner, WeakRunner};
use crate::error::RunnerError;
use crate::providers::AreaBroker;
use crate::types::Stage;

pub type PluginHook = Arc<dyn Fn(PluginContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// What a plugin hook can reach: its host runner, the area broker and its own config.
#[derive(Clone)]
pub struct PluginContext {
    name: String,
    runner: WeakRunner,
    area_broker: Arc<dyn AreaBroker>,
}

impl PluginContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn runner(&self) -> Option<Runner> {
        self.runner.upgrade()
    }

    pub fn area_broker(&self) -> Arc<dyn AreaBroker> {
        self.area_broker.clone()
    }

    pub fn config(&self) -> Value {
        self.runner()
            .map(|runner| runner.plugin_config(&self.name))
            .unwrap_or_else(|| Value::Object(Default::default()))
    }
}

#[derive(Clone)]
pub struct PluginDefinition {
    name: String,
    hooks: HashMap<Stage, PluginHook>,
}

impl PluginDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hooks: HashMap::new(),
        }
    }

    pub fn hook<F, Fut>(mut self, stage: Stage, hook: F) -> Self
    where
        F: Fn(PluginContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let hook: PluginHook = Arc::new(move |context: PluginContext| hook(context).boxed());
        self.hooks.insert(stage, hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factory(self) -> PluginFactory {
        let definition = Arc::new(self);
        Arc::new(move |runner: &Runner, area_broker: Arc<dyn AreaBroker>| {
            let plugin: Arc<dyn Plugin> = Arc::new(BasicPlugin::new(definition.clone(), runner, area_broker));
            plugin
        })
    }
}

/// Plugin driven by a [`PluginDefinition`]. Once a stage completes, the plugin
/// flags it in its own states and triggers `plugin-<stage>.<name>` on the runner.
pub struct BasicPlugin {
    definition: Arc<PluginDefinition>,
    context: PluginContext,
    states: Mutex<HashMap<String, bool>>,
}

impl BasicPlugin {
    pub fn new(definition: Arc<PluginDefinition>, runner: &Runner, area_broker: Arc<dyn AreaBroker>) -> Self {
        let context = PluginContext {
            name: definition.name.clone(),
            runner: runner.downgrade(),
            area_broker,
        };
        Self {
            definition,
            context,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    async fn run(&self, stage: Stage) -> Result<()> {
        if let Some(hook) = self.definition.hooks.get(&stage).cloned() {
            hook(self.context.clone()).await?;
        }
        self.set_state(stage.as_str(), true)?;

        if let Some(runner) = self.context.runner() {
            let event = format!("plugin-{}.{}", stage.as_str(), self.definition.name);
            runner
                .trigger(&event, vec![Value::String(self.definition.name.clone())])
                .await;
        }
        Ok(())
    }
}

#[async_trait]
impl Plugin for BasicPlugin {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn get_state(&self, name: &str) -> bool {
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.get(name).copied().unwrap_or(false)
    }

    fn set_state(&self, name: &str, active: bool) -> std::result::Result<(), RunnerError> {
        if name.is_empty() {
            return Err(RunnerError::validation("The state must have a name"));
        }
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.insert(name.to_string(), active);
        Ok(())
    }

    async fn install(&self) -> Result<()> {
        self.run(Stage::Install).await
    }

    async fn init(&self) -> Result<()> {
        self.run(Stage::Init).await
    }

    async fn render(&self) -> Result<()> {
        self.run(Stage::Render).await
    }

    async fn finish(&self) -> Result<()> {
        self.run(Stage::Finish).await
    }

    async fn flush(&self) -> Result<()> {
        self.run(Stage::Flush).await
    }

    async fn destroy(&self) -> Result<()> {
        self.run(Stage::Destroy).await
    }
}
