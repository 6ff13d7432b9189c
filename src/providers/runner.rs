use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use super::collaborators::{AreaBroker, ProbeOverseer, Proxy, TestStore};
use super::data_holder::DataHolder;
use crate::engine::Runner;
use crate::types::{Action, ItemStage, Stage};

pub type StageHook = Arc<dyn Fn(Runner) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
pub type ItemHook =
    Arc<dyn Fn(Runner, String, Value) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;
pub type ActionHook =
    Arc<dyn Fn(Runner, Vec<Value>) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;
pub type PersistentStateReader = Arc<dyn Fn(&Runner, &str) -> bool + Send + Sync>;
pub type PersistentStateWriter =
    Arc<dyn Fn(Runner, String, bool) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
pub type Loader<T> = Arc<dyn Fn(&Runner) -> Arc<T> + Send + Sync>;

pub const MISSING_AREA_BROKER: &str = "The runner provider MUST have a method that returns an areaBroker";

/// A runner provider: a bundle of optional hooks. Anything left unset is a no-op
/// for the runner, except `load_area_broker` which registration requires.
#[derive(Clone, Default)]
pub struct RunnerProvider {
    stages: HashMap<Stage, StageHook>,
    items: HashMap<ItemStage, ItemHook>,
    actions: HashMap<Action, ActionHook>,
    persistent_state_reader: Option<PersistentStateReader>,
    persistent_state_writer: Option<PersistentStateWriter>,
    area_broker: Option<Loader<dyn AreaBroker>>,
    proxy: Option<Loader<dyn Proxy>>,
    probe_overseer: Option<Loader<dyn ProbeOverseer>>,
    test_store: Option<Loader<dyn TestStore>>,
    data_holder: Option<Loader<dyn DataHolder>>,
}

impl RunnerProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage<F, Fut>(mut self, stage: Stage, hook: F) -> Self
    where
        F: Fn(Runner) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let hook: StageHook = Arc::new(move |runner: Runner| hook(runner).boxed());
        self.stages.insert(stage, hook);
        self
    }

    /// `load_item` resolves to the item data; the other item hooks' values are ignored.
    pub fn item<F, Fut>(mut self, stage: ItemStage, hook: F) -> Self
    where
        F: Fn(Runner, String, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let hook: ItemHook =
            Arc::new(move |runner: Runner, item_ref: String, data: Value| hook(runner, item_ref, data).boxed());
        self.items.insert(stage, hook);
        self
    }

    pub fn action<F, Fut>(mut self, action: Action, hook: F) -> Self
    where
        F: Fn(Runner, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let hook: ActionHook = Arc::new(move |runner: Runner, args: Vec<Value>| hook(runner, args).boxed());
        self.actions.insert(action, hook);
        self
    }

    pub fn persistent_state_getter<R>(mut self, reader: R) -> Self
    where
        R: Fn(&Runner, &str) -> bool + Send + Sync + 'static,
    {
        self.persistent_state_reader = Some(Arc::new(reader));
        self
    }

    pub fn persistent_state_setter<W, Fut>(mut self, writer: W) -> Self
    where
        W: Fn(Runner, String, bool) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let writer: PersistentStateWriter =
            Arc::new(move |runner: Runner, name: String, active: bool| writer(runner, name, active).boxed());
        self.persistent_state_writer = Some(writer);
        self
    }

    pub fn area_broker<F>(mut self, loader: F) -> Self
    where
        F: Fn(&Runner) -> Arc<dyn AreaBroker> + Send + Sync + 'static,
    {
        self.area_broker = Some(Arc::new(loader));
        self
    }

    pub fn proxy<F>(mut self, loader: F) -> Self
    where
        F: Fn(&Runner) -> Arc<dyn Proxy> + Send + Sync + 'static,
    {
        self.proxy = Some(Arc::new(loader));
        self
    }

    pub fn probe_overseer<F>(mut self, loader: F) -> Self
    where
        F: Fn(&Runner) -> Arc<dyn ProbeOverseer> + Send + Sync + 'static,
    {
        self.probe_overseer = Some(Arc::new(loader));
        self
    }

    pub fn test_store<F>(mut self, loader: F) -> Self
    where
        F: Fn(&Runner) -> Arc<dyn TestStore> + Send + Sync + 'static,
    {
        self.test_store = Some(Arc::new(loader));
        self
    }

    pub fn data_holder<F>(mut self, loader: F) -> Self
    where
        F: Fn(&Runner) -> Arc<dyn DataHolder> + Send + Sync + 'static,
    {
        self.data_holder = Some(Arc::new(loader));
        self
    }

    pub fn stage_hook(&self, stage: Stage) -> Option<StageHook> {
        self.stages.get(&stage).cloned()
    }

    pub fn item_hook(&self, stage: ItemStage) -> Option<ItemHook> {
        self.items.get(&stage).cloned()
    }

    pub fn action_hook(&self, action: Action) -> Option<ActionHook> {
        self.actions.get(&action).cloned()
    }

    pub fn has_action(&self, action: Action) -> bool {
        self.actions.contains_key(&action)
    }

    pub fn persistent_state_reader(&self) -> Option<PersistentStateReader> {
        self.persistent_state_reader.clone()
    }

    pub fn persistent_state_writer(&self) -> Option<PersistentStateWriter> {
        self.persistent_state_writer.clone()
    }

    pub fn area_broker_loader(&self) -> Option<Loader<dyn AreaBroker>> {
        self.area_broker.clone()
    }

    pub fn proxy_loader(&self) -> Option<Loader<dyn Proxy>> {
        self.proxy.clone()
    }

    pub fn probe_overseer_loader(&self) -> Option<Loader<dyn ProbeOverseer>> {
        self.probe_overseer.clone()
    }

    pub fn test_store_loader(&self) -> Option<Loader<dyn TestStore>> {
        self.test_store.clone()
    }

    pub fn data_holder_loader(&self) -> Option<Loader<dyn DataHolder>> {
        self.data_holder.clone()
    }

    /// Names of the capabilities this provider implements, for diagnostics.
    pub fn capabilities(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .stages
            .keys()
            .map(Stage::as_str)
            .chain(self.items.keys().map(ItemStage::as_str))
            .chain(self.actions.keys().map(Action::as_str))
            .collect();

        let loaders = [
            (self.area_broker.is_some(), "loadAreaBroker"),
            (self.proxy.is_some(), "loadProxy"),
            (self.probe_overseer.is_some(), "loadProbeOverseer"),
            (self.test_store.is_some(), "loadTestStore"),
            (self.data_holder.is_some(), "loadDataHolder"),
            (self.persistent_state_reader.is_some(), "getPersistentState"),
            (self.persistent_state_writer.is_some(), "setPersistentState"),
        ];
        names.extend(loaders.iter().filter(|(set, _)| *set).map(|(_, name)| *name));
        names.sort_unstable();
        names
    }
}

/// Registration check for runner providers.
pub fn validate_runner_provider(provider: &RunnerProvider) -> Result<(), String> {
    if provider.area_broker.is_none() {
        return Err(MISSING_AREA_BROKER.to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::collaborators::AreaMap;

    #[test]
    fn test_area_broker_is_mandatory() {
        let provider = RunnerProvider::new().stage(Stage::Init, |_| async { Ok(()) });
        assert_eq!(
            validate_runner_provider(&provider),
            Err(MISSING_AREA_BROKER.to_string())
        );

        let provider = provider.area_broker(|_| Arc::new(AreaMap::new()));
        assert!(validate_runner_provider(&provider).is_ok());
    }

    #[test]
    fn test_capabilities() {
        let provider = RunnerProvider::new()
            .area_broker(|_| Arc::new(AreaMap::new()))
            .stage(Stage::Init, |_| async { Ok(()) })
            .item(ItemStage::LoadItem, |_, _, _| async { Ok(Value::Null) })
            .action(Action::Next, |_, _| async { Ok(Value::Null) });

        assert_eq!(
            provider.capabilities(),
            vec!["init", "loadAreaBroker", "loadItem", "next"]
        );
        assert!(provider.has_action(Action::Next));
        assert!(!provider.has_action(Action::Previous));
        assert!(provider.stage_hook(Stage::Render).is_none());
    }

    #[test]
    fn test_persistent_state_capabilities_are_separate() {
        let provider = RunnerProvider::new().persistent_state_setter(|_, _, _| async { Ok(()) });
        assert_eq!(provider.capabilities(), vec!["setPersistentState"]);
        assert!(provider.persistent_state_reader().is_none());

        let provider = RunnerProvider::new().persistent_state_getter(|_, _| true);
        assert_eq!(provider.capabilities(), vec!["getPersistentState"]);
        assert!(provider.persistent_state_writer().is_none());
    }
}
