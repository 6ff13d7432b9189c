use anyhow::{anyhow, Context};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use uuid::Uuid;

use super::lazy::LazySlot;
use crate::config::{RunnerConfig, RunnerOptions};
use crate::error::{Result, RunnerError};
use crate::events::{split_name, Dispatch, Event, EventBus, Phase};
use crate::factory::RUNNER_PROVIDER_KIND;
use crate::lifecycle::{ItemState, ItemStates, RunnerStates};
use crate::plugins::{Plugin, PluginFactory, PluginSet};
use crate::providers::data_holder::{TEST_CONTEXT, TEST_DATA, TEST_MAP};
use crate::providers::runner::{Loader, MISSING_AREA_BROKER};
use crate::providers::{
    AreaBroker, DataHolder, ErrorHandler, MemoryDataHolder, PluginStore, ProbeOverseer, Proxy, RunnerProvider,
    TestStore,
};
use crate::types::RunnerEvent;

pub(crate) struct RunnerInner {
    pub(crate) id: Uuid,
    pub(crate) provider_name: String,
    pub(crate) provider: Arc<RunnerProvider>,
    pub(crate) plugin_factories: Vec<PluginFactory>,
    pub(crate) config: RunnerConfig,
    pub(crate) events: EventBus<Runner>,
    pub(crate) states: Mutex<RunnerStates>,
    pub(crate) item_states: Mutex<ItemStates>,
    pub(crate) plugins: RwLock<PluginSet>,
    pub(crate) area_broker_loader: Loader<dyn AreaBroker>,
    pub(crate) data_holder: LazySlot<dyn DataHolder>,
    pub(crate) area_broker: LazySlot<dyn AreaBroker>,
    pub(crate) proxy: LazySlot<dyn Proxy>,
    pub(crate) probe_overseer: LazySlot<dyn ProbeOverseer>,
    pub(crate) test_store: LazySlot<dyn TestStore>,
}

/// The lifecycle orchestrator. Cheap to clone: clones share the same instance.
#[derive(Clone)]
pub struct Runner {
    pub(crate) inner: Arc<RunnerInner>,
}

/// Non-owning handle, for collaborators that must not keep the runner alive.
#[derive(Clone)]
pub struct WeakRunner {
    inner: Weak<RunnerInner>,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("id", &self.inner.id)
            .field("provider", &self.inner.provider_name)
            .finish()
    }
}

impl WeakRunner {
    pub fn upgrade(&self) -> Option<Runner> {
        self.inner.upgrade().map(|inner| Runner { inner })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Runner {
    /// Builds a runner in the all-`false` state. Nothing runs until [`init`](Self::init).
    /// Runners are created through [`RunnerFactory`](crate::RunnerFactory).
    pub(crate) fn new(
        provider_name: impl Into<String>,
        provider: Arc<RunnerProvider>,
        plugin_factories: Vec<PluginFactory>,
        config: RunnerConfig,
    ) -> Result<Self> {
        let provider_name = provider_name.into();
        let area_broker_loader = provider.area_broker_loader().ok_or_else(|| RunnerError::InvalidProvider {
            kind: RUNNER_PROVIDER_KIND.to_string(),
            name: provider_name.clone(),
            reason: MISSING_AREA_BROKER.to_string(),
        })?;

        let inner = RunnerInner {
            id: Uuid::new_v4(),
            provider_name,
            provider,
            plugin_factories,
            config,
            events: EventBus::new(),
            states: Mutex::new(RunnerStates::new()),
            item_states: Mutex::new(ItemStates::new()),
            plugins: RwLock::new(PluginSet::new()),
            area_broker_loader,
            data_holder: LazySlot::new(),
            area_broker: LazySlot::new(),
            proxy: LazySlot::new(),
            probe_overseer: LazySlot::new(),
            test_store: LazySlot::new(),
        };
        let runner = Self {
            inner: Arc::new(inner),
        };
        log::debug!(
            "Runner {} created with provider '{}'",
            runner.id(),
            runner.provider_name()
        );
        Ok(runner)
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn provider_name(&self) -> &str {
        &self.inner.provider_name
    }

    pub fn provider(&self) -> Arc<RunnerProvider> {
        self.inner.provider.clone()
    }

    pub fn downgrade(&self) -> WeakRunner {
        WeakRunner {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &Runner) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // Events

    pub fn on<F, Fut>(&self, name: &str, listener: F) -> &Self
    where
        F: Fn(Runner, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.inner.events.on(name, listener);
        self
    }

    pub fn before<F, Fut>(&self, name: &str, listener: F) -> &Self
    where
        F: Fn(Runner, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.inner.events.before(name, listener);
        self
    }

    pub fn after<F, Fut>(&self, name: &str, listener: F) -> &Self
    where
        F: Fn(Runner, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.inner.events.after(name, listener);
        self
    }

    pub fn off(&self, name: &str) -> &Self {
        self.inner.events.off(name);
        self
    }

    /// Emits an event. A `move` is re-emitted under its specific name
    /// (`next`, `previous`, `jump`) with the remaining arguments.
    pub async fn trigger(&self, name: &str, args: Vec<Value>) -> Dispatch {
        let forward = match (split_name(name).0, args.first()) {
            ("move", Some(Value::String(kind))) if !kind.is_empty() => {
                Some((kind.clone(), args[1..].to_vec()))
            }
            _ => None,
        };

        let dispatch = self.inner.events.trigger(self.clone(), name, args).await;

        if let Some((kind, rest)) = forward {
            if dispatch != Dispatch::Canceled(Phase::Before) {
                self.inner.events.trigger(self.clone(), &kind, rest).await;
            }
        }
        dispatch
    }

    pub(crate) async fn emit(&self, event: RunnerEvent, args: Vec<Value>) -> Dispatch {
        self.trigger(event.as_str(), args).await
    }

    pub(crate) async fn report_error(&self, err: anyhow::Error) {
        log::error!("Runner {}: {:#}", self.id(), err);
        self.inner
            .events
            .dispatch(self.clone(), Event::error(err))
            .await;
    }

    // Configuration

    pub fn config(&self) -> &RunnerConfig {
        &self.inner.config
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.inner.config.options
    }

    pub fn plugins_config(&self) -> &Map<String, Value> {
        &self.inner.config.options.plugins
    }

    /// Config of a registered plugin, `{}` for unknown or unconfigured plugins.
    pub fn plugin_config(&self, name: &str) -> Value {
        if !name.is_empty() && self.plugins_read().contains(name) {
            if let Some(config) = self.plugins_config().get(name) {
                return config.clone();
            }
        }
        Value::Object(Map::new())
    }

    // Plugins

    fn plugins_read(&self) -> PluginSet {
        self.inner
            .plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins_read().all()
    }

    pub fn plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins_read().get(name)
    }

    pub(crate) fn instantiate_plugins(&self) {
        let mut set = PluginSet::new();
        for factory in &self.inner.plugin_factories {
            let plugin = factory(self, self.get_area_broker());
            log::debug!("Runner {}: plugin '{}' instantiated", self.id(), plugin.name());
            set.insert(plugin);
        }
        *self
            .inner
            .plugins
            .write()
            .unwrap_or_else(PoisonError::into_inner) = set;
    }

    // States

    pub fn get_state(&self, name: &str) -> bool {
        lock(&self.inner.states).get(name)
    }

    pub fn set_state(&self, name: &str, active: bool) -> Result<&Self> {
        lock(&self.inner.states).set(name, active)?;
        Ok(self)
    }

    pub fn get_item_state(&self, item_ref: &str, name: &str) -> Result<bool> {
        lock(&self.inner.item_states).get(item_ref, name)
    }

    pub fn set_item_state(&self, item_ref: &str, name: &str, active: bool) -> Result<&Self> {
        lock(&self.inner.item_states).set(item_ref, name, active)?;
        Ok(self)
    }

    pub fn item_state(&self, item_ref: &str) -> ItemState {
        lock(&self.inner.item_states).state(item_ref)
    }

    pub(crate) fn remove_item_state(&self, item_ref: &str) {
        lock(&self.inner.item_states).remove(item_ref);
    }

    pub fn get_persistent_state(&self, name: &str) -> bool {
        match self.inner.provider.persistent_state_reader() {
            Some(reader) => reader(self, name),
            None => false,
        }
    }

    /// Stores a persistent state through the provider. Failures are returned and
    /// also reported on the `error` channel.
    pub async fn set_persistent_state(&self, name: &str, active: bool) -> anyhow::Result<()> {
        if name.is_empty() {
            let err = RunnerError::validation("The state must have a name");
            self.report_error(err.clone().into()).await;
            return Err(err.into());
        }

        let Some(writer) = self.inner.provider.persistent_state_writer() else {
            return Ok(());
        };
        let stored = writer(self.clone(), name.to_string(), active).await;
        if let Err(err) = &stored {
            self.report_error(anyhow!("{:#}", err)).await;
        }
        stored
    }

    // Collaborators

    pub fn get_data_holder(&self) -> Arc<dyn DataHolder> {
        self.inner.data_holder.get_or_init(|| {
            match self.inner.provider.data_holder_loader() {
                Some(loader) => loader(self),
                None => Arc::new(MemoryDataHolder::new()),
            }
        })
    }

    pub fn get_area_broker(&self) -> Arc<dyn AreaBroker> {
        self.inner
            .area_broker
            .get_or_init(|| (self.inner.area_broker_loader)(self))
    }

    /// The proxy is built once, wired to re-emit its errors on the runner, then
    /// installed with the data holder. A failed install is returned and nothing
    /// is kept, so the next call builds a fresh proxy.
    pub fn get_proxy(&self) -> anyhow::Result<Arc<dyn Proxy>> {
        let loader = self.inner.provider.proxy_loader().ok_or_else(|| {
            RunnerError::configuration("The provider does not have a loadProxy method")
        })?;

        self.inner.proxy.try_get_or_init(|| -> anyhow::Result<Arc<dyn Proxy>> {
            let proxy = loader(self);
            let weak = self.downgrade();
            let handler: ErrorHandler = Arc::new(move |err: anyhow::Error| {
                let weak = weak.clone();
                async move {
                    if let Some(runner) = weak.upgrade() {
                        runner.report_error(err).await;
                    }
                }
                .boxed()
            });
            proxy.on_error(handler);
            proxy
                .install(self.get_data_holder())
                .context("Unable to install the proxy")?;
            Ok(proxy)
        })
    }

    pub fn get_probe_overseer(&self) -> Option<Arc<dyn ProbeOverseer>> {
        let loader = self.inner.provider.probe_overseer_loader();
        self.inner
            .probe_overseer
            .get_or_try_init(|| loader.map(|load| load(self)))
    }

    pub fn get_test_store(&self) -> Option<Arc<dyn TestStore>> {
        let loader = self.inner.provider.test_store_loader();
        self.inner
            .test_store
            .get_or_try_init(|| loader.map(|load| load(self)))
    }

    pub async fn get_plugin_store(&self, name: &str) -> anyhow::Result<Arc<dyn PluginStore>> {
        let store = self.get_test_store().ok_or_else(|| {
            RunnerError::configuration(
                "Please configure a testStore via loadTestStore to be able to get a plugin store",
            )
        })?;
        store.get_store(name).await
    }

    pub(crate) fn built_proxy(&self) -> Option<Arc<dyn Proxy>> {
        self.inner.proxy.get()
    }

    pub(crate) fn release_collaborators(&self) {
        if let Some(holder) = self.inner.data_holder.get() {
            holder.clear();
        }
        self.inner.area_broker.release();
        self.inner.proxy.release();
        self.inner.probe_overseer.release();
        self.inner.test_store.release();
    }

    // Test data, only available once a data holder exists

    fn holder_value(&self, key: &str) -> Option<Value> {
        self.inner.data_holder.get().and_then(|holder| holder.get(key))
    }

    fn set_holder_object(&self, key: &str, value: Value) -> &Self {
        if let (Some(holder), true) = (self.inner.data_holder.get(), value.is_object()) {
            holder.set(key, value);
        }
        self
    }

    pub fn get_test_data(&self) -> Option<Value> {
        self.holder_value(TEST_DATA)
    }

    pub fn set_test_data(&self, test_data: Value) -> &Self {
        self.set_holder_object(TEST_DATA, test_data)
    }

    pub fn get_test_context(&self) -> Option<Value> {
        self.holder_value(TEST_CONTEXT)
    }

    pub fn set_test_context(&self, test_context: Value) -> &Self {
        self.set_holder_object(TEST_CONTEXT, test_context)
    }

    pub fn get_test_map(&self) -> Option<Value> {
        self.holder_value(TEST_MAP)
    }

    pub fn set_test_map(&self, test_map: Value) -> &Self {
        self.set_holder_object(TEST_MAP, test_map)
    }
}
