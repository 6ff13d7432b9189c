use anyhow::Result;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use uuid::Uuid;

use super::{HostConfig, ProviderLoader};
use crate::engine::Runner;
use crate::error::RunnerError;
use crate::events::{Event, EventBus};
use crate::factory::RunnerFactory;
use crate::plugins::PluginFactory;
use crate::providers::ElementId;

pub const COMPONENT_CLASS: &str = "runner-component";
pub const HIDDEN_CLASS: &str = "hidden";

/// Where the runner component mounts its element.
pub trait Container: Send + Sync {
    fn append(&self, class: &str) -> Result<ElementId>;
    fn add_class(&self, element: &str, class: &str);
    fn remove_class(&self, element: &str, class: &str);
    fn remove(&self, element: &str);
}

/// Container keeping elements and their classes in memory.
#[derive(Clone, Default)]
pub struct MemoryContainer {
    elements: Arc<RwLock<BTreeMap<ElementId, BTreeSet<String>>>>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> Vec<ElementId> {
        let elements = self.elements.read().unwrap_or_else(PoisonError::into_inner);
        elements.keys().cloned().collect()
    }

    pub fn has_class(&self, element: &str, class: &str) -> bool {
        let elements = self.elements.read().unwrap_or_else(PoisonError::into_inner);
        elements
            .get(element)
            .map(|classes| classes.contains(class))
            .unwrap_or(false)
    }
}

impl Container for MemoryContainer {
    fn append(&self, class: &str) -> Result<ElementId> {
        let id = format!("{}-{}", class, Uuid::new_v4());
        let mut elements = self.elements.write().unwrap_or_else(PoisonError::into_inner);
        elements.insert(id.clone(), BTreeSet::from([class.to_string()]));
        Ok(id)
    }

    fn add_class(&self, element: &str, class: &str) {
        let mut elements = self.elements.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(classes) = elements.get_mut(element) {
            classes.insert(class.to_string());
        }
    }

    fn remove_class(&self, element: &str, class: &str) {
        let mut elements = self.elements.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(classes) = elements.get_mut(element) {
            classes.remove(class);
        }
    }

    fn remove(&self, element: &str) {
        let mut elements = self.elements.write().unwrap_or_else(PoisonError::into_inner);
        elements.remove(element);
    }
}

struct ComponentInner {
    container: Arc<dyn Container>,
    config: HostConfig,
    factory: RunnerFactory,
    loader: Arc<dyn ProviderLoader>,
    events: EventBus<RunnerComponent>,
    runner: Mutex<Option<Runner>>,
    element: Mutex<Option<ElementId>>,
    plugins: Mutex<Vec<PluginFactory>>,
}

/// Mounts a runner session into a container: loads the configured providers,
/// creates the runner and relays its `error` events.
///
/// Emits `init`, `render`, `ready`, `show`, `hide`, `error` and `destroy`.
#[derive(Clone)]
pub struct RunnerComponent {
    inner: Arc<ComponentInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RunnerComponent {
    pub fn new(
        container: Option<Arc<dyn Container>>,
        config: Value,
        factory: RunnerFactory,
        loader: Arc<dyn ProviderLoader>,
    ) -> crate::error::Result<Self> {
        let container = container.ok_or_else(|| {
            RunnerError::configuration("A container element must be defined to contain the runnerComponent")
        })?;
        let config = HostConfig::from_value(config)?;

        Ok(Self {
            inner: Arc::new(ComponentInner {
                container,
                config,
                factory,
                loader,
                events: EventBus::new(),
                runner: Mutex::new(None),
                element: Mutex::new(None),
                plugins: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.inner.config
    }

    pub fn runner(&self) -> Option<Runner> {
        lock(&self.inner.runner).clone()
    }

    pub fn element(&self) -> Option<ElementId> {
        lock(&self.inner.element).clone()
    }

    pub fn on<F, Fut>(&self, name: &str, listener: F) -> &Self
    where
        F: Fn(RunnerComponent, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.inner.events.on(name, listener);
        self
    }

    pub fn off(&self, name: &str) -> &Self {
        self.inner.events.off(name);
        self
    }

    async fn trigger(&self, name: &str) {
        self.inner.events.trigger(self.clone(), name, vec![]).await;
    }

    async fn report_error(&self, err: anyhow::Error) {
        log::error!("Runner component: {:#}", err);
        self.inner
            .events
            .dispatch(self.clone(), Event::error(err))
            .await;
    }

    /// Loads the providers, mounts the runner hidden, then shows it once the
    /// runner is ready.
    pub async fn init(&self) {
        self.trigger("init").await;

        if let Err(err) = self.load_providers().await {
            self.report_error(err).await;
            return;
        }

        self.mount().await;
        self.hide().await;
        self.announce_ready().await;
    }

    async fn load_providers(&self) -> Result<()> {
        let config = &self.inner.config;
        let loaded = self
            .inner
            .loader
            .load(&config.providers, config.load_from_bundle)
            .await?;

        for (name, provider) in loaded.runners {
            self.inner.factory.register_provider(name, provider)?;
        }
        *lock(&self.inner.plugins) = loaded.plugins;
        Ok(())
    }

    pub async fn render(&self) {
        self.mount().await;
        self.announce_ready().await;
    }

    async fn mount(&self) {
        self.trigger("render").await;

        let element = match self.inner.container.append(COMPONENT_CLASS) {
            Ok(element) => element,
            Err(err) => {
                self.report_error(err).await;
                return;
            }
        };
        *lock(&self.inner.element) = Some(element.clone());

        let runner_config = self.inner.config.runner_config(element);
        let provider_name = runner_config
            .selected_provider("runner")
            .unwrap_or_default()
            .to_string();
        let plugins = lock(&self.inner.plugins).clone();

        let runner = match self.inner.factory.create(&provider_name, plugins, runner_config) {
            Ok(runner) => runner,
            Err(err) => {
                self.report_error(err.into()).await;
                return;
            }
        };

        let weak = Arc::downgrade(&self.inner);
        runner.on("error", move |_, event: Event| {
            let weak = weak.clone();
            async move {
                if let Some(inner) = Weak::upgrade(&weak) {
                    let component = RunnerComponent { inner };
                    component
                        .inner
                        .events
                        .dispatch(component.clone(), event)
                        .await;
                }
                Ok(())
            }
        });

        let weak = Arc::downgrade(&self.inner);
        runner.on("destroy", move |_, _| {
            let weak = weak.clone();
            async move {
                if let Some(inner) = Weak::upgrade(&weak) {
                    lock(&inner.runner).take();
                }
                Ok(())
            }
        });

        *lock(&self.inner.runner) = Some(runner.clone());
        runner.init().await;
    }

    async fn announce_ready(&self) {
        let ready = self.runner().map(|runner| runner.get_state("ready")).unwrap_or(false);
        if ready {
            self.trigger("ready").await;
            self.show().await;
        }
    }

    pub async fn show(&self) {
        if let Some(element) = self.element() {
            self.inner.container.remove_class(&element, HIDDEN_CLASS);
        }
        self.trigger("show").await;
    }

    pub async fn hide(&self) {
        if let Some(element) = self.element() {
            self.inner.container.add_class(&element, HIDDEN_CLASS);
        }
        self.trigger("hide").await;
    }

    /// Destroys the runner, removes the element, then drops every listener.
    pub async fn destroy(&self) {
        let runner = lock(&self.inner.runner).take();
        if let Some(runner) = runner {
            runner.destroy().await;
        }

        let element = lock(&self.inner.element).take();
        if let Some(element) = element {
            self.inner.container.remove(&element);
        }

        self.trigger("destroy").await;
        self.inner.events.remove_all();
    }
}
