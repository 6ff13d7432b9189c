//! Event bus with ordered listener phases.
//!
//! A trigger runs three phases:
//! - `before` listeners, one after the other. An `Err` cancels the event.
//! - `on` listeners, concurrently, joined. An `Err` skips the `after` phase.
//! - `after` listeners, one after the other. Errors are logged only.
//!
//! [`EventBus::trigger`] reports how far the dispatch went, so the caller can
//! decide whether an automatic continuation (e.g. `loaditem` → `renderitem`)
//! should run.

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

pub type Listener<C> = Arc<dyn Fn(C, Event) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Before,
    On,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Completed,
    Canceled(Phase),
}

impl Dispatch {
    pub fn is_completed(&self) -> bool {
        matches!(self, Dispatch::Completed)
    }
}

#[derive(Clone)]
pub struct Event {
    pub name: String,
    pub namespace: Option<String>,
    pub args: Vec<Value>,
    pub error: Option<Arc<anyhow::Error>>,
}

impl Event {
    pub fn new(name: &str, args: Vec<Value>) -> Self {
        let (name, namespace) = split_name(name);
        Self {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            args,
            error: None,
        }
    }

    pub fn error(err: anyhow::Error) -> Self {
        Self {
            name: "error".to_string(),
            namespace: None,
            args: vec![Value::String(format!("{:#}", err))],
            error: Some(Arc::new(err)),
        }
    }

    pub fn arg(&self, index: usize) -> &Value {
        self.args.get(index).unwrap_or(&Value::Null)
    }

    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(Value::as_str)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("args", &self.args)
            .field("error", &self.error.as_ref().map(|e| e.to_string()))
            .finish()
    }
}

/// Splits `name.namespace`. The namespace is everything after the first dot.
pub fn split_name(full: &str) -> (&str, Option<&str>) {
    match full.split_once('.') {
        Some((name, namespace)) if !namespace.is_empty() => (name, Some(namespace)),
        Some((name, _)) => (name, None),
        None => (full, None),
    }
}

struct Registration<C> {
    phase: Phase,
    namespace: Option<String>,
    listener: Listener<C>,
}

/// Listeners receive a clone of the context `C` (usually a cheap handle) and the event.
pub struct EventBus<C> {
    listeners: RwLock<HashMap<String, Vec<Registration<C>>>>,
}

impl<C> EventBus<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
        }
    }

    pub fn before<F, Fut>(&self, name: &str, listener: F)
    where
        F: Fn(C, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add(Phase::Before, name, listener);
    }

    pub fn on<F, Fut>(&self, name: &str, listener: F)
    where
        F: Fn(C, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add(Phase::On, name, listener);
    }

    pub fn after<F, Fut>(&self, name: &str, listener: F)
    where
        F: Fn(C, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add(Phase::After, name, listener);
    }

    pub fn add<F, Fut>(&self, phase: Phase, name: &str, listener: F)
    where
        F: Fn(C, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let (event, namespace) = split_name(name);
        if event.is_empty() {
            log::warn!("Ignoring listener registered without an event name: '{}'", name);
            return;
        }

        let listener: Listener<C> = Arc::new(move |context: C, ev: Event| listener(context, ev).boxed());
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        listeners
            .entry(event.to_string())
            .or_default()
            .push(Registration {
                phase,
                namespace: namespace.map(str::to_string),
                listener,
            });
    }

    /// `off("event")` removes every listener of the event, `off("event.ns")` only
    /// those in the namespace, `off(".ns")` the namespace across all events.
    pub fn off(&self, name: &str) {
        let (event, namespace) = split_name(name);
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);

        match (event.is_empty(), namespace) {
            (false, None) => {
                listeners.remove(event);
            }
            (false, Some(ns)) => {
                if let Some(registrations) = listeners.get_mut(event) {
                    registrations.retain(|r| r.namespace.as_deref() != Some(ns));
                }
            }
            (true, Some(ns)) => {
                for registrations in listeners.values_mut() {
                    registrations.retain(|r| r.namespace.as_deref() != Some(ns));
                }
            }
            (true, None) => {}
        }
        listeners.retain(|_, registrations| !registrations.is_empty());
    }

    pub fn remove_all(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn listener_count(&self, name: &str) -> usize {
        let (event, namespace) = split_name(name);
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        listeners
            .get(event)
            .map(|registrations| {
                registrations
                    .iter()
                    .filter(|r| namespace.is_none() || r.namespace.as_deref() == namespace)
                    .count()
            })
            .unwrap_or(0)
    }

    pub async fn trigger(&self, context: C, name: &str, args: Vec<Value>) -> Dispatch {
        self.dispatch(context, Event::new(name, args)).await
    }

    pub async fn dispatch(&self, context: C, event: Event) -> Dispatch {
        let before = self.snapshot(&event, Phase::Before);
        for listener in before {
            if let Err(err) = listener(context.clone(), event.clone()).await {
                log::debug!("Event '{}' canceled by a before listener: {:#}", event.name, err);
                return Dispatch::Canceled(Phase::Before);
            }
        }

        let on = self.snapshot(&event, Phase::On);
        let results = join_all(
            on.into_iter()
                .map(|listener| listener(context.clone(), event.clone())),
        )
        .await;
        if let Some(err) = results.into_iter().find_map(Result::err) {
            log::debug!("Event '{}' rejected by a listener: {:#}", event.name, err);
            return Dispatch::Canceled(Phase::On);
        }

        let after = self.snapshot(&event, Phase::After);
        for listener in after {
            if let Err(err) = listener(context.clone(), event.clone()).await {
                log::warn!("After listener of '{}' failed: {:#}", event.name, err);
            }
        }

        Dispatch::Completed
    }

    // Listeners are cloned out so the lock is released before any of them runs.
    fn snapshot(&self, event: &Event, phase: Phase) -> Vec<Listener<C>> {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        listeners
            .get(&event.name)
            .map(|registrations| {
                registrations
                    .iter()
                    .filter(|r| r.phase == phase)
                    .filter(|r| match (&event.namespace, &r.namespace) {
                        (None, _) | (_, None) => true,
                        (Some(wanted), Some(ns)) => wanted == ns,
                    })
                    .map(|r| r.listener.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<C> Default for EventBus<C>
where
    C: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
