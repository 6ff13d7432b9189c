use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::data_holder::DataHolder;

pub type ElementId = String;

/// Callback a proxy uses to surface its errors.
pub type ErrorHandler = Arc<dyn Fn(anyhow::Error) -> BoxFuture<'static, ()> + Send + Sync>;

/// Maps named areas of the delivery layout to mounted elements.
pub trait AreaBroker: Send + Sync {
    fn get_area(&self, name: &str) -> Option<ElementId>;
}

#[derive(Debug, Clone, Default)]
pub struct AreaMap {
    areas: HashMap<String, ElementId>,
}

impl AreaMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_area(mut self, name: impl Into<String>, element: impl Into<ElementId>) -> Self {
        self.areas.insert(name.into(), element.into());
        self
    }
}

impl AreaBroker for AreaMap {
    fn get_area(&self, name: &str) -> Option<ElementId> {
        self.areas.get(name).cloned()
    }
}

/// Communication layer of the runner. Only the pieces the runner drives are exposed.
#[async_trait]
pub trait Proxy: Send + Sync {
    fn install(&self, data_holder: Arc<dyn DataHolder>) -> Result<()>;

    fn on_error(&self, handler: ErrorHandler);

    async fn destroy(&self) -> Result<()>;
}

#[async_trait]
pub trait ProbeOverseer: Send + Sync {
    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;
}

#[async_trait]
pub trait PluginStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<Value>>;

    async fn set_item(&self, key: &str, value: Value) -> Result<()>;

    async fn remove_item(&self, key: &str) -> Result<()>;
}

#[async_trait]
pub trait TestStore: Send + Sync {
    async fn get_store(&self, name: &str) -> Result<Arc<dyn PluginStore>>;
}
