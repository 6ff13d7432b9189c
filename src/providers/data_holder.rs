use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub const TEST_DATA: &str = "testData";
pub const TEST_CONTEXT: &str = "testContext";
pub const TEST_MAP: &str = "testMap";

pub trait DataHolder: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn clear(&self);
}

/// Default data holder. `testContext` and `testMap` always start as empty objects,
/// including after a `clear()`.
#[derive(Clone)]
pub struct MemoryDataHolder {
    values: Arc<RwLock<HashMap<String, Value>>>,
}

fn defaults() -> HashMap<String, Value> {
    [TEST_CONTEXT, TEST_MAP]
        .iter()
        .map(|key| (key.to_string(), Value::Object(Map::new())))
        .collect()
}

impl MemoryDataHolder {
    pub fn new() -> Self {
        Self {
            values: Arc::new(RwLock::new(defaults())),
        }
    }
}

impl Default for MemoryDataHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl DataHolder for MemoryDataHolder {
    fn get(&self, key: &str) -> Option<Value> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
    }

    fn clear(&self) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        *values = defaults();
    }
}
