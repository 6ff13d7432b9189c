use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, RunnerError};

pub const RUNNER_STATES: [&str; 5] = ["init", "ready", "render", "finish", "destroy"];
pub const ITEM_STATES: [&str; 3] = ["loaded", "ready", "disabled"];

/// Boolean flags of a runner. Any non-empty name is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerStates {
    flags: HashMap<String, bool>,
}

impl RunnerStates {
    pub fn new() -> Self {
        Self {
            flags: RUNNER_STATES
                .iter()
                .map(|name| (name.to_string(), false))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn set(&mut self, name: &str, active: bool) -> Result<()> {
        if name.is_empty() {
            return Err(RunnerError::validation("The state must have a name"));
        }
        self.flags.insert(name.to_string(), active);
        Ok(())
    }
}

impl Default for RunnerStates {
    fn default() -> Self {
        Self::new()
    }
}

/// The flags of a single item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemState {
    flags: BTreeMap<String, bool>,
}

impl ItemState {
    pub fn new() -> Self {
        Self {
            flags: ITEM_STATES
                .iter()
                .map(|name| (name.to_string(), false))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn set(&mut self, name: &str, active: bool) {
        self.flags.insert(name.to_string(), active);
    }

    pub fn flags(&self) -> &BTreeMap<String, bool> {
        &self.flags
    }
}

impl Default for ItemState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemStates {
    items: HashMap<String, ItemState>,
}

fn check_item_key(item_ref: &str, name: &str) -> Result<()> {
    if item_ref.is_empty() || name.is_empty() {
        return Err(RunnerError::validation(
            "The state is identified by an itemRef and a name",
        ));
    }
    Ok(())
}

impl ItemStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, item_ref: &str, name: &str) -> Result<bool> {
        check_item_key(item_ref, name)?;
        Ok(self
            .items
            .get(item_ref)
            .map(|state| state.get(name))
            .unwrap_or(false))
    }

    /// Creates the default record on first write.
    pub fn set(&mut self, item_ref: &str, name: &str, active: bool) -> Result<()> {
        check_item_key(item_ref, name)?;
        self.items
            .entry(item_ref.to_string())
            .or_default()
            .set(name, active);
        Ok(())
    }

    /// Untouched items report the default record.
    pub fn state(&self, item_ref: &str) -> ItemState {
        self.items.get(item_ref).cloned().unwrap_or_default()
    }

    pub fn remove(&mut self, item_ref: &str) -> Option<ItemState> {
        self.items.remove(item_ref)
    }
}
