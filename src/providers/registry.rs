use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{Result, RunnerError};

/// Returns `Err(reason)` to refuse a provider.
pub type Validator<P> = Box<dyn Fn(&P) -> std::result::Result<(), String> + Send + Sync>;

/// Named directory of providers of one kind (runner, proxy, ...).
pub struct ProviderRegistry<P> {
    kind: String,
    providers: RwLock<HashMap<String, Arc<P>>>,
    validator: Option<Validator<P>>,
}

impl<P> ProviderRegistry<P>
where
    P: Send + Sync,
{
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            providers: RwLock::new(HashMap::new()),
            validator: None,
        }
    }

    pub fn with_validator<F>(kind: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&P) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        Self {
            kind: kind.into(),
            providers: RwLock::new(HashMap::new()),
            validator: Some(Box::new(validator)),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn register(&self, name: impl Into<String>, provider: P) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(RunnerError::validation(
                "It is required to give a name to your provider",
            ));
        }

        if let Some(validator) = &self.validator {
            validator(&provider).map_err(|reason| RunnerError::InvalidProvider {
                kind: self.kind.clone(),
                name: name.clone(),
                reason,
            })?;
        }

        log::debug!("Registering {} provider '{}'", self.kind, name);
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        providers.insert(name, Arc::new(provider));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<P>> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers
            .get(name)
            .cloned()
            .ok_or_else(|| RunnerError::ProviderNotFound {
                kind: self.kind.clone(),
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        log::debug!("Clearing {} providers", self.kind);
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
