use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

use super::{ProviderDescriptor, ProviderSelection};
use crate::plugins::PluginFactory;
use crate::providers::RunnerProvider;

/// Providers resolved from a host configuration.
#[derive(Clone, Default)]
pub struct LoadedProviders {
    /// Runner providers with the name to register them under.
    pub runners: Vec<(String, RunnerProvider)>,
    /// Plugin factories, in configuration order.
    pub plugins: Vec<PluginFactory>,
}

#[async_trait]
pub trait ProviderLoader: Send + Sync {
    async fn load(
        &self,
        providers: &BTreeMap<String, ProviderSelection>,
        from_bundle: bool,
    ) -> Result<LoadedProviders>;
}

#[derive(Clone)]
pub enum ProviderModule {
    Runner(RunnerProvider),
    Plugin(PluginFactory),
}

/// In-process loader: modules are registered up front under their module id.
/// Only `runner` and `plugins` entries are resolved; the other kinds are
/// reached through the runner provider's own loaders.
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    modules: HashMap<String, ProviderModule>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runner(mut self, module: impl Into<String>, provider: RunnerProvider) -> Self {
        self.modules
            .insert(module.into(), ProviderModule::Runner(provider));
        self
    }

    pub fn with_plugin(mut self, module: impl Into<String>, factory: PluginFactory) -> Self {
        self.modules
            .insert(module.into(), ProviderModule::Plugin(factory));
        self
    }

    fn resolve(&self, descriptor: &ProviderDescriptor, from_bundle: bool) -> Result<&ProviderModule> {
        let bundled = if from_bundle {
            descriptor.bundle.as_deref()
        } else {
            None
        };
        let key = bundled
            .or(descriptor.module.as_deref())
            .or(descriptor.identifier())
            .ok_or_else(|| anyhow!("A provider descriptor needs a module, an id or a name"))?;

        self.modules
            .get(key)
            .ok_or_else(|| anyhow!("Unable to load the provider module '{}'", key))
    }
}

#[async_trait]
impl ProviderLoader for ModuleCatalog {
    async fn load(
        &self,
        providers: &BTreeMap<String, ProviderSelection>,
        from_bundle: bool,
    ) -> Result<LoadedProviders> {
        let mut loaded = LoadedProviders::default();

        for (kind, selection) in providers {
            if kind != "runner" && kind != "plugins" {
                log::debug!("Skipping {} providers, resolved by the runner provider", kind);
                continue;
            }

            for descriptor in selection.descriptors() {
                match self.resolve(descriptor, from_bundle)? {
                    ProviderModule::Runner(provider) => {
                        let name = descriptor
                            .identifier()
                            .ok_or_else(|| anyhow!("A runner provider needs an id or a name"))?;
                        loaded.runners.push((name.to_string(), provider.clone()));
                    }
                    ProviderModule::Plugin(factory) => loaded.plugins.push(factory.clone()),
                }
            }
        }
        Ok(loaded)
    }
}
