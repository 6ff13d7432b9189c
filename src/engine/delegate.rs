use anyhow::Result;
use futures::future::try_join_all;
use serde_json::Value;

use super::runner::Runner;
use crate::plugins::run_plugin_stage;
use crate::types::{Action, ItemStage, Stage};

impl Runner {
    /// Runs a provider stage hook. A missing hook resolves immediately.
    pub(crate) async fn provider_stage(&self, stage: Stage) -> Result<()> {
        match self.inner.provider.stage_hook(stage) {
            Some(hook) => {
                log::debug!("Runner {}: provider {}", self.id(), stage.as_str());
                hook(self.clone()).await
            }
            None => Ok(()),
        }
    }

    pub(crate) async fn provider_item(
        &self,
        stage: ItemStage,
        item_ref: &str,
        data: Value,
    ) -> Result<Value> {
        match self.inner.provider.item_hook(stage) {
            Some(hook) => {
                log::debug!(
                    "Runner {}: provider {} '{}'",
                    self.id(),
                    stage.as_str(),
                    item_ref
                );
                hook(self.clone(), item_ref.to_string(), data).await
            }
            None => Ok(Value::Null),
        }
    }

    /// Calls a provider action. Resolves to `Null` when the provider lacks it.
    pub async fn provider_run(&self, action: Action, args: Vec<Value>) -> Result<Value> {
        match self.inner.provider.action_hook(action) {
            Some(hook) => hook(self.clone(), args).await,
            None => Ok(Value::Null),
        }
    }

    /// Runs a stage on every plugin concurrently. The first failure wins.
    pub(crate) async fn plugin_run(&self, stage: Stage) -> Result<()> {
        if !stage.is_plugin_stage() {
            return Ok(());
        }
        let plugins = self.plugins();
        if plugins.is_empty() {
            return Ok(());
        }
        try_join_all(
            plugins
                .into_iter()
                .map(|plugin| run_plugin_stage(plugin, stage)),
        )
        .await?;
        Ok(())
    }
}
