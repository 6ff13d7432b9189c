use anyhow::Result;
use serde_json::{json, Value};

use super::runner::Runner;
use crate::error::RunnerError;
use crate::events::Dispatch;
use crate::types::{ItemStage, RunnerEvent, Stage};

fn require_ref(item_ref: &str) -> Result<()> {
    if item_ref.is_empty() {
        return Err(RunnerError::validation("The state is identified by an itemRef and a name").into());
    }
    Ok(())
}

fn item_args(item_ref: &str, data: Option<Value>) -> Vec<Value> {
    let mut args = vec![Value::String(item_ref.to_string())];
    args.extend(data);
    args
}

/// Lifecycle pipelines. Each public method reports its failures on the `error`
/// event instead of returning them; the stages after a failure do not run.
impl Runner {
    /// Installs and initializes the provider and the plugins, then renders.
    pub async fn init(&self) {
        match self.init_pipeline().await {
            Ok(dispatch) if dispatch.is_completed() => self.render().await,
            Ok(dispatch) => {
                log::warn!("Runner {}: init listeners vetoed the render ({:?})", self.id(), dispatch)
            }
            Err(err) => self.report_error(err).await,
        }
    }

    async fn init_pipeline(&self) -> Result<Dispatch> {
        self.get_data_holder();
        self.instantiate_plugins();

        self.provider_stage(Stage::Install).await?;
        self.provider_stage(Stage::LoadPersistentStates).await?;
        self.plugin_run(Stage::Install).await?;
        self.provider_stage(Stage::Init).await?;
        self.plugin_run(Stage::Init).await?;

        self.set_state("init", true)?;
        Ok(self.emit(RunnerEvent::Init, vec![]).await)
    }

    pub async fn render(&self) {
        if let Err(err) = self.render_pipeline().await {
            self.report_error(err).await;
        }
    }

    async fn render_pipeline(&self) -> Result<()> {
        self.provider_stage(Stage::Render).await?;
        self.plugin_run(Stage::Render).await?;

        self.set_state("ready", true)?;
        self.emit(RunnerEvent::Render, vec![]).await;
        self.emit(RunnerEvent::Ready, vec![]).await;
        Ok(())
    }

    /// Loads an item through the provider, then renders it unless a `loaditem`
    /// listener rejects the event.
    pub async fn load_item(&self, item_ref: &str) {
        match self.load_item_pipeline(item_ref).await {
            Ok((Dispatch::Completed, data)) => self.render_item(item_ref, data).await,
            Ok((dispatch, _)) => log::debug!(
                "Runner {}: rendering of '{}' vetoed ({:?})",
                self.id(),
                item_ref,
                dispatch
            ),
            Err(err) => self.report_error(err).await,
        }
    }

    async fn load_item_pipeline(&self, item_ref: &str) -> Result<(Dispatch, Value)> {
        require_ref(item_ref)?;
        let data = self
            .provider_item(ItemStage::LoadItem, item_ref, Value::Null)
            .await?;

        self.set_item_state(item_ref, "loaded", true)?;
        let dispatch = self
            .emit(RunnerEvent::LoadItem, item_args(item_ref, Some(data.clone())))
            .await;
        Ok((dispatch, data))
    }

    pub async fn render_item(&self, item_ref: &str, data: Value) {
        if let Err(err) = self.render_item_pipeline(item_ref, data).await {
            self.report_error(err).await;
        }
    }

    async fn render_item_pipeline(&self, item_ref: &str, data: Value) -> Result<()> {
        require_ref(item_ref)?;
        self.provider_item(ItemStage::RenderItem, item_ref, data.clone())
            .await?;

        self.set_item_state(item_ref, "ready", true)?;
        self.emit(RunnerEvent::RenderItem, item_args(item_ref, Some(data)))
            .await;
        Ok(())
    }

    /// Unloads an item and forgets all of its states.
    pub async fn unload_item(&self, item_ref: &str) {
        if let Err(err) = self.unload_item_pipeline(item_ref).await {
            self.report_error(err).await;
        }
    }

    async fn unload_item_pipeline(&self, item_ref: &str) -> Result<()> {
        require_ref(item_ref)?;
        self.provider_item(ItemStage::UnloadItem, item_ref, Value::Null)
            .await?;

        self.remove_item_state(item_ref);
        self.emit(RunnerEvent::UnloadItem, item_args(item_ref, None))
            .await;
        Ok(())
    }

    pub async fn disable_item(&self, item_ref: &str) {
        if let Err(err) = self.toggle_item(item_ref, true).await {
            self.report_error(err).await;
        }
    }

    pub async fn enable_item(&self, item_ref: &str) {
        if let Err(err) = self.toggle_item(item_ref, false).await {
            self.report_error(err).await;
        }
    }

    async fn toggle_item(&self, item_ref: &str, disabled: bool) -> Result<()> {
        if self.get_item_state(item_ref, "disabled")? == disabled {
            return Ok(());
        }

        let (stage, event) = if disabled {
            (ItemStage::DisableItem, RunnerEvent::DisableItem)
        } else {
            (ItemStage::EnableItem, RunnerEvent::EnableItem)
        };
        self.provider_item(stage, item_ref, Value::Null).await?;

        self.set_item_state(item_ref, "disabled", disabled)?;
        self.emit(event, item_args(item_ref, None)).await;
        Ok(())
    }

    pub async fn finish(&self) {
        if let Err(err) = self.closing_stage(Stage::Finish, RunnerEvent::Finish).await {
            self.report_error(err).await;
        }
    }

    pub async fn flush(&self) {
        if let Err(err) = self.closing_stage(Stage::Flush, RunnerEvent::Flush).await {
            self.report_error(err).await;
        }
    }

    async fn closing_stage(&self, stage: Stage, event: RunnerEvent) -> Result<()> {
        self.provider_stage(stage).await?;
        self.plugin_run(stage).await?;

        self.set_state(stage.as_str(), true)?;
        self.emit(event, vec![]).await;
        Ok(())
    }

    /// Tears the runner down. Once `destroy` is emitted the data holder is
    /// cleared and the lazily built collaborators are released, whatever the
    /// listeners do.
    pub async fn destroy(&self) {
        if let Err(err) = self.destroy_pipeline().await {
            self.report_error(err).await;
            return;
        }
        self.release_collaborators();
        log::debug!("Runner {}: destroyed", self.id());
    }

    async fn destroy_pipeline(&self) -> Result<()> {
        self.provider_stage(Stage::Destroy).await?;
        self.plugin_run(Stage::Destroy).await?;

        if let Some(proxy) = self.built_proxy() {
            proxy.destroy().await?;
        }

        self.set_test_context(json!({}));
        self.set_test_map(json!({}));

        self.set_state("destroy", true)?;
        self.emit(RunnerEvent::Destroy, vec![]).await;
        Ok(())
    }
}
