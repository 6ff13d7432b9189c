use anyhow::Result;
use serde_json::Value;

use super::runner::Runner;
use crate::types::{Action, ActionOutcome, RunnerEvent};

fn optional(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::String(v.to_string()))
}

/// Delegating actions. When the provider has the matching capability the call
/// is delegated to it, otherwise an event carries the same arguments.
impl Runner {
    pub async fn next(&self, scope: Option<&str>) -> Result<ActionOutcome> {
        let scope = optional(scope);
        self.delegate_or(Action::Next, vec![scope.clone()], vec![scope])
            .await
    }

    pub async fn previous(&self, scope: Option<&str>) -> Result<ActionOutcome> {
        let scope = optional(scope);
        self.delegate_or(Action::Previous, vec![scope.clone()], vec![scope])
            .await
    }

    /// The `move` event carries `(scope, position)`, the provider gets `(position, scope)`.
    pub async fn jump(&self, position: Value, scope: Option<&str>) -> Result<ActionOutcome> {
        let scope = optional(scope);
        self.delegate_or(
            Action::Jump,
            vec![position.clone(), scope.clone()],
            vec![scope, position],
        )
        .await
    }

    pub async fn skip(
        &self,
        scope: Option<&str>,
        item_ref: Option<&str>,
        direction: Option<&str>,
    ) -> Result<ActionOutcome> {
        let args = vec![optional(scope), optional(item_ref), optional(direction)];
        self.delegate_or(Action::Skip, args.clone(), args).await
    }

    pub async fn exit(&self, why: Option<&str>) -> Result<ActionOutcome> {
        let why = optional(why);
        self.delegate_or(Action::Exit, vec![why.clone()], vec![why])
            .await
    }

    /// No-op when already paused.
    pub async fn pause(&self) -> Result<ActionOutcome> {
        if self.get_state("pause") {
            return Ok(ActionOutcome::Skipped);
        }
        self.set_state("pause", true)?;
        self.delegate_or(Action::Pause, vec![], vec![]).await
    }

    /// No-op unless paused.
    pub async fn resume(&self) -> Result<ActionOutcome> {
        if !self.get_state("pause") {
            return Ok(ActionOutcome::Skipped);
        }
        self.set_state("pause", false)?;
        self.delegate_or(Action::Resume, vec![], vec![]).await
    }

    pub async fn timeout(
        &self,
        scope: Option<&str>,
        item_ref: Option<&str>,
        timer: Value,
    ) -> Result<ActionOutcome> {
        let args = vec![optional(scope), optional(item_ref), timer];
        self.delegate_or(Action::Timeout, args.clone(), args).await
    }

    async fn delegate_or(
        &self,
        action: Action,
        provider_args: Vec<Value>,
        event_args: Vec<Value>,
    ) -> Result<ActionOutcome> {
        if self.inner.provider.has_action(action) {
            let value = self.provider_run(action, provider_args).await?;
            return Ok(ActionOutcome::Delegated(value));
        }

        if action.is_move() {
            let mut args = vec![Value::String(action.as_str().to_string())];
            args.extend(event_args);
            self.emit(RunnerEvent::Move, args).await;
        } else {
            self.emit(RunnerEvent::Action(action), event_args).await;
        }
        Ok(ActionOutcome::Emitted)
    }
}
