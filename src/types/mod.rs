use serde::{Deserialize, Serialize};

/// Lifecycle stages run by the provider (and, except `LoadPersistentStates`, by plugins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Install,
    LoadPersistentStates,
    Init,
    Render,
    Finish,
    Flush,
    Destroy,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Install => "install",
            Stage::LoadPersistentStates => "loadPersistentStates",
            Stage::Init => "init",
            Stage::Render => "render",
            Stage::Finish => "finish",
            Stage::Flush => "flush",
            Stage::Destroy => "destroy",
        }
    }

    pub fn is_plugin_stage(&self) -> bool {
        !matches!(self, Stage::LoadPersistentStates)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemStage {
    LoadItem,
    RenderItem,
    UnloadItem,
    DisableItem,
    EnableItem,
}

impl ItemStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStage::LoadItem => "loadItem",
            ItemStage::RenderItem => "renderItem",
            ItemStage::UnloadItem => "unloadItem",
            ItemStage::DisableItem => "disableItem",
            ItemStage::EnableItem => "enableItem",
        }
    }
}

/// Delegating actions. When the provider lacks one, the runner emits an event instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Next,
    Previous,
    Jump,
    Skip,
    Exit,
    Pause,
    Resume,
    Timeout,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Next => "next",
            Action::Previous => "previous",
            Action::Jump => "jump",
            Action::Skip => "skip",
            Action::Exit => "exit",
            Action::Pause => "pause",
            Action::Resume => "resume",
            Action::Timeout => "timeout",
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, Action::Next | Action::Previous | Action::Jump)
    }
}

/// Events emitted by the runner itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerEvent {
    Error,
    Init,
    Render,
    Ready,
    LoadItem,
    RenderItem,
    UnloadItem,
    DisableItem,
    EnableItem,
    Finish,
    Flush,
    Destroy,
    Move,
    Action(Action),
}

impl RunnerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerEvent::Error => "error",
            RunnerEvent::Init => "init",
            RunnerEvent::Render => "render",
            RunnerEvent::Ready => "ready",
            RunnerEvent::LoadItem => "loaditem",
            RunnerEvent::RenderItem => "renderitem",
            RunnerEvent::UnloadItem => "unloaditem",
            RunnerEvent::DisableItem => "disableitem",
            RunnerEvent::EnableItem => "enableitem",
            RunnerEvent::Finish => "finish",
            RunnerEvent::Flush => "flush",
            RunnerEvent::Destroy => "destroy",
            RunnerEvent::Move => "move",
            RunnerEvent::Action(action) => action.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// The provider handled the action and returned this value.
    Delegated(serde_json::Value),
    /// No provider capability, the fallback event was emitted.
    Emitted,
    /// Redundant pause/resume, nothing happened.
    Skipped,
}
