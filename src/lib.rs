pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod factory;
pub mod host;
pub mod lifecycle;
pub mod plugins;
pub mod providers;
pub mod types;

pub use config::{RunnerConfig, RunnerOptions};
pub use engine::{Runner, WeakRunner};
pub use error::{Result, RunnerError};
pub use events::{Dispatch, Event, EventBus, Phase};
pub use factory::RunnerFactory;
pub use plugins::{BasicPlugin, Plugin, PluginContext, PluginDefinition, PluginFactory};
pub use providers::{ProviderRegistry, RunnerProvider};
pub use types::*;
