pub mod collaborators;
pub mod data_holder;
pub mod registry;
pub mod runner;

pub use collaborators::{
    AreaBroker, AreaMap, ElementId, ErrorHandler, PluginStore, ProbeOverseer, Proxy, TestStore,
};
pub use data_holder::{DataHolder, MemoryDataHolder};
pub use registry::{ProviderRegistry, Validator};
pub use runner::{validate_runner_provider, RunnerProvider};
