pub mod states;

pub use states::{ItemState, ItemStates, RunnerStates, ITEM_STATES, RUNNER_STATES};
