pub mod bus;

pub use bus::{split_name, Dispatch, Event, EventBus, Listener, Phase};
