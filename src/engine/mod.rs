mod actions;
mod delegate;
mod lazy;
mod lifecycle;
mod runner;

pub use runner::{Runner, WeakRunner};
