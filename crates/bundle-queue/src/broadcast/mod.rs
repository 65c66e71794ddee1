//! Broadcasting of job state changes to any number of observers.

pub mod update_bus;

pub use update_bus::{ListenerGuard, ListenerId, UpdateBus, UpdateStream};
