//! Per-request event timelines

pub mod alert;
pub mod audit;
pub mod log;
pub mod timeline;

pub use log::{EventLog, EventSubscriber};
pub use timeline::{Event, Timeline};
