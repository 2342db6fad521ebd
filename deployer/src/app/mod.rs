//! Application wiring

pub mod run;
pub mod state;
