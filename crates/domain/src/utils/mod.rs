//! Domain utility functions

pub mod serde_time;
