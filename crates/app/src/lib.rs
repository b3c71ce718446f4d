//! # kpfdash App
//!
//! Headless runner for the dashboard query layer.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - Startup warm-up of the dashboard queries
//! - Sync status watcher
//!
//! ## Architecture
//! - Depends on `core` and `infra`
//! - Wires the REST metrics client into the dashboard service

pub mod context;
pub mod runner;

pub use context::AppContext;
pub use runner::{warm_up, SyncWatcher, WarmupReport};
