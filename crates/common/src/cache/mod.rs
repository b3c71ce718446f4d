//! Query cache with request coalescing, stale-while-revalidate and polling
//!
//! This module provides the client-side data layer sitting between readers
//! and a remote source: one cache entry per query key, at most one fetch in
//! flight per key, and subscriber-driven refresh.
//!
//! # Features
//!
//! - **Coalescing**: concurrent identical requests share one fetch
//! - **Last-issued wins**: superseded completions are discarded by epoch
//! - **Stale-while-revalidate**: stale data is served while it is refreshed
//! - **Subscriptions**: listeners observe every entry transition; polling
//!   runs only while a key has subscribers
//! - **Testable**: clock abstraction for deterministic staleness tests
//!
//! # Examples
//!
//! ## Reading with staleness
//! ```
//! use std::time::Duration;
//!
//! use kpfdash_common::cache::{fetcher, QueryCache, QueryOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache: QueryCache<String, Vec<u32>, String> = QueryCache::new();
//! let options = QueryOptions::revalidating(Duration::from_secs(60));
//!
//! let entry = cache
//!     .read_or_fetch("revenue".to_string(), fetcher(|| async { Ok(vec![1, 2, 3]) }), options)
//!     .await;
//! assert_eq!(entry.data().map(|rows| rows.len()), Some(3));
//! # }
//! ```
//!
//! ## Polling while subscribed
//! ```
//! use std::time::Duration;
//!
//! use kpfdash_common::cache::{fetcher, QueryCache, QueryOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache: QueryCache<&'static str, String, String> = QueryCache::new();
//! let subscription = cache.subscribe(
//!     "sync_status",
//!     fetcher(|| async { Ok("running".to_string()) }),
//!     QueryOptions::polling(Duration::from_secs(10)),
//!     |entry| {
//!         let _ = entry.display_status();
//!     },
//! );
//! assert!(cache.is_polling(&"sync_status"));
//!
//! drop(subscription);
//! assert!(!cache.is_polling(&"sync_status"));
//! # }
//! ```

mod config;
mod entry;
mod query;
mod stats;
mod subscription;

// Re-export public API
pub use config::{QueryOptions, QueryOptionsBuilder};
pub use entry::{CacheEntry, QueryStatus};
pub use query::{fetcher, Fetcher, Listener, QueryCache};
pub use stats::QueryStats;
pub use subscription::Subscription;
