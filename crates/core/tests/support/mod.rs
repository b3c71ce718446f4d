//! Shared test helpers for `kpfdash-core` integration tests.
//!
//! Provides an in-memory `MetricsSource` and record fixtures so dashboard
//! tests can focus on caching behaviour instead of boilerplate.

pub mod metrics;
