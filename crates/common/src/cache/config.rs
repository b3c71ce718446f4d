//! Per-query refresh options and builder

use std::time::Duration;

/// Refresh policy for one cached query.
///
/// Both knobs are off by default: data fetched once stays fresh until it is
/// invalidated, refetched explicitly, or evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryOptions {
    /// Age after which a read serves the cached data and refreshes it in the
    /// background.
    pub stale_after: Option<Duration>,

    /// Cadence at which the fetcher is re-invoked while the key has at least
    /// one subscriber.
    pub refresh_interval: Option<Duration>,
}

impl QueryOptions {
    pub fn builder() -> QueryOptionsBuilder {
        QueryOptionsBuilder::default()
    }

    /// Options for a query polled every `interval` while subscribed.
    pub fn polling(interval: Duration) -> Self {
        Self::builder().refresh_interval(interval).build()
    }

    /// Options for a stale-while-revalidate query.
    pub fn revalidating(stale_after: Duration) -> Self {
        Self::builder().stale_after(stale_after).build()
    }

    /// Whether data fetched at `age` ago should be refreshed.
    pub fn is_stale(&self, age: Duration) -> bool {
        self.stale_after.is_some_and(|limit| age > limit)
    }
}

/// Builder for [`QueryOptions`].
#[derive(Debug, Default)]
pub struct QueryOptionsBuilder {
    options: QueryOptions,
}

impl QueryOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stale_after(mut self, duration: Duration) -> Self {
        self.options.stale_after = Some(duration);
        self
    }

    /// Sets the polling cadence. A zero interval disables polling.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.options.refresh_interval = Some(interval).filter(|d| !d.is_zero());
        self
    }

    pub fn stale_after_opt(mut self, duration: Option<Duration>) -> Self {
        self.options.stale_after = duration;
        self
    }

    pub fn build(self) -> QueryOptions {
        self.options
    }
}
