//! Cached state for one query key

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryStatus {
    /// Never fetched.
    #[default]
    Idle,
    /// A fetch is running.
    Loading,
    /// The last applied fetch succeeded.
    Success,
    /// The last applied fetch failed; any earlier data is still present.
    Error,
}

/// Immutable snapshot of one cache entry.
///
/// `data` is the payload of the last successful fetch. It survives later
/// loading and error transitions and is only ever replaced wholesale by a
/// newer success.
pub struct CacheEntry<V, E> {
    pub(crate) status: QueryStatus,
    pub(crate) data: Option<Arc<V>>,
    pub(crate) error: Option<E>,
    pub(crate) fetched_at: Option<Instant>,
}

impl<V, E> CacheEntry<V, E> {
    /// Internal state machine status.
    pub fn status(&self) -> QueryStatus {
        self.status
    }

    /// Status to present to users.
    ///
    /// A background refresh of an entry that already has data keeps showing
    /// as `Success`; only the first load shows as `Loading`.
    pub fn display_status(&self) -> QueryStatus {
        match self.status {
            QueryStatus::Loading if self.data.is_some() => QueryStatus::Success,
            status => status,
        }
    }

    pub fn data(&self) -> Option<&Arc<V>> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&E> {
        self.error.as_ref()
    }

    pub fn fetched_at(&self) -> Option<Instant> {
        self.fetched_at
    }

    pub fn is_fetching(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

impl<V, E> Default for CacheEntry<V, E> {
    fn default() -> Self {
        Self { status: QueryStatus::Idle, data: None, error: None, fetched_at: None }
    }
}

impl<V, E: Clone> Clone for CacheEntry<V, E> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            fetched_at: self.fetched_at,
        }
    }
}

impl<V: fmt::Debug, E: fmt::Debug> fmt::Debug for CacheEntry<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("status", &self.status)
            .field("data", &self.data)
            .field("error", &self.error)
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}
