//! Subscription handles

use std::fmt;

/// Handle keeping a listener attached to a cache key.
///
/// Dropping the handle detaches the listener. When the last listener of a
/// polled key detaches, its refresh timer stops.
#[must_use = "dropping a Subscription detaches its listener immediately"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new(detach: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self { detach: Some(Box::new(detach)) }
    }

    /// Detaches the listener now.
    pub fn unsubscribe(mut self) {
        self.run_detach();
    }

    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    fn run_detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("active", &self.is_active()).finish()
    }
}
