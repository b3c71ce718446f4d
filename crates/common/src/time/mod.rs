//! Time abstractions
//!
//! The query cache measures data age through [`Clock`] so staleness can be
//! tested without waiting. Timer-driven behaviour (polling) uses Tokio time
//! and is tested with a paused runtime instead.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use kpfdash_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.now().duration_since(start), Duration::from_secs(5));
//! ```

mod clock;

pub use clock::{Clock, MockClock, SystemClock};
