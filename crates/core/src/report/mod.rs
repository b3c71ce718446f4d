//! Labor report grouping

mod grouping;

pub use grouping::{group, GroupSection, GroupedReport};
