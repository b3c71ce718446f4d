//! Domain types and models
//!
//! Shapes returned by the metrics API. Monetary amounts, hours and
//! percentages are exact decimals; the API may send them as JSON numbers or
//! as decimal strings and both are accepted.

pub mod branch;
pub mod kpf;
pub mod labor;
pub mod revenue;
pub mod sync;
pub mod writeoff;

pub use branch::Branch;
pub use kpf::{KpfSummary, Upsells};
pub use labor::{LaborGroup, LaborRecord};
pub use revenue::RevenueRow;
pub use sync::{SyncState, SyncStatus, SyncTriggerRequest, SyncTriggerResponse};
pub use writeoff::{WriteoffCategory, WriteoffRow, WriteoffSummaryRow};
