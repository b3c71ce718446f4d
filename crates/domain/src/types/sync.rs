//! Backend sync status and manual sync trigger

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::serde_time;

/// State of the most recent backend sync batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Pending,
    Running,
    Success,
    Failed,
    #[serde(other)]
    Unknown,
}

impl SyncState {
    /// True once the batch can no longer change state.
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// Latest sync batch as reported by `/sync/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub batch_id: String,
    pub sync_type: String,
    pub status: SyncState,
    pub records_processed: i64,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(with = "serde_time")]
    pub started_at: DateTime<Utc>,
    #[serde(default, with = "serde_time::option")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncStatus {
    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }
}

/// Body of `POST /sync/trigger`; both bounds are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTriggerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
}

/// Acknowledgement returned by `POST /sync/trigger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTriggerResponse {
    pub sync_batch_id: String,
    pub message: String,
}
