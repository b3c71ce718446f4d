//! Query identities and request parameters
//!
//! A [`QueryKey`] names one cacheable query: the resource being read plus the
//! parameters it was read with. Parameters live in a `BTreeMap`, so two keys
//! built from the same values in a different order compare and hash equal.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_RANGE_END_DAYS_AGO, DEFAULT_RANGE_START_DAYS_AGO, PARAM_BRANCH_ID, PARAM_DATE_FROM,
    PARAM_DATE_TO,
};
use crate::errors::{DashboardError, Result};
use crate::impl_key_conversions;

/// Kind of resource served by the metrics API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Kpi,
    Revenue,
    Labor,
    Writeoffs,
    WriteoffSummary,
    SyncStatus,
    Branches,
}

impl_key_conversions!(ResourceKind {
    Kpi => "kpi",
    Revenue => "revenue",
    Labor => "labor",
    Writeoffs => "writeoffs",
    WriteoffSummary => "writeoff_summary",
    SyncStatus => "sync_status",
    Branches => "branches",
});

impl ResourceKind {
    /// Path below the API base path.
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Kpi => "/dashboard/kpf",
            Self::Revenue => "/revenue",
            Self::Labor => "/labor",
            Self::Writeoffs => "/writeoffs",
            Self::WriteoffSummary => "/writeoffs/summary",
            Self::SyncStatus => "/sync/status",
            Self::Branches => "/branches",
        }
    }

    /// Whether the resource is parameterised by branch and date range.
    pub const fn is_ranged(&self) -> bool {
        !matches!(self, Self::SyncStatus | Self::Branches)
    }
}

/// Identity of one cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    resource: ResourceKind,
    params: BTreeMap<String, String>,
}

impl QueryKey {
    /// Key for an unparameterised resource.
    pub fn new(resource: ResourceKind) -> Self {
        Self { resource, params: BTreeMap::new() }
    }

    /// Key for a branch/date-range resource.
    pub fn ranged(resource: ResourceKind, params: &DashboardParams) -> Self {
        params
            .query_pairs()
            .into_iter()
            .fold(Self::new(resource), |key, (name, value)| key.with_param(name, value))
    }

    /// Adds or replaces one parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    pub fn resource(&self) -> ResourceKind {
        self.resource
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource)?;
        if self.params.is_empty() {
            return Ok(());
        }
        f.write_str("{")?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str("}")
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    date_from: NaiveDate,
    date_to: NaiveDate,
}

/// Unchecked wire form of [`DateRange`].
#[derive(Deserialize)]
struct RawDateRange {
    date_from: NaiveDate,
    date_to: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = DashboardError;

    fn try_from(raw: RawDateRange) -> Result<Self> {
        Self::new(raw.date_from, raw.date_to)
    }
}

impl DateRange {
    /// Builds a range, rejecting `date_from` after `date_to`.
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> Result<Self> {
        if date_from > date_to {
            return Err(DashboardError::InvalidInput(format!(
                "date_from {date_from} is after date_to {date_to}"
            )));
        }
        Ok(Self { date_from, date_to })
    }

    /// The dashboard's initial selection: the seven days ending yesterday.
    pub fn last_week(today: NaiveDate) -> Self {
        Self {
            date_from: today - Duration::days(DEFAULT_RANGE_START_DAYS_AGO),
            date_to: today - Duration::days(DEFAULT_RANGE_END_DAYS_AGO),
        }
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self { date_from: day, date_to: day }
    }

    pub fn date_from(&self) -> NaiveDate {
        self.date_from
    }

    pub fn date_to(&self) -> NaiveDate {
        self.date_to
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.date_to - self.date_from).num_days() + 1
    }
}

/// Branch and date range shared by every ranged query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DashboardParams {
    pub branch_id: i64,
    pub range: DateRange,
}

impl DashboardParams {
    pub fn new(branch_id: i64, range: DateRange) -> Self {
        Self { branch_id, range }
    }

    /// Query-string pairs in wire format (`YYYY-MM-DD` dates).
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (PARAM_BRANCH_ID, self.branch_id.to_string()),
            (PARAM_DATE_FROM, self.range.date_from.format("%Y-%m-%d").to_string()),
            (PARAM_DATE_TO, self.range.date_to.format("%Y-%m-%d").to_string()),
        ]
    }
}
