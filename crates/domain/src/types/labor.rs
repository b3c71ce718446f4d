//! Labor records and their staff groups

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::FALLBACK_LABOR_GROUP;
use crate::impl_key_conversions;

/// Staff groups with a fixed place in labor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaborGroup {
    Kitchen,
    Hall,
    Other,
}

impl_key_conversions!(LaborGroup {
    Kitchen => "kitchen",
    Hall => "hall",
    Other => "other",
});

impl LaborGroup {
    /// Report order of the fixed groups.
    pub const CANONICAL: [Self; 3] = [Self::Kitchen, Self::Hall, Self::Other];

    /// Display label used in report headers.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Kitchen => "Кухня",
            Self::Hall => "Зал",
            Self::Other => "Прочее",
        }
    }

    /// Matches an exact wire key; `None` for groups outside the fixed set.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::CANONICAL.into_iter().find(|group| group.as_str() == key)
    }

    /// Label for any group key; groups outside the fixed set label as
    /// themselves.
    pub fn label_for(key: &str) -> &str {
        Self::from_key(key).map_or(key, |group| group.label())
    }
}

/// Hours and cost for one employee over the queried range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborRecord {
    pub employee_name: String,
    #[serde(default)]
    pub role_name: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    pub total_hours: Decimal,
    pub hourly_rate: Decimal,
    pub labor_cost: Decimal,
}

impl LaborRecord {
    /// Group key used for bucketing; absent or blank groups fall back to
    /// `other`.
    pub fn group_key(&self) -> &str {
        match self.group.as_deref().map(str::trim) {
            Some(group) if !group.is_empty() => group,
            _ => FALLBACK_LABOR_GROUP,
        }
    }
}
