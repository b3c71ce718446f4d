//! KPI summary ("KPF") for a branch and date range

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Upsell item counts reported alongside the KPI summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upsells {
    #[serde(default)]
    pub uzvar_qty: Decimal,
    #[serde(default)]
    pub sauce_qty: Decimal,
    #[serde(default)]
    pub bread_qty: Decimal,
}

/// Headline metrics for one branch over one date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpfSummary {
    pub revenue_total: Decimal,
    pub revenue_delivery: Decimal,
    pub revenue_hall: Decimal,
    pub labor_cost_total: Decimal,
    #[serde(default)]
    pub kitchen_labor_cost: Decimal,
    #[serde(default)]
    pub hall_labor_cost: Decimal,
    pub writeoff_total: Decimal,
    /// Labor cost as a percentage of revenue.
    pub lc_percent: Decimal,
    /// Kitchen labor cost as a percentage of revenue.
    pub kc_percent: Decimal,
    #[serde(default)]
    pub khinkali_count: Decimal,
    #[serde(default)]
    pub upsells: Option<Upsells>,
    #[serde(default)]
    pub cogs_percent: Option<Decimal>,
}
