//! Revenue rows

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Revenue for one day and order type, optionally broken down by item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueRow {
    pub date: NaiveDate,
    pub order_type: String,
    pub order_type_detail: String,
    pub revenue_amount: Decimal,
    pub order_count: i64,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub item_quantity: Option<Decimal>,
    /// Quantity after unit normalisation (a dozen-pack counts as 12).
    #[serde(default)]
    pub item_quantity_adjusted: Option<Decimal>,
}
