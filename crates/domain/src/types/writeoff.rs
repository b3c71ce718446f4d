//! Write-off rows and categories

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::impl_key_conversions;

/// Write-off categories the backend maps articles into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteoffCategory {
    Spoilage,
    Marketing,
    Other,
}

impl_key_conversions!(WriteoffCategory {
    Spoilage => "spoilage",
    Marketing => "marketing",
    Other => "other",
});

impl WriteoffCategory {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Spoilage => "Бракераж",
            Self::Marketing => "Маркетинг",
            Self::Other => "Прочее",
        }
    }

    /// Display label for a raw category key; unknown keys are shown as-is.
    pub fn label_for(key: &str) -> &str {
        key.parse::<Self>().map_or(key, |category| category.label())
    }
}

/// One written-off article on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteoffRow {
    pub date: NaiveDate,
    #[serde(alias = "account_name")]
    pub article_name: String,
    pub category: String,
    pub amount: Decimal,
}

impl WriteoffRow {
    pub fn category_label(&self) -> &str {
        WriteoffCategory::label_for(&self.category)
    }
}

/// Write-off total for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteoffSummaryRow {
    pub category: String,
    pub total_amount: Decimal,
}
