//! Grouping and subtotals for labor reports
//!
//! Turns the flat labor list returned by the API into report sections:
//! group header, rows, subtotal, then a grand total. Sums are exact decimal
//! sums with no intermediate rounding, so the grand total always equals both
//! the sum of the section subtotals and the sum over the input records.
//! Sums beyond the `Decimal` range saturate at its bounds.

use std::collections::HashMap;

use kpfdash_domain::{LaborGroup, LaborRecord};
use rust_decimal::Decimal;
use serde::Serialize;

/// One group of the report with its subtotals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSection {
    /// Group key as sent by the API (`other` for records without one).
    pub key: String,
    pub label: String,
    /// Records of this group in their original relative order.
    pub rows: Vec<LaborRecord>,
    pub total_hours: Decimal,
    pub total_cost: Decimal,
}

impl GroupSection {
    fn new(key: &str, rows: Vec<LaborRecord>) -> Self {
        let total_hours = saturating_sum(rows.iter().map(|row| row.total_hours));
        let total_cost = saturating_sum(rows.iter().map(|row| row.labor_cost));
        Self {
            key: key.to_string(),
            label: LaborGroup::label_for(key).to_string(),
            rows,
            total_hours,
            total_cost,
        }
    }
}

/// Labor records grouped into ordered sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupedReport {
    pub sections: Vec<GroupSection>,
    pub grand_total_hours: Decimal,
    pub grand_total_cost: Decimal,
}

impl GroupedReport {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, key: &str) -> Option<&GroupSection> {
        self.sections.iter().find(|section| section.key == key)
    }

    pub fn row_count(&self) -> usize {
        self.sections.iter().map(|section| section.rows.len()).sum()
    }
}

/// Groups `records` into report sections.
///
/// Sections come in the fixed order kitchen, hall, other (skipping empty
/// ones), followed by any other groups in order of first appearance.
/// Records without a group, or with a blank one, land in `other`; any other
/// value is matched exactly and gets a section of its own.
pub fn group(records: &[LaborRecord]) -> GroupedReport {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<(&str, Vec<LaborRecord>)> = Vec::new();

    for record in records {
        let key = record.group_key();
        let slot = *index.entry(key).or_insert_with(|| {
            buckets.push((key, Vec::new()));
            buckets.len() - 1
        });
        buckets[slot].1.push(record.clone());
    }

    // Stable: groups outside the fixed set keep first-seen order.
    buckets.sort_by_key(|(key, _)| canonical_rank(key));

    let sections: Vec<GroupSection> =
        buckets.into_iter().map(|(key, rows)| GroupSection::new(key, rows)).collect();
    let grand_total_hours = saturating_sum(sections.iter().map(|section| section.total_hours));
    let grand_total_cost = saturating_sum(sections.iter().map(|section| section.total_cost));

    GroupedReport { sections, grand_total_hours, grand_total_cost }
}

fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

fn canonical_rank(key: &str) -> usize {
    LaborGroup::CANONICAL
        .iter()
        .position(|group| group.as_str() == key)
        .unwrap_or(LaborGroup::CANONICAL.len())
}
