//! Consumption analyses over a normalized table.
//!
//! The four [`Aggregator`]s (vendor, location, batch variability and
//! combined) make up the material-consumption response; `patterns` and
//! `shelf_life` are standalone reports over a whole upload.

pub mod analyzer;
pub mod batch;
pub mod combined;
pub mod location;
pub mod patterns;
pub mod shelf_life;
pub mod types;
pub mod utility;
pub mod vendor;

use serde::Serialize;
use std::cmp::Ordering;

use crate::error::{PipelineError, Result};
use crate::table::{Column, Table};

pub use batch::BatchVariabilityAnalysis;
pub use combined::CombinedAnalysis;
pub use location::LocationConsumptionAnalysis;
pub use vendor::VendorConsumptionAnalysis;

/// Named summary collections produced by one aggregator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    sections: Vec<(&'static str, serde_json::Value)>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a section of rows under `name`.
    pub fn section<T: Serialize>(mut self, name: &'static str, rows: &[T]) -> Result<Self> {
        self.sections.push((name, serde_json::to_value(rows)?));
        Ok(self)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&'static str, &serde_json::Value)> {
        self.sections.iter().map(|(name, rows)| (*name, rows))
    }

    pub fn into_sections(self) -> impl Iterator<Item = (&'static str, serde_json::Value)> {
        self.sections.into_iter()
    }
}

/// A pure analysis of one partition.
pub trait Aggregator: Send + Sync {
    /// Prefix applied to every section key this aggregator emits.
    fn name(&self) -> &'static str;

    /// Section names emitted on success, and emitted empty on failure.
    fn sections(&self) -> &'static [&'static str];

    /// # Errors
    ///
    /// [`PipelineError::MissingExpectedColumn`] if a required column is absent.
    fn aggregate(&self, table: &Table) -> Result<Summary>;
}

/// The aggregators behind the material-consumption response, in merge order.
pub fn consumption_aggregators() -> [&'static dyn Aggregator; 4] {
    [
        &VendorConsumptionAnalysis,
        &LocationConsumptionAnalysis,
        &BatchVariabilityAnalysis,
        &CombinedAnalysis,
    ]
}

/// Looks up a column an aggregator cannot work without.
pub(crate) fn require<'a>(
    table: &'a Table,
    aggregator: &'static str,
    column: &'static str,
) -> Result<&'a Column> {
    table
        .column(column)
        .ok_or(PipelineError::MissingExpectedColumn { aggregator, column })
}

/// Descending by quantity, then ascending by key.
pub(crate) fn by_total_desc(a_total: f64, a_key: &str, b_total: f64, b_key: &str) -> Ordering {
    b_total.total_cmp(&a_total).then_with(|| a_key.cmp(b_key))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::columns::*;
    use crate::table::{Table, Value};

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    /// A small normalized consumption partition.
    ///
    /// | Material | Vendor | Plant | Site | Batch | Qty | Posted     |
    /// |----------|--------|-------|------|-------|-----|------------|
    /// | M1       | V1     | P1    | S1   | B1    | 5   | 2024-01-05 |
    /// | M1       | V1     | P1    | S1   | B2    | 3   | 2024-01-20 |
    /// | M2       | V2     | P2    | S2   | B3    | 10  | 2024-02-01 |
    /// | M1       | V2     | P1    | S2   | B1    | 4   | 2024-02-03 |
    /// | M2       | V2     | P2    | S2   | B4    | Unk | (null)     |
    pub fn consumption() -> Table {
        let date = |s: &str| {
            Value::Date(
                chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            )
        };
        Table::from_rows(
            [
                MATERIAL_GROUP,
                MATERIAL_NUMBER,
                VENDOR,
                PLANT,
                SITE,
                BATCH,
                QUANTITY,
                POSTING_DATE,
            ],
            vec![
                vec![text("10"), text("M1"), text("V1"), text("P1"), text("S1"), text("B1"), Value::Number(5.0), date("2024-01-05")],
                vec![text("10"), text("M1"), text("V1"), text("P1"), text("S1"), text("B2"), Value::Number(3.0), date("2024-01-20")],
                vec![text("10"), text("M2"), text("V2"), text("P2"), text("S2"), text("B3"), Value::Number(10.0), date("2024-02-01")],
                vec![text("10"), text("M1"), text("V2"), text("P1"), text("S2"), text("B1"), Value::Number(4.0), date("2024-02-03")],
                vec![text("10"), text("M2"), text("V2"), text("P2"), text("S2"), text("B4"), text(UNKNOWN), Value::NullDate],
            ],
        )
    }
}
