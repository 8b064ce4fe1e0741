//! Cross-cutting view combining material, vendor, plant and posting month.

use crate::analyzers::types::{CombinedConsumption, MonthlyConsumption};
use crate::analyzers::utility::Tally;
use crate::analyzers::{Aggregator, Summary, require};
use crate::columns::{MATERIAL_NUMBER, PLANT, POSTING_DATE, QUANTITY, UNKNOWN, VENDOR};
use crate::error::Result;
use crate::table::{Column, Table, group_indices};

pub struct CombinedAnalysis;

impl Aggregator for CombinedAnalysis {
    fn name(&self) -> &'static str {
        "combined_analysis"
    }

    fn sections(&self) -> &'static [&'static str] {
        &["summary", "monthly"]
    }

    fn aggregate(&self, table: &Table) -> Result<Summary> {
        let quantity = require(table, self.name(), QUANTITY)?;
        let material = require(table, self.name(), MATERIAL_NUMBER)?;
        let vendor = table.column(VENDOR);
        let plant = table.column(PLANT);

        let keys = (0..table.len()).map(|row| {
            (
                key_at(Some(material), row),
                key_at(vendor, row),
                key_at(plant, row),
            )
        });
        let mut summary: Vec<CombinedConsumption> = group_indices(keys)
            .into_iter()
            .map(|((material, vendor, plant), rows)| {
                let tally = Tally::over(quantity, &rows);
                CombinedConsumption {
                    material,
                    vendor,
                    plant,
                    total_quantity: tally.total,
                    transactions: tally.transactions,
                }
            })
            .collect();
        summary.sort_by(|a, b| {
            b.total_quantity
                .total_cmp(&a.total_quantity)
                .then_with(|| a.material.cmp(&b.material))
                .then_with(|| a.vendor.cmp(&b.vendor))
                .then_with(|| a.plant.cmp(&b.plant))
        });

        let monthly = table
            .column(POSTING_DATE)
            .map(|posted| monthly(quantity, material, posted))
            .unwrap_or_default();

        Summary::new()
            .section("summary", &summary)?
            .section("monthly", &monthly)
    }
}

/// Cell key, or the sentinel when the column is absent.
fn key_at(column: Option<&Column>, row: usize) -> String {
    column
        .and_then(|c| c.get(row))
        .map(|v| v.group_key())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Per month and material totals; rows without a posting date are skipped.
fn monthly(quantity: &Column, material: &Column, posted: &Column) -> Vec<MonthlyConsumption> {
    let keys = posted.dates().enumerate().map(|(row, date)| {
        date.map(|d| (d.format("%Y-%m").to_string(), key_at(Some(material), row)))
    });

    let mut rows: Vec<MonthlyConsumption> = group_indices(keys)
        .into_iter()
        .filter_map(|(key, rows)| {
            let (month, material) = key?;
            let tally = Tally::over(quantity, &rows);
            Some(MonthlyConsumption {
                month,
                material,
                total_quantity: tally.total,
                transactions: tally.transactions,
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        a.month
            .cmp(&b.month)
            .then_with(|| b.total_quantity.total_cmp(&a.total_quantity))
            .then_with(|| a.material.cmp(&b.material))
    });
    rows
}
