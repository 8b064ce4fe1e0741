//! Consumption broken down by plant and site.

use crate::analyzers::types::LocationConsumption;
use crate::analyzers::utility::{Tally, share};
use crate::analyzers::{Aggregator, Summary, by_total_desc, require};
use crate::columns::{PLANT, QUANTITY, SITE};
use crate::error::Result;
use crate::table::{Column, Table};

pub struct LocationConsumptionAnalysis;

impl Aggregator for LocationConsumptionAnalysis {
    fn name(&self) -> &'static str {
        "location_consumption"
    }

    fn sections(&self) -> &'static [&'static str] {
        &["by_plant", "by_site"]
    }

    fn aggregate(&self, table: &Table) -> Result<Summary> {
        let quantity = require(table, self.name(), QUANTITY)?;
        require(table, self.name(), PLANT)?;

        let by_plant = by_location(table, quantity, PLANT);
        let by_site = by_location(table, quantity, SITE);

        Summary::new()
            .section("by_plant", &by_plant)?
            .section("by_site", &by_site)
    }
}

/// Per-location totals, largest first. Empty if `column` is absent.
fn by_location(table: &Table, quantity: &Column, column: &str) -> Vec<LocationConsumption> {
    let grand_total = Tally::over_column(quantity).total;

    let mut rows: Vec<LocationConsumption> = table
        .group_by(&[column])
        .unwrap_or_default()
        .into_iter()
        .map(|group| {
            let tally = Tally::over(quantity, &group.rows);
            LocationConsumption {
                location: group.key.concat(),
                total_quantity: tally.total,
                transactions: tally.transactions,
                avg_quantity: tally.average(),
                share: share(tally.total, grand_total),
            }
        })
        .collect();
    rows.sort_by(|a, b| by_total_desc(a.total_quantity, &a.location, b.total_quantity, &b.location));
    rows
}
