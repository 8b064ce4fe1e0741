//! Consumption broken down by vendor.

use std::collections::HashSet;

use crate::analyzers::types::{VendorConsumption, VendorMaterialConsumption};
use crate::analyzers::utility::{Tally, share};
use crate::analyzers::{Aggregator, Summary, by_total_desc, require};
use crate::columns::{MATERIAL_NUMBER, QUANTITY, VENDOR};
use crate::error::Result;
use crate::table::Table;

pub struct VendorConsumptionAnalysis;

impl Aggregator for VendorConsumptionAnalysis {
    fn name(&self) -> &'static str {
        "vendor_consumption"
    }

    fn sections(&self) -> &'static [&'static str] {
        &["summary", "by_material"]
    }

    fn aggregate(&self, table: &Table) -> Result<Summary> {
        let quantity = require(table, self.name(), QUANTITY)?;
        require(table, self.name(), VENDOR)?;

        let grand_total = Tally::over_column(quantity).total;
        let materials = table.column(MATERIAL_NUMBER);

        let mut summary: Vec<VendorConsumption> = table
            .group_by(&[VENDOR])
            .unwrap_or_default()
            .into_iter()
            .map(|group| {
                let tally = Tally::over(quantity, &group.rows);
                let distinct = materials.map_or(0, |m| {
                    group
                        .rows
                        .iter()
                        .filter_map(|&row| m.get(row))
                        .map(|v| v.group_key())
                        .collect::<HashSet<_>>()
                        .len()
                });
                VendorConsumption {
                    vendor: group.key.concat(),
                    total_quantity: tally.total,
                    transactions: tally.transactions,
                    materials: distinct,
                    avg_quantity: tally.average(),
                    share: share(tally.total, grand_total),
                }
            })
            .collect();
        summary.sort_by(|a, b| by_total_desc(a.total_quantity, &a.vendor, b.total_quantity, &b.vendor));

        // Material is optional; without it the breakdown is simply empty.
        let mut by_material: Vec<VendorMaterialConsumption> = table
            .group_by(&[VENDOR, MATERIAL_NUMBER])
            .unwrap_or_default()
            .into_iter()
            .map(|group| {
                let tally = Tally::over(quantity, &group.rows);
                let [vendor, material]: [String; 2] =
                    group.key.try_into().unwrap_or_default();
                VendorMaterialConsumption {
                    vendor,
                    material,
                    total_quantity: tally.total,
                    transactions: tally.transactions,
                }
            })
            .collect();
        by_material.sort_by(|a, b| {
            a.vendor
                .cmp(&b.vendor)
                .then_with(|| b.total_quantity.total_cmp(&a.total_quantity))
                .then_with(|| a.material.cmp(&b.material))
        });

        Summary::new()
            .section("summary", &summary)?
            .section("by_material", &by_material)
    }
}
