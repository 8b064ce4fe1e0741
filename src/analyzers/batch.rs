//! Variability of consumption across batches of the same material.

use crate::analyzers::types::{BatchConsumption, BatchVariability};
use crate::analyzers::utility::{Tally, coefficient_of_variation, mean, stddev};
use crate::analyzers::{Aggregator, Summary, require};
use crate::columns::{BATCH, MATERIAL_NUMBER, QUANTITY};
use crate::error::Result;
use crate::table::{Table, group_indices};

pub struct BatchVariabilityAnalysis;

impl Aggregator for BatchVariabilityAnalysis {
    fn name(&self) -> &'static str {
        "batch_variability"
    }

    fn sections(&self) -> &'static [&'static str] {
        &["batches", "summary"]
    }

    fn aggregate(&self, table: &Table) -> Result<Summary> {
        let quantity = require(table, self.name(), QUANTITY)?;
        require(table, self.name(), MATERIAL_NUMBER)?;
        require(table, self.name(), BATCH)?;

        let batches: Vec<BatchConsumption> = table
            .group_by(&[MATERIAL_NUMBER, BATCH])
            .unwrap_or_default()
            .into_iter()
            .map(|group| {
                let tally = Tally::over(quantity, &group.rows);
                let [material, batch]: [String; 2] = group.key.try_into().unwrap_or_default();
                BatchConsumption {
                    material,
                    batch,
                    total_quantity: tally.total,
                    transactions: tally.transactions,
                    quantified: tally.quantified,
                }
            })
            .collect();

        let summary = variability(&batches);

        Summary::new()
            .section("batches", &batches)?
            .section("summary", &summary)
    }
}

/// Dispersion of batch totals per material, most variable first.
///
/// Batches without a single numeric quantity carry no measurement and are
/// left out; a material with no measured batch gets no row.
fn variability(batches: &[BatchConsumption]) -> Vec<BatchVariability> {
    let measured: Vec<&BatchConsumption> = batches.iter().filter(|b| b.quantified > 0).collect();
    let mut rows: Vec<BatchVariability> =
        group_indices(measured.iter().map(|b| b.material.as_str()))
            .into_iter()
            .map(|(material, indices)| {
                let totals: Vec<f64> =
                    indices.iter().map(|&i| measured[i].total_quantity).collect();
                let avg = mean(&totals);
                let sd = stddev(&totals, avg);
                BatchVariability {
                    material: material.to_string(),
                    batches: totals.len(),
                    mean: avg,
                    std_dev: sd,
                    coefficient_of_variation: coefficient_of_variation(sd, avg),
                    min: totals.iter().copied().fold(f64::INFINITY, f64::min),
                    max: totals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                }
            })
            .collect();

    // Highest CV first; materials without a CV go last.
    rows.sort_by(|a, b| {
        let a_cv = a.coefficient_of_variation.unwrap_or(f64::NEG_INFINITY);
        let b_cv = b.coefficient_of_variation.unwrap_or(f64::NEG_INFINITY);
        b_cv.total_cmp(&a_cv).then_with(|| a.material.cmp(&b.material))
    });
    rows
}
