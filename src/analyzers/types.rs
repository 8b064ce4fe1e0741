//! Row types emitted by the aggregators.

use serde::Serialize;

/// Consumption attributed to one vendor within a partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorConsumption {
    pub vendor: String,
    pub total_quantity: f64,
    pub transactions: usize,
    /// Distinct material numbers supplied by the vendor.
    pub materials: usize,
    pub avg_quantity: f64,
    /// Fraction of the partition's total quantity.
    pub share: f64,
}

/// Consumption for one vendor and material pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorMaterialConsumption {
    pub vendor: String,
    pub material: String,
    pub total_quantity: f64,
    pub transactions: usize,
}

/// Consumption at one plant or site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationConsumption {
    pub location: String,
    pub total_quantity: f64,
    pub transactions: usize,
    pub avg_quantity: f64,
    pub share: f64,
}

/// Total quantity drawn from one batch of a material.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchConsumption {
    pub material: String,
    pub batch: String,
    pub total_quantity: f64,
    pub transactions: usize,
    /// Rows whose quantity was numeric.
    pub quantified: usize,
}

/// Dispersion of per-batch totals for one material.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchVariability {
    pub material: String,
    pub batches: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// `None` when the mean is zero.
    pub coefficient_of_variation: Option<f64>,
    pub min: f64,
    pub max: f64,
}

/// Consumption for one material, vendor and plant combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedConsumption {
    pub material: String,
    pub vendor: String,
    pub plant: String,
    pub total_quantity: f64,
    pub transactions: usize,
}

/// Consumption of one material in one calendar month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyConsumption {
    pub month: String,
    pub material: String,
    pub total_quantity: f64,
    pub transactions: usize,
}

/// One entry of a material ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialRank {
    pub material: String,
    pub value: f64,
}

/// Overall consumption patterns across an upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumptionPatterns {
    /// Column the quantities were read from.
    pub quantity_column: String,
    pub materials: usize,
    pub transactions: usize,
    pub total_quantity: f64,
    pub top_by_transactions: Vec<MaterialRank>,
    pub top_by_consumption: Vec<MaterialRank>,
    /// Per-row quantity spread of the materials in `top_by_consumption`.
    pub spread: Vec<MaterialSpread>,
}

/// Individual quantities of one material and their dispersion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialSpread {
    pub material: String,
    pub values: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
}

/// Remaining shelf life of one consumption row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShelfLifeEntry {
    pub material: String,
    pub batch: String,
    pub remaining_days: i64,
}

/// Count of rows with a given number of remaining shelf-life days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShelfLifeBucket {
    pub days: i64,
    pub count: usize,
}

/// Shelf-life distribution across an upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShelfLifeReport {
    pub finite_count: usize,
    /// Rows without a usable best-before date.
    pub infinite_count: usize,
    pub min_days: Option<i64>,
    pub max_days: Option<i64>,
    pub mean_days: Option<f64>,
    pub histogram: Vec<ShelfLifeBucket>,
    pub finite: Vec<ShelfLifeEntry>,
}
