use crate::table::Column;

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// Standard deviation relative to the mean; `None` when the mean is zero.
pub fn coefficient_of_variation(stddev: f64, mean: f64) -> Option<f64> {
    (mean != 0.0).then(|| stddev / mean)
}

/// Fraction of `total` taken by `part`, 0.0 when the total is zero.
pub fn share(part: f64, total: f64) -> f64 {
    if total == 0.0 { 0.0 } else { part / total }
}

/// Running quantity total for a group of rows.
///
/// Every row counts as a transaction; only numeric quantities add to the
/// total, so sentinel cells never poison a sum.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Tally {
    pub total: f64,
    pub transactions: usize,
    pub quantified: usize,
}

impl Tally {
    /// Tallies `quantity` over `rows`.
    pub fn over(quantity: &Column, rows: &[usize]) -> Self {
        let mut tally = Tally::default();
        for &row in rows {
            tally.add(quantity.get(row).and_then(|v| v.as_number()));
        }
        tally
    }

    /// Tallies every row of `quantity`.
    pub fn over_column(quantity: &Column) -> Self {
        let mut tally = Tally::default();
        for value in quantity.numbers() {
            tally.add(value);
        }
        tally
    }

    pub fn add(&mut self, quantity: Option<f64>) {
        self.transactions += 1;
        if let Some(q) = quantity {
            self.total += q;
            self.quantified += 1;
        }
    }

    /// Mean quantity per quantified row.
    pub fn average(&self) -> f64 {
        if self.quantified == 0 {
            0.0
        } else {
            self.total / self.quantified as f64
        }
    }
}
