//! Remaining shelf life at the time of consumption.

use crate::analyzers::types::{ShelfLifeBucket, ShelfLifeEntry, ShelfLifeReport};
use crate::analyzers::utility::mean;
use crate::columns::{BATCH, MATERIAL_NUMBER, POSTING_DATE, SHELF_LIFE_DATE, UNKNOWN};
use crate::table::{Column, Table, group_indices};

/// Computes `SLED/BBD - Pstng Date` in whole days for every row.
///
/// Rows without a best-before date have an infinite shelf life. Rows with a
/// best-before date but no posting date are left out of both counts.
#[tracing::instrument(skip(table), fields(rows = table.len()))]
pub fn shelf_life_analysis(table: &Table) -> ShelfLifeReport {
    let posted = table.column(POSTING_DATE);
    let expires = table.column(SHELF_LIFE_DATE);
    let material = table.column(MATERIAL_NUMBER);
    let batch = table.column(BATCH);

    let text_at = |column: Option<&Column>, row: usize| {
        column
            .and_then(|c| c.get(row))
            .map(|v| v.group_key())
            .unwrap_or_else(|| UNKNOWN.to_string())
    };

    let mut infinite_count = 0;
    let mut finite = Vec::new();

    for row in 0..table.len() {
        let Some(expiry) = expires.and_then(|c| c.get(row)).and_then(|v| v.as_date()) else {
            infinite_count += 1;
            continue;
        };
        let Some(posting) = posted.and_then(|c| c.get(row)).and_then(|v| v.as_date()) else {
            continue;
        };
        finite.push(ShelfLifeEntry {
            material: text_at(material, row),
            batch: text_at(batch, row),
            remaining_days: (expiry - posting).num_days(),
        });
    }

    let days: Vec<i64> = finite.iter().map(|e| e.remaining_days).collect();
    let mut histogram: Vec<ShelfLifeBucket> = group_indices(days.iter().copied())
        .into_iter()
        .map(|(days, rows)| ShelfLifeBucket {
            days,
            count: rows.len(),
        })
        .collect();
    histogram.sort_by_key(|b| b.days);

    let as_f64: Vec<f64> = days.iter().map(|&d| d as f64).collect();

    ShelfLifeReport {
        finite_count: finite.len(),
        infinite_count,
        min_days: days.iter().copied().min(),
        max_days: days.iter().copied().max(),
        mean_days: (!as_f64.is_empty()).then(|| mean(&as_f64)),
        histogram,
        finite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap())
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_finite_and_infinite_rows() {
        let table = Table::from_rows(
            [MATERIAL_NUMBER, BATCH, POSTING_DATE, SHELF_LIFE_DATE],
            vec![
                vec![text("M1"), text("B1"), date(2024, 1, 1), date(2024, 1, 31)],
                vec![text("M1"), text("B2"), date(2024, 1, 1), Value::NullDate],
                vec![text("M2"), text("B3"), date(2024, 1, 10), date(2024, 2, 9)],
                vec![text("M2"), text("B4"), Value::NullDate, date(2024, 3, 1)],
                vec![text("M3"), text("B5"), date(2024, 2, 1), date(2024, 2, 11)],
            ],
        );
        let report = shelf_life_analysis(&table);

        assert_eq!(report.infinite_count, 1);
        assert_eq!(report.finite_count, 3);
        assert_eq!(report.min_days, Some(10));
        assert_eq!(report.max_days, Some(30));
        assert_eq!(report.mean_days, Some(70.0 / 3.0));
        assert_eq!(
            report.histogram,
            vec![
                ShelfLifeBucket { days: 10, count: 1 },
                ShelfLifeBucket { days: 30, count: 2 },
            ]
        );
        assert_eq!(report.finite[0].material, "M1");
        assert_eq!(report.finite[0].batch, "B1");
    }

    #[test]
    fn test_without_best_before_column() {
        let table = Table::from_rows([POSTING_DATE], vec![vec![date(2024, 1, 1)]]);
        let report = shelf_life_analysis(&table);
        assert_eq!(report.infinite_count, 1);
        assert_eq!(report.finite_count, 0);
        assert_eq!(report.mean_days, None);
        assert!(report.histogram.is_empty());
    }
}
