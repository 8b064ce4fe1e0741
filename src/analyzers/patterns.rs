//! Overall consumption patterns: which materials move most often and in the
//! largest quantities.

use std::collections::HashMap;

use crate::analyzers::by_total_desc;
use crate::analyzers::types::{ConsumptionPatterns, MaterialRank, MaterialSpread};
use crate::analyzers::utility::{Tally, mean, stddev};
use crate::columns::MATERIAL_NUMBER;
use crate::table::{Column, Table};

/// Ranks materials by transaction count and by the total of
/// `quantity_column` (`Quantity` for consumption exports, `Order Quantity`
/// for order placement).
///
/// Both rankings are truncated to `top_n` entries (`None` keeps every
/// material), and `spread` lists the individual quantities of the materials
/// in the consumption ranking. Without a `Material Number` column the
/// rankings are empty.
#[tracing::instrument(skip(table), fields(rows = table.len()))]
pub fn consumption_patterns(
    table: &Table,
    quantity_column: &str,
    top_n: Option<usize>,
) -> ConsumptionPatterns {
    let quantity = table.column(quantity_column);
    let overall = quantity.map(Tally::over_column).unwrap_or_default();

    let groups = table.group_by(&[MATERIAL_NUMBER]).unwrap_or_default();
    let tallies: Vec<(String, Tally)> = groups
        .iter()
        .map(|group| {
            let tally = match quantity {
                Some(q) => Tally::over(q, &group.rows),
                None => Tally {
                    transactions: group.rows.len(),
                    ..Tally::default()
                },
            };
            (group.key.concat(), tally)
        })
        .collect();

    let rank = |value: fn(&Tally) -> f64| {
        let mut ranked: Vec<MaterialRank> = tallies
            .iter()
            .map(|(material, tally)| MaterialRank {
                material: material.clone(),
                value: value(tally),
            })
            .collect();
        ranked.sort_by(|a, b| by_total_desc(a.value, &a.material, b.value, &b.material));
        if let Some(n) = top_n {
            ranked.truncate(n);
        }
        ranked
    };

    let top_by_consumption = rank(|t| t.total.abs());

    let rows_by_material: HashMap<&str, &[usize]> = tallies
        .iter()
        .zip(&groups)
        .map(|((material, _), group)| (material.as_str(), group.rows.as_slice()))
        .collect();
    let spread = top_by_consumption
        .iter()
        .map(|r| {
            let rows = rows_by_material.get(r.material.as_str()).copied().unwrap_or_default();
            material_spread(&r.material, quantity, rows)
        })
        .collect();

    ConsumptionPatterns {
        quantity_column: quantity_column.to_string(),
        materials: tallies.len(),
        transactions: table.len(),
        total_quantity: overall.total,
        top_by_transactions: rank(|t| t.transactions as f64),
        top_by_consumption,
        spread,
    }
}

/// Numeric quantities of `rows` in row order; sentinel cells are skipped.
fn material_spread(material: &str, quantity: Option<&Column>, rows: &[usize]) -> MaterialSpread {
    let values: Vec<f64> = quantity
        .map(|q| rows.iter().filter_map(|&row| q.get(row)?.as_number()).collect())
        .unwrap_or_default();
    let avg = mean(&values);
    MaterialSpread {
        material: material.to_string(),
        std_dev: stddev(&values, avg),
        mean: avg,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::fixtures;
    use crate::columns::{ORDER_QUANTITY, QUANTITY};
    use crate::table::Value;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_rankings() {
        let patterns = consumption_patterns(&fixtures::consumption(), QUANTITY, None);

        assert_eq!(patterns.quantity_column, "Quantity");
        assert_eq!(patterns.materials, 2);
        assert_eq!(patterns.transactions, 5);
        assert_eq!(patterns.total_quantity, 22.0);

        let by_tx: Vec<_> = patterns
            .top_by_transactions
            .iter()
            .map(|r| (r.material.as_str(), r.value))
            .collect();
        assert_eq!(by_tx, vec![("M1", 3.0), ("M2", 2.0)]);

        let by_qty: Vec<_> = patterns
            .top_by_consumption
            .iter()
            .map(|r| (r.material.as_str(), r.value))
            .collect();
        assert_eq!(by_qty, vec![("M1", 12.0), ("M2", 10.0)]);
    }

    #[test]
    fn test_spread_follows_consumption_ranking() {
        let patterns = consumption_patterns(&fixtures::consumption(), QUANTITY, None);

        // M1: 5, 3, 4 -> mean 4; M2: 10 plus a sentinel cell that is skipped
        assert_eq!(patterns.spread.len(), 2);
        assert_eq!(patterns.spread[0].material, "M1");
        assert_eq!(patterns.spread[0].values, vec![5.0, 3.0, 4.0]);
        assert_eq!(patterns.spread[0].mean, 4.0);
        assert_eq!(patterns.spread[0].std_dev, (2.0f64 / 3.0).sqrt());
        assert_eq!(patterns.spread[1].values, vec![10.0]);
        assert_eq!(patterns.spread[1].std_dev, 0.0);
    }

    #[test]
    fn test_top_n_truncates() {
        let patterns = consumption_patterns(&fixtures::consumption(), QUANTITY, Some(1));
        assert_eq!(patterns.top_by_transactions.len(), 1);
        assert_eq!(patterns.top_by_consumption.len(), 1);
        assert_eq!(patterns.spread.len(), 1);
        assert_eq!(patterns.materials, 2);
    }

    #[test]
    fn test_order_quantity_column() {
        let table = Table::from_rows(
            [MATERIAL_NUMBER, QUANTITY, ORDER_QUANTITY],
            vec![
                vec![text("M1"), Value::Number(1.0), Value::Number(50.0)],
                vec![text("M2"), Value::Number(9.0), Value::Number(20.0)],
                vec![text("M2"), Value::Number(9.0), Value::Null],
            ],
        );
        let patterns = consumption_patterns(&table, ORDER_QUANTITY, None);

        assert_eq!(patterns.quantity_column, "Order Quantity");
        assert_eq!(patterns.total_quantity, 70.0);
        assert_eq!(patterns.top_by_consumption[0].material, "M1");
        assert_eq!(patterns.top_by_consumption[0].value, 50.0);
        assert_eq!(patterns.spread[1].values, vec![20.0]);
    }

    #[test]
    fn test_without_quantity_column() {
        let table = Table::from_rows(
            [MATERIAL_NUMBER],
            vec![vec![text("M1")], vec![text("M1")]],
        );
        let patterns = consumption_patterns(&table, QUANTITY, None);
        assert_eq!(patterns.top_by_transactions[0].value, 2.0);
        assert_eq!(patterns.top_by_consumption[0].value, 0.0);
        assert_eq!(patterns.total_quantity, 0.0);
        assert!(patterns.spread[0].values.is_empty());
    }

    #[test]
    fn test_without_material_column() {
        let table = Table::from_rows([QUANTITY], vec![vec![Value::Number(1.0)]]);
        let patterns = consumption_patterns(&table, QUANTITY, Some(5));
        assert_eq!(patterns.materials, 0);
        assert!(patterns.top_by_transactions.is_empty());
        assert!(patterns.spread.is_empty());
        assert_eq!(patterns.transactions, 1);
    }
}
