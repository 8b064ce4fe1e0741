//! In-memory tabular model for uploaded files.
//!
//! Uploads carry no fixed schema, so a [`Table`] is an ordered list of named
//! [`Column`]s whose cells are tagged [`Value`]s. Row order is the order rows
//! appeared in the source file.

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Output format used when a date cell is cast to a string.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing cell, or an explicit null from the reader.
    Null,
    Text(String),
    /// Always finite; readers never produce NaN or infinities.
    Number(f64),
    Date(NaiveDateTime),
    /// Result of a failed date coercion.
    NullDate,
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// `true` for [`Value::Null`] and [`Value::NullDate`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::NullDate)
    }

    /// String cast used for grouping keys.
    pub fn group_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null | Value::NullDate => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null | Value::NullDate => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Date(d) => serializer.collect_str(&d.format(DATE_FORMAT)),
        }
    }
}

/// Integral numbers print without a fractional part so that `10` and `10.0`
/// produce the same key.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [Value] {
        &mut self.values
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    /// Numeric view of the column; non-numeric cells yield `None`.
    pub fn numbers(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.values.iter().map(Value::as_number)
    }

    /// Date view of the column; non-date cells yield `None`.
    pub fn dates(&self) -> impl Iterator<Item = Option<NaiveDateTime>> + '_ {
        self.values.iter().map(Value::as_date)
    }
}

/// Row indices sharing one composite key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// String cast of each grouping column, in the order requested.
    pub key: Vec<String>,
    pub rows: Vec<usize>,
}

/// An ordered collection of rows sharing one column set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Creates an empty table with the given headers.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: headers
                .into_iter()
                .map(|h| Column::new(h, Vec::new()))
                .collect(),
            rows: 0,
        }
    }

    /// Builds a table from row-major data. Short rows are padded with
    /// [`Value::Null`]; extra cells are dropped.
    pub fn from_rows<I, S>(headers: I, rows: Vec<Vec<Value>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(headers);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        let mut cells = row.into_iter();
        for column in &mut self.columns {
            column.values.push(cells.next().unwrap_or(Value::Null));
        }
        self.rows += 1;
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// First column whose header equals `name`.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        (index < self.rows).then_some(Record { table: self, index })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        (0..self.rows).map(move |index| Record { table: self, index })
    }

    /// Groups rows by the string cast of `columns`, in the order each key
    /// first appears. Returns `None` if any column is missing.
    pub fn group_by(&self, columns: &[&str]) -> Option<Vec<Group>> {
        let columns: Vec<&Column> = columns
            .iter()
            .map(|name| self.column(name))
            .collect::<Option<_>>()?;

        let keys = (0..self.rows).map(|row| {
            columns
                .iter()
                .map(|c| c.values[row].group_key())
                .collect::<Vec<_>>()
        });

        Some(
            group_indices(keys)
                .into_iter()
                .map(|(key, rows)| Group { key, rows })
                .collect(),
        )
    }

    /// New table holding the rows at `indices`, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                Column::new(
                    c.name.clone(),
                    indices.iter().map(|&i| c.values[i].clone()).collect(),
                )
            })
            .collect();
        Table {
            columns,
            rows: indices.len(),
        }
    }
}

/// Buckets positions by key, in the order each key first appears.
pub fn group_indices<K, I>(keys: I) -> Vec<(K, Vec<usize>)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut groups: Vec<(K, Vec<usize>)> = Vec::new();
    let mut slots: HashMap<K, usize> = HashMap::new();

    for (index, key) in keys.into_iter().enumerate() {
        match slots.get(&key) {
            Some(&slot) => groups[slot].1.push(index),
            None => {
                slots.insert(key.clone(), groups.len());
                groups.push((key, vec![index]));
            }
        }
    }

    groups
}

/// Borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Record<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.table.column(column).and_then(|c| c.get(self.index))
    }
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.table.width()))?;
        for column in &self.table.columns {
            map.serialize_entry(column.name(), &column.values[self.index])?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Table {
        Table::from_rows(
            ["Material Group", "Quantity"],
            vec![
                vec![Value::Number(10.0), Value::Number(-5.0)],
                vec![Value::Text("20".into())],
                vec![Value::Number(10.0), Value::Number(3.0)],
            ],
        )
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = sample();
        assert_eq!(table.len(), 3);
        assert_eq!(table.column("Quantity").unwrap().get(1), Some(&Value::Null));
    }

    #[test]
    fn test_group_key_collapses_integral_numbers() {
        assert_eq!(Value::Number(10.0).group_key(), "10");
        assert_eq!(Value::Text("10".into()).group_key(), "10");
        assert_eq!(Value::Number(2.5).group_key(), "2.5");
        assert_eq!(Value::Null.group_key(), "");
    }

    #[test]
    fn test_date_key_format() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(Value::Date(d).group_key(), "2024-03-01 00:00:00");
    }

    #[test]
    fn test_select_rows_keeps_order() {
        let table = sample();
        let picked = table.select_rows(&[2, 0]);
        let qty: Vec<_> = picked.column("Quantity").unwrap().numbers().collect();
        assert_eq!(qty, vec![Some(3.0), Some(-5.0)]);
    }

    #[test]
    fn test_record_serializes_as_object() {
        let table = sample();
        let json = serde_json::to_value(table.record(1).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Material Group": "20", "Quantity": null})
        );
    }

    #[test]
    fn test_group_by_composite_key() {
        let table = Table::from_rows(
            ["Vendor", "Plant"],
            vec![
                vec![Value::Text("V1".into()), Value::Text("P1".into())],
                vec![Value::Text("V2".into()), Value::Text("P1".into())],
                vec![Value::Text("V1".into()), Value::Text("P1".into())],
            ],
        );
        let groups = table.group_by(&["Vendor", "Plant"]).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, vec!["V1", "P1"]);
        assert_eq!(groups[0].rows, vec![0, 2]);
        assert_eq!(groups[1].rows, vec![1]);
        assert!(table.group_by(&["Vendor", "Site"]).is_none());
    }

    #[test]
    fn test_record_out_of_range() {
        assert!(sample().record(3).is_none());
    }
}
