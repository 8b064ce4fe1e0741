//! Column-level cleaning applied to every upload before analysis.
//!
//! Rules run in a fixed order and each one touches a cell at most once:
//!
//! 1. trim whitespace from headers and text cells
//! 2. [`fill_unknown`]: empty or missing cells become `"Unknown"`
//! 3. `Pstng Date` and `SLED/BBD` are coerced to dates
//! 4. `Quantity` and `Quantity in UnE` take their absolute value
//! 5. `Order Quantity` is coerced to a number
//!
//! Rules 3-5 only run when the named column exists. No rule fails: a cell
//! that cannot be coerced becomes a null marker.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use tracing::debug;

use crate::columns::{
    ORDER_QUANTITY, POSTING_DATE, QUANTITY, QUANTITY_IN_UNE, SHELF_LIFE_DATE, UNKNOWN,
};
use crate::table::{Table, Value};

const DATE_COLUMNS: &[&str] = &[POSTING_DATE, SHELF_LIFE_DATE];
const ABSOLUTE_COLUMNS: &[&str] = &[QUANTITY, QUANTITY_IN_UNE];
const NUMERIC_COLUMNS: &[&str] = &[ORDER_QUANTITY];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%d %b %Y",
];

/// Largest spreadsheet serial accepted as a date (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Result of a best-effort cell coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced<T> {
    Value(T),
    Null,
}

impl<T> Coerced<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Coerced::Value(v) => Some(v),
            Coerced::Null => None,
        }
    }
}

impl<T> From<Option<T>> for Coerced<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Coerced::Null, Coerced::Value)
    }
}

/// Runs every cleaning rule over `table`.
///
/// Normalizing an already-normalized table returns it unchanged.
#[tracing::instrument(skip_all, fields(rows = table.len(), columns = table.width()))]
pub fn normalize(mut table: Table) -> Table {
    trim_whitespace(&mut table);
    let filled = fill_unknown(&mut table);

    for name in DATE_COLUMNS {
        if let Some(failed) = coerce_column(&mut table, name, date_cell) {
            debug!(column = name, failed, "Coerced date column");
        }
    }
    for name in ABSOLUTE_COLUMNS {
        coerce_column(&mut table, name, absolute_cell);
    }
    for name in NUMERIC_COLUMNS {
        if let Some(failed) = coerce_column(&mut table, name, numeric_cell) {
            debug!(column = name, failed, "Coerced numeric column");
        }
    }

    debug!(filled, "Normalization complete");
    table
}

/// Trims leading and trailing whitespace from headers and text cells.
pub fn trim_whitespace(table: &mut Table) {
    for column in table.columns_mut() {
        let trimmed = column.name().trim();
        if trimmed.len() != column.name().len() {
            let trimmed = trimmed.to_string();
            column.set_name(trimmed);
        }
        for value in column.values_mut() {
            if let Value::Text(s) = value {
                let t = s.trim();
                if t.len() != s.len() {
                    *s = t.to_string();
                }
            }
        }
    }
}

/// Replaces `""`, `" "` and missing cells with the `"Unknown"` sentinel.
///
/// Applies to every column regardless of its meaning, so numeric and date
/// columns can receive the string too. Returns the number of cells filled.
pub fn fill_unknown(table: &mut Table) -> usize {
    let mut filled = 0;
    for column in table.columns_mut() {
        for value in column.values_mut() {
            let blank = match value {
                Value::Null => true,
                Value::Text(s) => s.is_empty() || s == " ",
                _ => false,
            };
            if blank {
                *value = Value::Text(UNKNOWN.to_string());
                filled += 1;
            }
        }
    }
    filled
}

/// Applies `coerce` to every cell of column `name`. Returns `None` if the
/// column is absent, otherwise the number of cells that became null.
fn coerce_column(table: &mut Table, name: &str, coerce: fn(&Value) -> Value) -> Option<usize> {
    let column = table.column_mut(name)?;
    let mut failed = 0;
    for value in column.values_mut() {
        let coerced = coerce(value);
        if coerced.is_null() && !value.is_null() {
            failed += 1;
        }
        *value = coerced;
    }
    Some(failed)
}

fn date_cell(value: &Value) -> Value {
    match coerce_date(value) {
        Coerced::Value(d) => Value::Date(d),
        Coerced::Null => Value::NullDate,
    }
}

fn absolute_cell(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(n.abs()),
        other => other.clone(),
    }
}

fn numeric_cell(value: &Value) -> Value {
    match coerce_number(value) {
        Coerced::Value(n) => Value::Number(n),
        Coerced::Null => Value::Null,
    }
}

/// Coerces a cell to a date. Numbers are read as spreadsheet serial days.
pub fn coerce_date(value: &Value) -> Coerced<NaiveDateTime> {
    match value {
        Value::Date(d) => Coerced::Value(*d),
        Value::Number(n) => excel_serial_to_datetime(*n).into(),
        Value::Text(s) => parse_date_text(s).into(),
        Value::Null | Value::NullDate => Coerced::Null,
    }
}

/// Coerces a cell to a finite number.
pub fn coerce_number(value: &Value) -> Coerced<f64> {
    match value {
        Value::Number(n) => Coerced::Value(*n),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .into(),
        _ => Coerced::Null,
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Converts a spreadsheet serial (days since 1899-12-30) to a timestamp,
/// rounded to the millisecond.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}
