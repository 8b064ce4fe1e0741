//! Merges aggregator output into the `{"code": .., "data": ..}` envelope.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::analyzers::Aggregator;
use crate::error::PipelineError;
use crate::table::Table;

/// Merged aggregator sections keyed `<aggregator>_<section>`.
pub type AnalysisData = Map<String, Value>;

/// Response returned to the uploader.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResponse {
    /// `code: 0` with the analysis payload.
    Success(Value),
    /// `code: -1` with a human-readable message.
    Failure(String),
}

impl AnalysisResponse {
    pub fn code(&self) -> i32 {
        match self {
            AnalysisResponse::Success(_) => 0,
            AnalysisResponse::Failure(_) => -1,
        }
    }

    /// Failure carrying the error's user-safe message.
    pub fn failure(err: &PipelineError) -> Self {
        AnalysisResponse::Failure(err.user_message().to_string())
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            AnalysisResponse::Success(data) => Some(data),
            AnalysisResponse::Failure(_) => None,
        }
    }
}

impl Serialize for AnalysisResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AnalysisResponse", 2)?;
        state.serialize_field("code", &self.code())?;
        match self {
            AnalysisResponse::Success(data) => state.serialize_field("data", data)?,
            AnalysisResponse::Failure(message) => state.serialize_field("data", message)?,
        }
        state.end()
    }
}

/// Runs each aggregator over `table` and shallow-merges the results.
///
/// Keys are namespaced with the aggregator name. An aggregator that fails
/// contributes empty sections instead of aborting the others.
pub fn compose(table: &Table, aggregators: &[&dyn Aggregator]) -> AnalysisData {
    let mut merged = AnalysisData::new();

    for aggregator in aggregators {
        let name = aggregator.name();
        match aggregator.aggregate(table) {
            Ok(summary) => {
                for (section, rows) in summary.into_sections() {
                    insert(&mut merged, name, section, rows);
                }
            }
            Err(e) => {
                warn!(aggregator = name, error = %e, "Aggregator degraded to empty sections");
                for section in aggregator.sections() {
                    insert(&mut merged, name, section, Value::Array(Vec::new()));
                }
            }
        }
    }

    merged
}

fn insert(merged: &mut AnalysisData, aggregator: &str, section: &str, rows: Value) {
    let key = format!("{aggregator}_{section}");
    if merged.insert(key.clone(), rows).is_some() {
        warn!(key, "Duplicate section key overwritten");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::{Summary, consumption_aggregators};
    use crate::columns::QUANTITY;
    use crate::error::Result;
    use serde_json::json;

    struct Fixed(&'static str);

    impl Aggregator for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn sections(&self) -> &'static [&'static str] {
            &["rows"]
        }

        fn aggregate(&self, _table: &Table) -> Result<Summary> {
            Summary::new().section("rows", &[self.0])
        }
    }

    struct Broken;

    impl Aggregator for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn sections(&self) -> &'static [&'static str] {
            &["a", "b"]
        }

        fn aggregate(&self, _table: &Table) -> Result<Summary> {
            Err(PipelineError::MissingExpectedColumn {
                aggregator: "broken",
                column: QUANTITY,
            })
        }
    }

    #[test]
    fn test_keys_are_namespaced() {
        let merged = compose(&Table::default(), &[&Fixed("first"), &Fixed("second")]);
        assert_eq!(
            Value::Object(merged),
            json!({"first_rows": ["first"], "second_rows": ["second"]})
        );
    }

    #[test]
    fn test_failed_aggregator_yields_empty_sections() {
        let merged = compose(&Table::default(), &[&Broken, &Fixed("ok")]);
        assert_eq!(
            Value::Object(merged),
            json!({"broken_a": [], "broken_b": [], "ok_rows": ["ok"]})
        );
    }

    #[test]
    fn test_consumption_keys_on_empty_table() {
        let merged = compose(&Table::default(), &consumption_aggregators());
        let keys: Vec<_> = merged.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "vendor_consumption_summary",
                "vendor_consumption_by_material",
                "location_consumption_by_plant",
                "location_consumption_by_site",
                "batch_variability_batches",
                "batch_variability_summary",
                "combined_analysis_summary",
                "combined_analysis_monthly",
            ]
        );
        assert!(merged.values().all(|v| v == &json!([])));
    }

    #[test]
    fn test_envelope_serialization() {
        let ok = AnalysisResponse::Success(json!({"k": []}));
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!({"code": 0, "data": {"k": []}}));

        let failed = AnalysisResponse::failure(&PipelineError::NoPartitionColumn);
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"code": -1, "data": "No Material Group column found in the uploaded file."})
        );
    }
}
