//! JSON schema of the structured report, for harnesses that validate it.

use schemars::schema_for;

use visreg_compare::RegressionReport;

/// JSON schema of [`RegressionReport`].
pub fn report_schema() -> serde_json::Value {
    serde_json::to_value(schema_for!(RegressionReport)).unwrap_or_default()
}
