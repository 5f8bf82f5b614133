use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Borrower attributes exactly as submitted by the caller.
///
/// Numeric fields accept JSON numbers, numeric strings, and `null`. Anything that cannot be
/// read as a finite number becomes `0.0`, the same fill the training pipeline used. Range
/// checks still run during preprocessing, so a required amount that collapses to zero is
/// reported as out of domain rather than scored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    #[serde(deserialize_with = "lenient_number")]
    pub loan_amnt: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub int_rate: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub installment: f64,
    pub sub_grade: String,
    #[serde(deserialize_with = "lenient_number")]
    pub annual_inc: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub dti: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub open_acc: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub revol_util: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub total_acc: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub mort_acc: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub pub_rec: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub revol_bal: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub pub_rec_bankruptcies: f64,
    /// Accepted for compatibility; the computed ratio is what reaches the model.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_optional_number"
    )]
    pub credit_utilization_ratio: Option<f64>,
    /// Accepted for compatibility; the computed ratio is what reaches the model.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_optional_number"
    )]
    pub loan_to_income_ratio: Option<f64>,
    /// Further model inputs keyed by training-time feature name (e.g. one-hot columns).
    #[serde(flatten)]
    pub extra_features: BTreeMap<String, Value>,
}

impl ApplicantRecord {
    /// Sub-grade label as it is looked up in the encoding table.
    pub fn normalized_sub_grade(&self) -> String {
        normalize_sub_grade(&self.sub_grade)
    }

    /// `revol_util` expressed as a fraction.
    pub fn credit_utilization_ratio(&self) -> f64 {
        self.revol_util / 100.0
    }

    /// Loan amount over annual income; the denominator is floored at 1, the income is not.
    pub fn loan_to_income_ratio(&self) -> f64 {
        self.loan_amnt / self.annual_inc.max(1.0)
    }
}

pub(crate) fn normalize_sub_grade(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Numeric reading of an arbitrary JSON value; non-coercible values read as zero.
pub(crate) fn coerce_numeric(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };

    parsed.filter(|number| number.is_finite()).unwrap_or(0.0)
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_numeric(&value))
}

fn lenient_optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .filter(|value| !value.is_null())
        .map(|value| coerce_numeric(&value)))
}
