//! Turns an [`ApplicantRecord`] into the ordered vector the scaler and classifier were fit on.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::artifacts::ArtifactBundle;
use super::domain::{coerce_numeric, ApplicantRecord};

pub const CREDIT_UTILIZATION_RATIO: &str = "credit_utilization_ratio";
pub const LOAN_TO_INCOME_RATIO: &str = "loan_to_income_ratio";

const RATIO_RANGE: (f64, f64) = (0.0, 1.0);
const PERCENT_RANGE: (f64, f64) = (0.0, 100.0);
const MAX_INTEREST_RATE: f64 = 50.0;

/// Per-request input rejection. Carries the offending field and, for categorical
/// fields, every value that would have been accepted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid sub_grade '{label}'; allowed: {}", allowed.join(", "))]
    UnknownSubGrade { label: String, allowed: Vec<String> },
    #[error("{field} = {value} is outside its valid domain ({expected})")]
    OutOfDomain {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::UnknownSubGrade { .. } => "sub_grade",
            ValidationError::OutOfDomain { field, .. } => field,
        }
    }

    pub fn allowed(&self) -> Option<&[String]> {
        match self {
            ValidationError::UnknownSubGrade { allowed, .. } => Some(allowed),
            ValidationError::OutOfDomain { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessOptions {
    /// Clamp ratio features into their documented ranges instead of rejecting them.
    pub clamp_ratios: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self { clamp_ratios: true }
    }
}

/// A feature value that was pulled back into its documented range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClampAdjustment {
    pub feature: String,
    pub original: f64,
    pub adjusted: f64,
}

/// Ordered model input. Values line up one-to-one with the bundle's feature names.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Arc<[String]>,
    values: Vec<f64>,
    adjustments: Vec<ClampAdjustment>,
}

impl FeatureVector {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .map(|index| self.values[index])
    }

    pub fn adjustments(&self) -> &[ClampAdjustment] {
        &self.adjustments
    }
}

#[derive(Clone, Copy)]
enum Domain {
    Positive,
    NonNegative,
    Percent,
    InterestRate,
    Finite,
}

impl Domain {
    fn contains(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            Domain::Positive => value > 0.0,
            Domain::NonNegative => value >= 0.0,
            Domain::Percent => (PERCENT_RANGE.0..=PERCENT_RANGE.1).contains(&value),
            Domain::InterestRate => (0.0..=MAX_INTEREST_RATE).contains(&value),
            Domain::Finite => true,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Domain::Positive => "> 0",
            Domain::NonNegative => ">= 0",
            Domain::Percent => "0 to 100",
            Domain::InterestRate => "0 to 50",
            Domain::Finite => "a finite number",
        }
    }
}

/// Builds feature vectors. Holds no per-request state.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeaturePreprocessor {
    options: PreprocessOptions,
}

impl FeaturePreprocessor {
    pub fn new(options: PreprocessOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> PreprocessOptions {
        self.options
    }

    pub fn prepare(
        &self,
        record: &ApplicantRecord,
        bundle: &ArtifactBundle,
    ) -> Result<FeatureVector, ValidationError> {
        let sub_grade_code = bundle.sub_grades().encode(&record.sub_grade).ok_or_else(|| {
            ValidationError::UnknownSubGrade {
                label: record.sub_grade.clone(),
                allowed: bundle.sub_grades().allowed_labels(),
            }
        })?;

        self.validate_domains(record)?;

        let mut adjustments = Vec::new();
        let mut clamp = |feature: &str, value: f64, (low, high): (f64, f64)| -> f64 {
            if !self.options.clamp_ratios || (low..=high).contains(&value) {
                return value;
            }
            let adjusted = value.clamp(low, high);
            warn!(feature, original = value, adjusted, "clamped out-of-range feature");
            adjustments.push(ClampAdjustment {
                feature: feature.to_string(),
                original: value,
                adjusted,
            });
            adjusted
        };

        let credit_utilization = clamp(
            CREDIT_UTILIZATION_RATIO,
            record.credit_utilization_ratio(),
            RATIO_RANGE,
        );
        let loan_to_income = clamp(
            LOAN_TO_INCOME_RATIO,
            record.loan_to_income_ratio(),
            RATIO_RANGE,
        );
        let dti = clamp("dti", record.dti, PERCENT_RANGE);
        let revol_util = clamp("revol_util", record.revol_util, PERCENT_RANGE);

        log_overridden_ratio(
            CREDIT_UTILIZATION_RATIO,
            record.credit_utilization_ratio,
            credit_utilization,
        );
        log_overridden_ratio(LOAN_TO_INCOME_RATIO, record.loan_to_income_ratio, loan_to_income);

        let computed: HashMap<&str, f64> = HashMap::from([
            ("loan_amnt", record.loan_amnt),
            ("int_rate", record.int_rate),
            ("installment", record.installment),
            ("sub_grade", sub_grade_code),
            ("annual_inc", record.annual_inc),
            ("dti", dti),
            ("open_acc", record.open_acc),
            ("revol_util", revol_util),
            ("total_acc", record.total_acc),
            ("mort_acc", record.mort_acc),
            ("pub_rec", record.pub_rec),
            ("revol_bal", record.revol_bal),
            ("pub_rec_bankruptcies", record.pub_rec_bankruptcies),
            (CREDIT_UTILIZATION_RATIO, credit_utilization),
            (LOAN_TO_INCOME_RATIO, loan_to_income),
        ]);

        let names = bundle.shared_feature_names();
        let values = names
            .iter()
            .map(|name| {
                computed
                    .get(name.as_str())
                    .copied()
                    .or_else(|| record.extra_features.get(name).map(coerce_numeric))
                    .filter(|value| value.is_finite())
                    .unwrap_or(0.0)
            })
            .collect();

        Ok(FeatureVector {
            names,
            values,
            adjustments,
        })
    }

    fn validate_domains(&self, record: &ApplicantRecord) -> Result<(), ValidationError> {
        // With clamping on, out-of-range percentages are adjusted later instead of rejected.
        let percent = if self.options.clamp_ratios {
            Domain::Finite
        } else {
            Domain::Percent
        };

        let checks = [
            ("loan_amnt", record.loan_amnt, Domain::Positive),
            ("int_rate", record.int_rate, Domain::InterestRate),
            ("installment", record.installment, Domain::Positive),
            ("annual_inc", record.annual_inc, Domain::Positive),
            ("dti", record.dti, percent),
            ("revol_util", record.revol_util, percent),
            ("open_acc", record.open_acc, Domain::NonNegative),
            ("total_acc", record.total_acc, Domain::NonNegative),
            ("mort_acc", record.mort_acc, Domain::NonNegative),
            ("pub_rec", record.pub_rec, Domain::NonNegative),
            ("revol_bal", record.revol_bal, Domain::NonNegative),
            (
                "pub_rec_bankruptcies",
                record.pub_rec_bankruptcies,
                Domain::NonNegative,
            ),
        ];

        for (field, value, domain) in checks {
            if !domain.contains(value) {
                return Err(ValidationError::OutOfDomain {
                    field,
                    value,
                    expected: domain.describe(),
                });
            }
        }

        Ok(())
    }
}

fn log_overridden_ratio(feature: &str, supplied: Option<f64>, computed: f64) {
    if let Some(supplied) = supplied {
        if (supplied - computed).abs() > 1e-9 {
            debug!(feature, supplied, computed, "caller-supplied ratio replaced by computed value");
        }
    }
}
