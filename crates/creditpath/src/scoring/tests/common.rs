use axum::response::Response;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::scoring::artifacts::{
    ArtifactBundle, ArtifactManifest, ClassLabel, Classifier, LogisticModel, StandardScaler,
    SubGradeTable,
};
use crate::scoring::predict::{InferenceError, InferenceStage};
use crate::scoring::{ApplicantRecord, CreditScorer, DecisionConfig};

pub(super) const FEATURES: [&str; 17] = [
    "loan_amnt",
    "int_rate",
    "installment",
    "sub_grade",
    "annual_inc",
    "dti",
    "open_acc",
    "revol_util",
    "total_acc",
    "mort_acc",
    "pub_rec",
    "revol_bal",
    "pub_rec_bankruptcies",
    "credit_utilization_ratio",
    "loan_to_income_ratio",
    "home_ownership_RENT",
    "emp_length",
];

pub(super) fn feature_names() -> Vec<String> {
    FEATURES.iter().map(|name| name.to_string()).collect()
}

pub(super) fn feature_index(name: &str) -> usize {
    FEATURES
        .iter()
        .position(|candidate| *candidate == name)
        .expect("known feature")
}

/// A1 = 1 through G5 = 35.
pub(super) fn sub_grade_table() -> SubGradeTable {
    let mut codes = BTreeMap::new();
    for (grade_index, grade) in "ABCDEFG".chars().enumerate() {
        for step in 1..=5 {
            codes.insert(
                format!("{grade}{step}"),
                (grade_index * 5 + step) as f64,
            );
        }
    }
    SubGradeTable::try_from(codes).expect("valid sub-grade table")
}

pub(super) fn identity_scaler(width: usize) -> StandardScaler {
    StandardScaler {
        mean: vec![0.0; width],
        scale: vec![1.0; width],
    }
}

pub(super) fn default_paid_classes() -> Vec<ClassLabel> {
    vec![
        ClassLabel::Text("Fully Paid".to_string()),
        ClassLabel::Text("Charged Off".to_string()),
    ]
}

/// Returns the same distribution for every input of the declared width.
#[derive(Debug)]
pub(super) struct FixedClassifier {
    pub(super) classes: Vec<ClassLabel>,
    pub(super) probabilities: Vec<f64>,
    pub(super) width: usize,
}

impl FixedClassifier {
    pub(super) fn defaulting_with(probability: f64) -> Self {
        Self {
            classes: default_paid_classes(),
            probabilities: vec![1.0 - probability, probability],
            width: FEATURES.len(),
        }
    }
}

impl Classifier for FixedClassifier {
    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.width
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if features.len() != self.width {
            return Err(InferenceError::DimensionMismatch {
                stage: InferenceStage::Classifier,
                expected: self.width,
                found: features.len(),
            });
        }
        Ok(self.probabilities.clone())
    }
}

/// Advertises the full feature width but was really fit on three columns.
#[derive(Debug)]
pub(super) struct MisreportingClassifier {
    pub(super) inner: LogisticModel,
}

impl MisreportingClassifier {
    pub(super) fn new() -> Self {
        Self {
            inner: LogisticModel {
                classes: default_paid_classes(),
                coefficients: vec![vec![0.1, 0.2, 0.3]],
                intercepts: vec![0.0],
            },
        }
    }
}

impl Classifier for MisreportingClassifier {
    fn classes(&self) -> &[ClassLabel] {
        self.inner.classes()
    }

    fn n_features(&self) -> usize {
        FEATURES.len()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        self.inner.predict_proba(features)
    }
}

/// Logistic model whose only signal is the encoded sub-grade: `p = sigmoid(code - 8)`,
/// so B3 (code 8) scores exactly 0.5.
pub(super) fn sub_grade_logistic() -> LogisticModel {
    let mut weights = vec![0.0; FEATURES.len()];
    weights[feature_index("sub_grade")] = 1.0;
    LogisticModel {
        classes: vec![ClassLabel::Int(0), ClassLabel::Int(1)],
        coefficients: vec![weights],
        intercepts: vec![-8.0],
    }
}

pub(super) fn bundle_with(
    classifier: impl Classifier + 'static,
    manifest: ArtifactManifest,
) -> ArtifactBundle {
    ArtifactBundle::from_parts(
        Arc::new(classifier),
        identity_scaler(FEATURES.len()),
        feature_names(),
        sub_grade_table(),
        manifest,
    )
    .expect("bundle validates")
}

pub(super) fn fixed_bundle(probability: f64) -> Arc<ArtifactBundle> {
    Arc::new(bundle_with(
        FixedClassifier::defaulting_with(probability),
        ArtifactManifest {
            model_version: "fixture-v1".to_string(),
            ..ArtifactManifest::default()
        },
    ))
}

pub(super) fn scorer_with_probability(probability: f64) -> CreditScorer {
    CreditScorer::new(fixed_bundle(probability), DecisionConfig::default())
}

pub(super) fn sample_record() -> ApplicantRecord {
    ApplicantRecord {
        loan_amnt: 15_000.0,
        int_rate: 12.5,
        installment: 450.0,
        sub_grade: "B3".to_string(),
        annual_inc: 60_000.0,
        dti: 18.0,
        open_acc: 8.0,
        revol_util: 25.0,
        total_acc: 15.0,
        mort_acc: 2.0,
        pub_rec: 0.0,
        revol_bal: 12_000.0,
        pub_rec_bankruptcies: 0.0,
        ..ApplicantRecord::default()
    }
}

pub(super) fn stressed_record() -> ApplicantRecord {
    ApplicantRecord {
        dti: 45.0,
        revol_util: 75.0,
        pub_rec_bankruptcies: 1.0,
        ..sample_record()
    }
}

pub(super) fn sample_payload() -> Value {
    json!({
        "loan_amnt": 15000,
        "int_rate": "12.5",
        "installment": 450.0,
        "sub_grade": "B3",
        "annual_inc": 60000,
        "dti": 18.0,
        "open_acc": 8,
        "revol_util": 25.0,
        "total_acc": 15,
        "mort_acc": 2,
        "revol_bal": 12000,
        "home_ownership_RENT": 1
    })
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
