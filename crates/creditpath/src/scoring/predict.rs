//! Probability inference against the loaded artifact bundle.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::artifacts::{ArtifactBundle, ClassLabel};
use super::preprocess::FeatureVector;

/// Labels that name the default outcome, compared case-insensitively and without trimming.
pub const DEFAULT_CLASS_LABELS: [&str; 9] = [
    "charged off",
    "default",
    "defaulted",
    "late",
    "late (31-120 days)",
    "1",
    "true",
    "yes",
    "bad",
];

const PROBABILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceStage {
    Scaler,
    Classifier,
}

impl fmt::Display for InferenceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceStage::Scaler => f.write_str("scaler"),
            InferenceStage::Classifier => f.write_str("classifier"),
        }
    }
}

/// Runtime failure while scaling or classifying a prepared vector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("{stage} expects {expected} features, received {found}")]
    DimensionMismatch {
        stage: InferenceStage,
        expected: usize,
        found: usize,
    },
    #[error("classifier returned {found} probabilities for {expected} classes")]
    ClassCountMismatch { expected: usize, found: usize },
    #[error("classifier produced a non-finite probability")]
    NonFiniteOutput,
    #[error("classifier probabilities sum to {sum:.6}, expected 1")]
    InvalidDistribution { sum: f64 },
}

/// How the default class was picked for a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultClassSource {
    /// Named explicitly by the artifact manifest.
    Pinned,
    /// Matched one of [`DEFAULT_CLASS_LABELS`].
    KnownLabel,
    NumericOne,
    TextOne,
    /// No label matched; fell back to the class position.
    Positional,
}

/// The classifier output treated as "default", resolved once per artifact load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultClass {
    pub label: String,
    pub index: usize,
    pub source: DefaultClassSource,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefaultClassError {
    #[error("classifier exposes no output classes")]
    NoClasses,
    #[error("pinned default label '{label}' is not one of the classifier classes {classes:?}")]
    UnknownPinnedLabel { label: String, classes: Vec<String> },
}

/// Resolve the default class. A pinned label wins; otherwise known default labels, then the
/// numeric class `1`, then the text class `"1"`, then position 1 (or 0 for a single class).
pub fn resolve_default_class(
    classes: &[ClassLabel],
    pinned: Option<&str>,
) -> Result<DefaultClass, DefaultClassError> {
    if classes.is_empty() {
        return Err(DefaultClassError::NoClasses);
    }

    let labels: Vec<String> = classes.iter().map(ToString::to_string).collect();
    let resolved = |index: usize, source| DefaultClass {
        label: labels[index].clone(),
        index,
        source,
    };

    if let Some(pinned) = pinned {
        let wanted = pinned.trim();
        return labels
            .iter()
            .position(|label| label.eq_ignore_ascii_case(wanted))
            .map(|index| resolved(index, DefaultClassSource::Pinned))
            .ok_or_else(|| DefaultClassError::UnknownPinnedLabel {
                label: pinned.to_string(),
                classes: labels.clone(),
            });
    }

    if let Some(index) = labels.iter().position(|label| {
        DEFAULT_CLASS_LABELS
            .iter()
            .any(|known| label.eq_ignore_ascii_case(known))
    }) {
        return Ok(resolved(index, DefaultClassSource::KnownLabel));
    }

    if let Some(index) = classes.iter().position(ClassLabel::is_numeric_one) {
        return Ok(resolved(index, DefaultClassSource::NumericOne));
    }

    if let Some(index) = classes
        .iter()
        .position(|class| matches!(class, ClassLabel::Text(text) if text == "1"))
    {
        return Ok(resolved(index, DefaultClassSource::TextOne));
    }

    let index = if classes.len() > 1 { 1 } else { 0 };
    Ok(resolved(index, DefaultClassSource::Positional))
}

/// Per-class probabilities plus the resolved default outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Probability of the default class, in `[0, 1]`.
    pub probability: f64,
    /// Every class label (stringified) with its probability.
    pub class_probabilities: BTreeMap<String, f64>,
    pub default_label: String,
    pub default_index: usize,
}

/// Applies the fitted scaler and classifier to prepared feature vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbabilityPredictor;

impl ProbabilityPredictor {
    pub fn new() -> Self {
        Self
    }

    pub fn predict(
        &self,
        vector: &FeatureVector,
        bundle: &ArtifactBundle,
    ) -> Result<ClassificationResult, InferenceError> {
        let scaled = bundle.scaler().transform(vector.values())?;
        let classifier = bundle.classifier();
        let probabilities = classifier.predict_proba(&scaled)?;

        let classes = classifier.classes();
        if probabilities.len() != classes.len() {
            return Err(InferenceError::ClassCountMismatch {
                expected: classes.len(),
                found: probabilities.len(),
            });
        }
        if probabilities.iter().any(|value| !value.is_finite()) {
            return Err(InferenceError::NonFiniteOutput);
        }
        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(InferenceError::InvalidDistribution { sum });
        }

        let class_probabilities = classes
            .iter()
            .zip(&probabilities)
            .map(|(class, probability)| (class.to_string(), probability.clamp(0.0, 1.0)))
            .collect();

        let default_class = bundle.default_class();
        Ok(ClassificationResult {
            probability: probabilities[default_class.index].clamp(0.0, 1.0),
            class_probabilities,
            default_label: default_class.label.clone(),
            default_index: default_class.index,
        })
    }
}
