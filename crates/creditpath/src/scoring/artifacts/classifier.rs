//! Classifier artifacts exported by the offline training job.
//!
//! The scoring pipeline only relies on the [`Classifier`] trait; the concrete model families
//! below are the ones the exporter currently emits.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::super::predict::{InferenceError, InferenceStage};

/// Output class label as recorded at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ClassLabel {
    /// True for the numeric class `1` (integer or float encoded).
    pub fn is_numeric_one(&self) -> bool {
        match self {
            ClassLabel::Int(value) => *value == 1,
            ClassLabel::Float(value) => *value == 1.0,
            ClassLabel::Bool(_) | ClassLabel::Text(_) => false,
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Bool(value) => write!(f, "{value}"),
            ClassLabel::Int(value) => write!(f, "{value}"),
            ClassLabel::Float(value) => write!(f, "{value}"),
            ClassLabel::Text(value) => f.write_str(value),
        }
    }
}

/// Probabilistic classifier over a fixed-width, already scaled feature vector.
pub trait Classifier: fmt::Debug + Send + Sync {
    /// Output classes, in the order probabilities are returned.
    fn classes(&self) -> &[ClassLabel];

    /// Input width the model was fit against.
    fn n_features(&self) -> usize;

    /// One probability per class, aligned with [`Classifier::classes`].
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError>;

    /// Structural check run before the classifier joins a bundle. A classifier that passes
    /// must never panic in [`Classifier::predict_proba`].
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// On-disk classifier document, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    Logistic(LogisticModel),
    GradientBoosting(TreeEnsemble),
}

impl Classifier for ClassifierArtifact {
    fn classes(&self) -> &[ClassLabel] {
        match self {
            ClassifierArtifact::Logistic(model) => model.classes(),
            ClassifierArtifact::GradientBoosting(model) => model.classes(),
        }
    }

    fn n_features(&self) -> usize {
        match self {
            ClassifierArtifact::Logistic(model) => model.n_features(),
            ClassifierArtifact::GradientBoosting(model) => model.n_features(),
        }
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        match self {
            ClassifierArtifact::Logistic(model) => model.predict_proba(features),
            ClassifierArtifact::GradientBoosting(model) => model.predict_proba(features),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            ClassifierArtifact::Logistic(model) => model.validate(),
            ClassifierArtifact::GradientBoosting(model) => model.validate(),
        }
    }
}

/// Linear model: a single coefficient row scores a binary problem through the sigmoid,
/// one row per class scores through the softmax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub classes: Vec<ClassLabel>,
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LogisticModel {
    fn decision_function(&self, features: &[f64]) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, intercept)| {
                row.iter()
                    .zip(features)
                    .map(|(weight, value)| weight * value)
                    .sum::<f64>()
                    + intercept
            })
            .collect()
    }
}

impl Classifier for LogisticModel {
    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.coefficients.first().map(Vec::len).unwrap_or(0)
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        ensure_width(self.n_features(), features)?;

        let scores = self.decision_function(features);
        if self.classes.len() == 2 && scores.len() == 1 {
            let positive = sigmoid(scores[0]);
            return Ok(vec![1.0 - positive, positive]);
        }

        Ok(softmax(&scores))
    }

    fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("logistic model declares no classes".to_string());
        }

        let rows = self.coefficients.len();
        let binary = self.classes.len() == 2 && rows == 1;
        if !binary && rows != self.classes.len() {
            return Err(format!(
                "logistic model has {} coefficient rows for {} classes",
                rows,
                self.classes.len()
            ));
        }
        if self.intercepts.len() != rows {
            return Err(format!(
                "logistic model has {} intercepts for {} coefficient rows",
                self.intercepts.len(),
                rows
            ));
        }

        let width = self.n_features();
        if width == 0 {
            return Err("logistic model has no coefficients".to_string());
        }
        if self.coefficients.iter().any(|row| row.len() != width) {
            return Err("logistic model coefficient rows differ in width".to_string());
        }
        if self
            .coefficients
            .iter()
            .flatten()
            .chain(self.intercepts.iter())
            .any(|value| !value.is_finite())
        {
            return Err("logistic model contains non-finite parameters".to_string());
        }

        Ok(())
    }
}

/// Binary gradient-boosted tree ensemble in margin space.
///
/// Only reachable through [`TreeEnsemble::new`] or deserialization, both of which validate,
/// so every split indexes a real feature and a later node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeEnsembleParts")]
pub struct TreeEnsemble {
    classes: Vec<ClassLabel>,
    n_features: usize,
    base_score: f64,
    trees: Vec<Tree>,
}

#[derive(Deserialize)]
struct TreeEnsembleParts {
    classes: Vec<ClassLabel>,
    n_features: usize,
    /// Prior probability of the second class; the margin starts at its logit.
    #[serde(default = "default_base_score")]
    base_score: f64,
    trees: Vec<Tree>,
}

impl TryFrom<TreeEnsembleParts> for TreeEnsemble {
    type Error = String;

    fn try_from(parts: TreeEnsembleParts) -> Result<Self, Self::Error> {
        TreeEnsemble::new(parts.classes, parts.n_features, parts.base_score, parts.trees)
    }
}

fn default_base_score() -> f64 {
    0.5
}

/// Flattened regression tree; node `0` is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Branch taken when the feature value is not finite.
        #[serde(default)]
        default_left: bool,
    },
    Leaf {
        value: f64,
    },
}

impl Tree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Tree { nodes }
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {index} splits on feature {feature} but the model has {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {index} has a non-finite threshold"));
                    }
                    // Children must come after their parent, which rules out cycles.
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(format!(
                                "node {index} points at invalid child {child}"
                            ));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {index} has a non-finite value"));
                    }
                }
            }
        }

        Ok(())
    }

    fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let value = features[*feature];
                    let go_left = if value.is_finite() {
                        value < *threshold
                    } else {
                        *default_left
                    };
                    index = if go_left { *left } else { *right };
                }
            }
        }
    }
}

impl TreeEnsemble {
    pub fn new(
        classes: Vec<ClassLabel>,
        n_features: usize,
        base_score: f64,
        trees: Vec<Tree>,
    ) -> Result<Self, String> {
        let ensemble = TreeEnsemble {
            classes,
            n_features,
            base_score,
            trees,
        };
        ensemble.check()?;
        Ok(ensemble)
    }

    fn check(&self) -> Result<(), String> {
        if self.classes.len() != 2 {
            return Err(format!(
                "gradient boosting artifact must be binary, found {} classes",
                self.classes.len()
            ));
        }
        if self.n_features == 0 {
            return Err("gradient boosting artifact declares zero features".to_string());
        }
        if !(self.base_score > 0.0 && self.base_score < 1.0) {
            return Err(format!(
                "base_score {} must lie strictly between 0 and 1",
                self.base_score
            ));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|reason| format!("tree {index}: {reason}"))?;
        }

        Ok(())
    }

    fn margin(&self, features: &[f64]) -> f64 {
        let base_margin = (self.base_score / (1.0 - self.base_score)).ln();
        base_margin
            + self
                .trees
                .iter()
                .map(|tree| tree.leaf_value(features))
                .sum::<f64>()
    }
}

impl Classifier for TreeEnsemble {
    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        ensure_width(self.n_features, features)?;
        let positive = sigmoid(self.margin(features));
        Ok(vec![1.0 - positive, positive])
    }

    fn validate(&self) -> Result<(), String> {
        self.check()
    }
}

fn ensure_width(expected: usize, features: &[f64]) -> Result<(), InferenceError> {
    if features.len() == expected {
        Ok(())
    } else {
        Err(InferenceError::DimensionMismatch {
            stage: InferenceStage::Classifier,
            expected,
            found: features.len(),
        })
    }
}

pub(crate) fn sigmoid(value: f64) -> f64 {
    if value >= 0.0 {
        1.0 / (1.0 + (-value).exp())
    } else {
        let exp = value.exp();
        exp / (1.0 + exp)
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|score| (score - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|value| value / total).collect()
}
