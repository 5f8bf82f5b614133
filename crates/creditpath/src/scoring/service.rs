use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::artifacts::ArtifactBundle;
use super::decision::{DecisionConfig, DecisionEngine, Recommendation, RiskTierThresholds};
use super::domain::ApplicantRecord;
use super::predict::{InferenceError, ProbabilityPredictor};
use super::preprocess::{ClampAdjustment, FeaturePreprocessor, PreprocessOptions, ValidationError};

/// Complete outcome of one scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub probability: f64,
    pub class_probability_map: BTreeMap<String, f64>,
    pub detected_default_label: String,
    pub recommendation: Recommendation,
    pub model_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<ClampAdjustment>,
}

/// Error raised by the scoring pipeline. No partial result accompanies it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Service composing preprocessing, inference, and the decision engine over one bundle.
#[derive(Debug, Clone)]
pub struct CreditScorer {
    bundle: Arc<ArtifactBundle>,
    preprocessor: FeaturePreprocessor,
    predictor: ProbabilityPredictor,
    engine: DecisionEngine,
}

impl CreditScorer {
    pub fn new(bundle: Arc<ArtifactBundle>, config: DecisionConfig) -> Self {
        Self {
            bundle,
            preprocessor: FeaturePreprocessor::default(),
            predictor: ProbabilityPredictor::new(),
            engine: DecisionEngine::new(config),
        }
    }

    /// Tier thresholds come from the override, else the bundle manifest, else the defaults.
    pub fn from_bundle(
        bundle: Arc<ArtifactBundle>,
        threshold_override: Option<RiskTierThresholds>,
    ) -> Self {
        let tier_thresholds = threshold_override
            .or(bundle.manifest().tier_thresholds)
            .unwrap_or_default();
        Self::new(bundle, DecisionConfig { tier_thresholds })
    }

    pub fn with_preprocess_options(mut self, options: PreprocessOptions) -> Self {
        self.preprocessor = FeaturePreprocessor::new(options);
        self
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    pub fn decision_config(&self) -> &DecisionConfig {
        self.engine.config()
    }

    /// Run every stage for one applicant.
    pub fn score(&self, record: &ApplicantRecord) -> Result<ScoringResult, ScoringError> {
        let vector = self.preprocessor.prepare(record, &self.bundle)?;
        let classification = self.predictor.predict(&vector, &self.bundle)?;
        let recommendation = self.engine.recommend(classification.probability, record);

        debug!(
            sub_grade = %record.sub_grade,
            probability = classification.probability,
            decision = %recommendation.decision,
            risk_category = %recommendation.risk_category,
            "scored applicant"
        );

        Ok(ScoringResult {
            probability: classification.probability,
            class_probability_map: classification.class_probabilities,
            detected_default_label: classification.default_label,
            recommendation,
            model_version: self.bundle.model_version().to_string(),
            adjustments: vector.adjustments().to_vec(),
        })
    }
}
