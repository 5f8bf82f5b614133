//! Loan default scoring: artifact loading, feature preparation, inference, and decisions.

pub mod artifacts;
pub mod decision;
pub mod domain;
pub mod predict;
pub mod preprocess;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use artifacts::{
    ArtifactBundle, ArtifactKind, ArtifactLoadError, ArtifactManifest, ArtifactStore, ClassLabel,
    Classifier, ClassifierArtifact, StandardScaler, SubGradeTable,
};
pub use decision::{
    DecisionConfig, DecisionEngine, LendingDecision, Recommendation, RiskCategory,
    RiskTierThresholds, ThresholdError,
};
pub use domain::ApplicantRecord;
pub use predict::{
    ClassificationResult, DefaultClass, DefaultClassSource, InferenceError, ProbabilityPredictor,
};
pub use preprocess::{
    ClampAdjustment, FeaturePreprocessor, FeatureVector, PreprocessOptions, ValidationError,
};
pub use router::{scoring_router, PredictionResponse};
pub use service::{CreditScorer, ScoringError, ScoringResult};
