mod config;
mod policy;
mod rules;

pub use config::{DecisionConfig, RiskTierThresholds, ThresholdError};
pub use policy::{LendingDecision, RiskCategory};

use serde::{Deserialize, Serialize};

use super::domain::ApplicantRecord;
use rules::{reasoning_for, BorrowerSignals};

/// Pure mapping from a default probability and the raw record to a recommendation.
///
/// Total over its inputs: every probability lands in exactly one tier (values above every
/// cut point, and NaN, land in the highest tier) and no call logs or performs I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine {
    config: DecisionConfig,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    pub fn recommend(&self, probability: f64, record: &ApplicantRecord) -> Recommendation {
        let risk_category = self.config.tier_thresholds.categorize(probability);
        let signals = BorrowerSignals::from_record(record);

        Recommendation {
            decision: risk_category.decision(),
            risk_category,
            probability,
            reasoning: reasoning_for(risk_category, probability, &signals),
        }
    }
}

/// Lending decision with the reasoning trail that justifies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub decision: LendingDecision,
    pub risk_category: RiskCategory,
    pub probability: f64,
    pub reasoning: Vec<String>,
}
