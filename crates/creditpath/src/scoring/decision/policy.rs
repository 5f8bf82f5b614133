use std::fmt;

use serde::{Deserialize, Serialize};

/// Lending outcome, ordered from most to least favorable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LendingDecision {
    Approve,
    ApproveWithConditions,
    Decline,
}

impl LendingDecision {
    pub fn label(&self) -> &'static str {
        match self {
            LendingDecision::Approve => "APPROVE",
            LendingDecision::ApproveWithConditions => "APPROVE_WITH_CONDITIONS",
            LendingDecision::Decline => "DECLINE",
        }
    }
}

impl fmt::Display for LendingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Probability band, ordered from least to most risky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 5] = [
        RiskCategory::VeryLow,
        RiskCategory::Low,
        RiskCategory::Moderate,
        RiskCategory::High,
        RiskCategory::VeryHigh,
    ];

    pub fn decision(&self) -> LendingDecision {
        match self {
            RiskCategory::VeryLow | RiskCategory::Low => LendingDecision::Approve,
            RiskCategory::Moderate => LendingDecision::ApproveWithConditions,
            RiskCategory::High | RiskCategory::VeryHigh => LendingDecision::Decline,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskCategory::VeryLow => "VERY_LOW",
            RiskCategory::Low => "LOW",
            RiskCategory::Moderate => "MODERATE",
            RiskCategory::High => "HIGH",
            RiskCategory::VeryHigh => "VERY_HIGH",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
