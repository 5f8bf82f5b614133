use serde::{Deserialize, Serialize};

use super::policy::RiskCategory;

/// Inclusive upper bounds of the four lower risk tiers; anything above `high` is very high.
///
/// Cut points belong to a trained model, so they are validated data rather than constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TierBounds", into = "TierBounds")]
pub struct RiskTierThresholds {
    very_low: f64,
    low: f64,
    moderate: f64,
    high: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct TierBounds {
    very_low: f64,
    low: f64,
    moderate: f64,
    high: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    #[error("{name} cut point {value} must be a probability between 0 and 1")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("cut points must be strictly ascending ({lower} >= {upper})")]
    NotAscending { lower: f64, upper: f64 },
}

impl RiskTierThresholds {
    pub fn new(very_low: f64, low: f64, moderate: f64, high: f64) -> Result<Self, ThresholdError> {
        let named = [
            ("very_low", very_low),
            ("low", low),
            ("moderate", moderate),
            ("high", high),
        ];
        for (name, value) in named {
            if !(0.0..=1.0).contains(&value) {
                return Err(ThresholdError::OutOfRange { name, value });
            }
        }
        for pair in named.windows(2) {
            let (lower, upper) = (pair[0].1, pair[1].1);
            if lower >= upper {
                return Err(ThresholdError::NotAscending { lower, upper });
            }
        }

        Ok(Self {
            very_low,
            low,
            moderate,
            high,
        })
    }

    pub fn very_low(&self) -> f64 {
        self.very_low
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn moderate(&self) -> f64 {
        self.moderate
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    /// First tier whose upper bound is `>= probability`; a boundary value takes the lower tier.
    pub fn categorize(&self, probability: f64) -> RiskCategory {
        if probability <= self.very_low {
            RiskCategory::VeryLow
        } else if probability <= self.low {
            RiskCategory::Low
        } else if probability <= self.moderate {
            RiskCategory::Moderate
        } else if probability <= self.high {
            RiskCategory::High
        } else {
            RiskCategory::VeryHigh
        }
    }
}

impl Default for RiskTierThresholds {
    fn default() -> Self {
        Self {
            very_low: 0.10,
            low: 0.20,
            moderate: 0.40,
            high: 0.60,
        }
    }
}

impl TryFrom<TierBounds> for RiskTierThresholds {
    type Error = ThresholdError;

    fn try_from(bounds: TierBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.very_low, bounds.low, bounds.moderate, bounds.high)
    }
}

impl From<RiskTierThresholds> for TierBounds {
    fn from(thresholds: RiskTierThresholds) -> Self {
        Self {
            very_low: thresholds.very_low,
            low: thresholds.low,
            moderate: thresholds.moderate,
            high: thresholds.high,
        }
    }
}

/// Decision engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionConfig {
    pub tier_thresholds: RiskTierThresholds,
}
