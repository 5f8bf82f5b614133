use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::super::domain::normalize_sub_grade;

/// Ordinal encoding of sub-grade labels, keyed by normalized (trimmed, uppercased) label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct SubGradeTable {
    codes: BTreeMap<String, f64>,
}

impl SubGradeTable {
    pub fn encode(&self, label: &str) -> Option<f64> {
        self.codes.get(&normalize_sub_grade(label)).copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Known labels ordered by code, then label.
    pub fn allowed_labels(&self) -> Vec<String> {
        let mut entries: Vec<(&String, f64)> =
            self.codes.iter().map(|(label, code)| (label, *code)).collect();
        entries.sort_by(|left, right| left.1.total_cmp(&right.1).then_with(|| left.0.cmp(right.0)));
        entries.into_iter().map(|(label, _)| label.clone()).collect()
    }
}

impl TryFrom<BTreeMap<String, f64>> for SubGradeTable {
    type Error = String;

    fn try_from(raw: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut codes = BTreeMap::new();
        for (label, code) in raw {
            let normalized = normalize_sub_grade(&label);
            if normalized.is_empty() {
                return Err("sub-grade table contains an empty label".to_string());
            }
            if !code.is_finite() {
                return Err(format!("sub-grade '{label}' has a non-finite code"));
            }
            match codes.insert(normalized.clone(), code) {
                Some(previous) if previous != code => {
                    return Err(format!(
                        "sub-grade '{normalized}' maps to both {previous} and {code}"
                    ));
                }
                _ => {}
            }
        }
        Ok(Self { codes })
    }
}

impl From<SubGradeTable> for BTreeMap<String, f64> {
    fn from(table: SubGradeTable) -> Self {
        table.codes
    }
}
