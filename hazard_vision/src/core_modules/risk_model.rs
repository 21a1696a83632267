// THEORY:
// The `RiskModel` is the leaf of the engine. It turns the ordered list of hazard
// labels seen in one frame into a single number and a three-tier level.
//
// Key architectural principles:
// 1.  **Injected Weights**: The weight table is plain data handed in at
//     construction. `RiskModel::default()` carries the standard table, and tests
//     can build models with alternate tables.
// 2.  **Repetition Counts**: Three people in frame are three times as dangerous as
//     one, so the score is a straight sum over the sequence with duplicates.
// 3.  **Membership Is Hazard**: A label is hazardous iff it has a weight entry.
//     Unknown classes are still drawn by the frame processor but never reach
//     the score.
// 4.  **Fixed Thresholds**: The level is a pure function of the score.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::RecordParseError;

/// Scores at or above this value are `High`.
pub const HIGH_RISK_THRESHOLD: u32 = 6;
/// Scores at or above this value (and below `HIGH_RISK_THRESHOLD`) are `Medium`.
pub const MEDIUM_RISK_THRESHOLD: u32 = 3;

const DEFAULT_WEIGHTS: [(&str, u32); 10] = [
    ("person", 4),
    ("dog", 3),
    ("cat", 2),
    ("bird", 3),
    ("car", 2),
    ("truck", 4),
    ("motorcycle", 2),
    ("suitcase", 1),
    ("backpack", 1),
    ("handbag", 1),
];

/// The three-tier risk classification of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classifies a score against the fixed thresholds, highest first.
    pub fn from_score(score: u32) -> Self {
        if score >= HIGH_RISK_THRESHOLD {
            RiskLevel::High
        } else if score >= MEDIUM_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// The token written to the `NIVEAU=` field of a log line.
    pub fn token(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    /// Whether a frame at this level is worth persisting.
    pub fn is_alerting(&self) -> bool {
        matches!(self, RiskLevel::Medium | RiskLevel::High)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for RiskLevel {
    type Err = RecordParseError;

    /// Accepts the current tokens and the legacy French ones found in older logs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "LOW" | "FAIBLE" => Ok(RiskLevel::Low),
            "MEDIUM" | "MOYEN" => Ok(RiskLevel::Medium),
            "HIGH" | "ÉLEVÉ" | "ELEVE" => Ok(RiskLevel::High),
            other => Err(RecordParseError::UnknownLevel(other.to_string())),
        }
    }
}

/// The result of scoring one frame's hazards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
}

impl RiskAssessment {
    pub fn from_score(score: u32) -> Self {
        Self {
            score,
            level: RiskLevel::from_score(score),
        }
    }
}

/// Maps hazard labels to weights and classifies the accumulated score.
#[derive(Debug, Clone)]
pub struct RiskModel {
    weights: HashMap<String, u32>,
}

impl RiskModel {
    pub fn new(weights: HashMap<String, u32>) -> Self {
        Self { weights }
    }

    /// True iff `label` has an entry in the weight table.
    pub fn is_hazardous(&self, label: &str) -> bool {
        self.weights.contains_key(label)
    }

    /// The per-occurrence weight of a label, 0 for anything not in the table.
    pub fn weight(&self, label: &str) -> u32 {
        self.weights.get(label).copied().unwrap_or(0)
    }

    /// Sums the weights of `hazard_labels`, saturating at `u32::MAX`.
    pub fn score_and_classify<S: AsRef<str>>(&self, hazard_labels: &[S]) -> RiskAssessment {
        let score = hazard_labels
            .iter()
            .map(|label| self.weight(label.as_ref()))
            .fold(0u32, u32::saturating_add);
        RiskAssessment::from_score(score)
    }
}

impl Default for RiskModel {
    fn default() -> Self {
        Self::new(
            DEFAULT_WEIGHTS
                .iter()
                .map(|(label, weight)| (label.to_string(), *weight))
                .collect(),
        )
    }
}
