use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Tolerance used when checking that a distribution sums to one
pub const PROBABILITY_TOLERANCE: f64 = 1e-4;

/// Classification result for a single ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted category name
    pub label: String,

    /// Class index the label was resolved from
    pub index: usize,

    /// Probability mass on the predicted class (0.0 - 1.0)
    pub confidence: f64,

    /// Probability of every class, keyed by category name
    pub probabilities: BTreeMap<String, f64>,
}

impl Prediction {
    /// Confidence as a percentage rounded to two decimals
    pub fn confidence_percent(&self) -> f64 {
        (self.confidence * 100.0 * 100.0).round() / 100.0
    }

    /// Whether the distribution is well formed
    pub fn is_normalized(&self) -> bool {
        let in_range = self
            .probabilities
            .values()
            .all(|p| (0.0..=1.0).contains(p));
        let total: f64 = self.probabilities.values().sum();
        in_range && (total - 1.0).abs() <= PROBABILITY_TOLERANCE
    }
}

/// Static description of the loaded model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Artifact directory the session was built from
    pub artifact_path: PathBuf,

    /// Compute device (cpu, cuda, metal)
    pub device: String,

    /// Category names ordered by class index
    pub labels: Vec<String>,

    /// Fixed encoding length in tokens
    pub max_length: usize,
}
