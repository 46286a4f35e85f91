//! Standard-scaled logistic regression, loaded from a JSON artifact.
//!
//! ```json
//! {
//!   "scaler": { "mean": [..5], "scale": [..5] },
//!   "coefficients": [..5],
//!   "intercept": -0.42
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::{Features, InferenceError};
use crate::billing::tiers::ModelTier;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalerArtifact {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// On-disk form of a trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelArtifact {
    pub scaler: ScalerArtifact,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// A validated model, ready to score feature vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    mean: [f64; Features::LEN],
    scale: [f64; Features::LEN],
    coefficients: [f64; Features::LEN],
    intercept: f64,
}

fn fixed<const N: usize>(tier: ModelTier, field: &'static str, values: &[f64]) -> Result<[f64; N], InferenceError> {
    <[f64; N]>::try_from(values).map_err(|_| InferenceError::ShapeMismatch {
        tier,
        field,
        expected: N,
        found: values.len(),
    })
}

impl LinearModel {
    pub fn from_artifact(tier: ModelTier, artifact: &ModelArtifact) -> Result<Self, InferenceError> {
        let mean = fixed(tier, "scaler.mean", &artifact.scaler.mean)?;
        let scale: [f64; Features::LEN] = fixed(tier, "scaler.scale", &artifact.scaler.scale)?;
        let coefficients = fixed(tier, "coefficients", &artifact.coefficients)?;

        if scale.iter().any(|s| *s == 0.0) {
            return Err(InferenceError::InvalidArtifact {
                tier,
                reason: "scaler.scale contains a zero".to_string(),
            });
        }
        let all_finite = mean
            .iter()
            .chain(scale.iter())
            .chain(coefficients.iter())
            .chain(std::iter::once(&artifact.intercept))
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(InferenceError::InvalidArtifact {
                tier,
                reason: "artifact contains non-finite values".to_string(),
            });
        }

        Ok(Self {
            mean,
            scale,
            coefficients,
            intercept: artifact.intercept,
        })
    }

    /// Signed distance from the decision boundary, in log-odds.
    pub fn decision_function(&self, features: &Features) -> f64 {
        features
            .as_array()
            .iter()
            .enumerate()
            .map(|(i, x)| self.coefficients[i] * (x - self.mean[i]) / self.scale[i])
            .sum::<f64>()
            + self.intercept
    }

    /// Binary label: 1 when the positive class has probability of at least one half.
    pub fn predict(&self, features: &Features) -> i64 {
        i64::from(self.decision_function(features) >= 0.0)
    }
}
