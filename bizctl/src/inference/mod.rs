//! Model inference behind the prediction gateway.
//!
//! The gateway only sees the [`Predictor`] trait. Production uses [`ModelRegistry`], which loads
//! one scaled logistic-regression artifact per tier from disk; tests substitute stubs.

pub mod linear;
pub mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use utoipa::ToSchema;

use crate::billing::tiers::ModelTier;

pub use linear::{LinearModel, ModelArtifact};
pub use registry::ModelRegistry;

/// Loan applicant features, in the order the models were trained on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Features {
    #[schema(example = 1.0)]
    pub married: f64,
    #[schema(example = 5000.0)]
    pub income: f64,
    #[schema(example = 1.0)]
    pub education: f64,
    #[schema(example = 150.0)]
    pub loan_amount: f64,
    #[schema(example = 1.0)]
    pub credit_history: f64,
}

impl Features {
    pub const LEN: usize = 5;

    pub fn as_array(&self) -> [f64; Self::LEN] {
        [self.married, self.income, self.education, self.loan_amount, self.credit_history]
    }
}

/// Why a prediction could not be produced. None of these touch the ledger.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InferenceError {
    #[error("model {tier} is not available (no artifact at {})", .path.display())]
    ModelUnavailable { tier: ModelTier, path: PathBuf },

    #[error("model {tier} has an invalid artifact: {reason}")]
    InvalidArtifact { tier: ModelTier, reason: String },

    #[error("model {tier} expects {expected} features but its {field} has {found}")]
    ShapeMismatch {
        tier: ModelTier,
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("model {tier} did not answer within {timeout:?}")]
    Timeout { tier: ModelTier, timeout: Duration },
}

/// A source of predictions: `predict(tier, features) -> label`.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, tier: ModelTier, features: &Features) -> Result<i64, InferenceError>;
}
