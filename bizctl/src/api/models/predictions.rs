use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::billing::PredictionOutcome;

/// A charged prediction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct PredictionResponse {
    /// Class label produced by the model (0 or 1)
    #[schema(example = 1)]
    pub prediction: i64,
    /// Balance after this prediction was paid for
    #[schema(example = 27)]
    pub credits_left: i64,
}

impl From<PredictionOutcome> for PredictionResponse {
    fn from(outcome: PredictionOutcome) -> Self {
        Self {
            prediction: outcome.label,
            credits_left: outcome.credits_left,
        }
    }
}
