//! API models for purchases.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::billing::{ModelTier, PurchaseOutcome};

/// Which tiers the user has unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaidModels {
    pub model1: bool,
    pub model2: bool,
    pub model3: bool,
}

impl From<[bool; ModelTier::COUNT]> for PaidModels {
    fn from([model1, model2, model3]: [bool; ModelTier::COUNT]) -> Self {
        Self { model1, model2, model3 }
    }
}

/// Result of a completed purchase
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    #[schema(example = "Payment successful")]
    pub message: String,
    pub paid_models: PaidModels,
    /// Credits granted by this purchase
    #[schema(example = 60)]
    pub credits_added: i64,
    /// Balance after the purchase
    #[schema(example = 120)]
    pub total_credits: i64,
    /// Provider reference for the charge
    pub receipt_id: String,
}

impl From<PurchaseOutcome> for PaymentResponse {
    fn from(outcome: PurchaseOutcome) -> Self {
        Self {
            message: "Payment successful".to_string(),
            paid_models: outcome.row.unlocked.into(),
            credits_added: outcome.credits_added,
            total_credits: outcome.row.credits,
            receipt_id: outcome.receipt_id,
        }
    }
}
