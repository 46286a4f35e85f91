//! The credit-gated prediction gateway.
//!
//! A prediction request flows [`admission`] → inference → [`settlement`], serialized per user by
//! the [`gateway::PredictionGateway`]. A purchase flows through the payment provider straight
//! into the ledger via [`purchase::purchase`].
//!
//! # Rate tables
//!
//! | tier   | inference cost | purchase grant |
//! |--------|----------------|----------------|
//! | model1 | 1              | 30             |
//! | model2 | 2              | 60             |
//! | model3 | 3              | 90             |
//! | all    | -              | 100, unlocks every tier |

pub mod admission;
pub mod gateway;
pub mod ledger;
pub mod memory;
pub mod purchase;
pub mod settlement;
pub mod tiers;

use axum::http::StatusCode;

use crate::{db::errors::DbError, inference::InferenceError, payment_providers::PaymentError};

pub use gateway::{PredictionGateway, PredictionOutcome};
pub use ledger::{LedgerRow, LedgerStore, LedgerTransaction, TransactionKind};
pub use memory::MemoryLedgerStore;
pub use purchase::{PurchaseOutcome, purchase};
pub use tiers::{ModelTier, PurchaseOption};

/// Everything that can stop a purchase or a paid prediction.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Unknown tier or purchase option
    #[error("Invalid {expected} '{value}'")]
    InvalidTier { value: String, expected: &'static str },

    /// The user has not bought access: to anything at all (`None`), or to this tier
    #[error("{}", payment_required_message(.tier))]
    PaymentRequired { tier: Option<ModelTier> },

    /// The tier is unlocked but the balance does not cover one prediction
    #[error("Not enough credits for {tier}: {required} required, {available} available")]
    InsufficientCredits {
        tier: ModelTier,
        required: i64,
        available: i64,
    },

    /// The model could not produce a prediction; nothing was charged
    #[error("Prediction failed: {0}")]
    Inference(#[from] InferenceError),

    /// The payment provider refused or failed the charge; nothing was granted
    #[error("Payment failed: {0}")]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Ledger(#[from] DbError),
}

fn payment_required_message(tier: &Option<ModelTier>) -> String {
    match tier {
        Some(tier) => format!("Payment required for {tier}"),
        None => "Payment required: no models have been purchased yet".to_string(),
    }
}

impl BillingError {
    /// Stable machine-readable code, so callers can tell "buy access" from "top up".
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::InvalidTier { .. } => "invalid_tier",
            BillingError::PaymentRequired { .. } => "payment_required",
            BillingError::InsufficientCredits { .. } => "insufficient_credits",
            BillingError::Inference(_) => "inference_failed",
            BillingError::Payment(_) => "payment_failed",
            BillingError::Ledger(_) => "ledger_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::InvalidTier { .. } => StatusCode::BAD_REQUEST,
            BillingError::PaymentRequired { .. } | BillingError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            BillingError::Inference(InferenceError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            BillingError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BillingError::Payment(e) => StatusCode::from(e),
            BillingError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_codes() {
        let invalid = BillingError::InvalidTier {
            value: "model9".to_string(),
            expected: "model name",
        };
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.to_string(), "Invalid model name 'model9'");

        let locked = BillingError::PaymentRequired {
            tier: Some(ModelTier::Model1),
        };
        assert_eq!(locked.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(locked.to_string(), "Payment required for model1");

        let broke = BillingError::InsufficientCredits {
            tier: ModelTier::Model3,
            required: 3,
            available: 1,
        };
        assert_eq!(broke.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_ne!(broke.code(), locked.code());

        let timeout = BillingError::Inference(InferenceError::Timeout {
            tier: ModelTier::Model2,
            timeout: Duration::from_secs(1),
        });
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let declined = BillingError::Payment(PaymentError::Declined("card".to_string()));
        assert_eq!(declined.status_code(), StatusCode::BAD_REQUEST);
        assert!(declined.to_string().starts_with("Payment failed"));

        let unreachable = BillingError::Payment(PaymentError::ProviderApi("connection reset".to_string()));
        assert_eq!(unreachable.status_code(), StatusCode::BAD_GATEWAY);
    }
}
