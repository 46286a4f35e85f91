//! Payment provider abstraction layer
//!
//! A purchase asks the configured [`PaymentProvider`] to charge the user for a
//! [`PurchaseOption`] before any credits are granted. The only shipped provider is
//! [`dummy::DummyProvider`], which settles instantly; a real gateway slots in behind the same
//! trait.

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::{api::models::users::CurrentUser, billing::tiers::PurchaseOption, config::PaymentConfig};

pub mod dummy;

/// Create a payment provider from configuration
///
/// This is the single point where we convert config into provider instances.
/// Adding a new provider requires adding a match arm here.
pub fn create_provider(config: PaymentConfig) -> Box<dyn PaymentProvider> {
    match config {
        PaymentConfig::Dummy(dummy_config) => Box::new(dummy::DummyProvider::from(dummy_config)),
    }
}

/// Result type for payment provider operations
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors that can occur during payment processing
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Payment provider API error: {0}")]
    ProviderApi(String),

    #[error("Invalid payment data: {0}")]
    InvalidData(String),
}

impl From<&PaymentError> for StatusCode {
    fn from(err: &PaymentError) -> Self {
        match err {
            PaymentError::Declined(_) | PaymentError::InvalidData(_) => StatusCode::BAD_REQUEST,
            PaymentError::ProviderApi(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Evidence of a successful charge, recorded against the resulting ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    /// Provider-issued identifier for the charge
    pub id: String,
    pub option: PurchaseOption,
}

/// Abstract payment provider interface
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Charge `user` for `option`.
    ///
    /// An `Err` means no money moved and the caller must not grant anything.
    async fn charge(&self, user: &CurrentUser, option: PurchaseOption) -> Result<PaymentReceipt>;
}
