//! Dummy payment provider implementation
//!
//! Every charge succeeds instantly without contacting anyone. Setting
//! `payment.dummy.simulate_decline` makes every charge fail instead, which exercises the
//! no-mutation path of a declined purchase.

use async_trait::async_trait;

use crate::{
    api::models::users::CurrentUser,
    billing::tiers::PurchaseOption,
    config::DummyConfig,
    payment_providers::{PaymentError, PaymentProvider, PaymentReceipt, Result},
};

/// Dummy payment provider that approves (or declines) every charge
pub struct DummyProvider {
    simulate_decline: bool,
}

impl DummyProvider {
    /// Create a new Dummy provider
    pub fn new(simulate_decline: bool) -> Self {
        Self { simulate_decline }
    }
}

impl From<DummyConfig> for DummyProvider {
    fn from(config: DummyConfig) -> Self {
        Self::new(config.simulate_decline)
    }
}

#[async_trait]
impl PaymentProvider for DummyProvider {
    async fn charge(&self, user: &CurrentUser, option: PurchaseOption) -> Result<PaymentReceipt> {
        if self.simulate_decline {
            tracing::info!("Dummy provider declining {} purchase for user {}", option, user.id);
            return Err(PaymentError::Declined("simulated decline".to_string()));
        }

        let receipt = PaymentReceipt {
            id: format!("dummy_{}_{}", user.id, uuid::Uuid::new_v4()),
            option,
        };
        tracing::info!("Dummy provider settled {} purchase for user {} as {}", option, user.id, receipt.id);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "buyer@example.com".to_string(),
            is_superuser: false,
        }
    }

    #[tokio::test]
    async fn test_dummy_settles() {
        let provider = DummyProvider::new(false);
        let buyer = user();
        let receipt = provider.charge(&buyer, PurchaseOption::All).await.unwrap();

        assert_eq!(receipt.option, PurchaseOption::All);
        assert!(receipt.id.starts_with(&format!("dummy_{}_", buyer.id)));
    }

    #[tokio::test]
    async fn test_receipts_are_unique() {
        let provider = DummyProvider::new(false);
        let buyer = user();
        let a = provider.charge(&buyer, PurchaseOption::Model1).await.unwrap();
        let b = provider.charge(&buyer, PurchaseOption::Model1).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_simulated_decline() {
        let provider = DummyProvider::from(DummyConfig { simulate_decline: true });
        let err = provider.charge(&user(), PurchaseOption::Model2).await.unwrap_err();
        assert!(matches!(err, PaymentError::Declined(_)));
    }
}
