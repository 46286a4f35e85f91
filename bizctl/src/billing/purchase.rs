//! Buying model access and credits.

use tracing::{info, instrument};

use super::{BillingError, ledger::LedgerRow, ledger::LedgerStore, tiers::PurchaseOption};
use crate::{api::models::users::CurrentUser, payment_providers::PaymentProvider, types::abbrev_uuid};

/// The ledger after a completed purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOutcome {
    pub option: PurchaseOption,
    pub credits_added: i64,
    pub row: LedgerRow,
    pub receipt_id: String,
}

/// Charge `user` for `option_name` and apply it to their ledger.
///
/// The option is validated before the provider is contacted, and a failed charge leaves the
/// ledger untouched. Purchases are not deduplicated: buying the same option twice grants it twice.
#[instrument(skip(ledger, payments, user), fields(user_id = %abbrev_uuid(&user.id)))]
pub async fn purchase(
    ledger: &dyn LedgerStore,
    payments: &dyn PaymentProvider,
    user: &CurrentUser,
    option_name: &str,
) -> Result<PurchaseOutcome, BillingError> {
    let option: PurchaseOption = option_name.parse().map_err(|_| BillingError::InvalidTier {
        value: option_name.to_string(),
        expected: "payment option",
    })?;

    let receipt = payments.charge(user, option).await?;
    let row = ledger.credit_and_unlock(user.id, option, &receipt.id).await?;
    let credits_added = option.terms().credits_granted;

    info!("Purchase of {option} added {credits_added} credits, balance now {}", row.credits);
    Ok(PurchaseOutcome {
        option,
        credits_added,
        row,
        receipt_id: receipt.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        billing::{MemoryLedgerStore, tiers::ModelTier},
        payment_providers::dummy::DummyProvider,
    };
    use uuid::Uuid;

    fn buyer() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "buyer@example.com".to_string(),
            is_superuser: false,
        }
    }

    #[tokio::test]
    async fn test_bundle_purchase() {
        let store = MemoryLedgerStore::new();
        let user = buyer();

        let outcome = purchase(&store, &DummyProvider::new(false), &user, "all").await.unwrap();
        assert_eq!(outcome.credits_added, 100);
        assert_eq!(outcome.row.credits, 100);
        assert!(ModelTier::ALL.iter().all(|tier| outcome.row.is_unlocked(*tier)));
    }

    #[tokio::test]
    async fn test_repeat_purchase_stacks() {
        let store = MemoryLedgerStore::new();
        let user = buyer();
        let provider = DummyProvider::new(false);

        purchase(&store, &provider, &user, "model2").await.unwrap();
        let outcome = purchase(&store, &provider, &user, "model2").await.unwrap();

        assert_eq!(outcome.row.credits, 120);
        assert_eq!(outcome.row.unlocked, [false, true, false]);
        assert_eq!(store.count_transactions(user.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalid_option_is_rejected_before_charging() {
        let store = MemoryLedgerStore::new();
        let user = buyer();

        let err = purchase(&store, &DummyProvider::new(true), &user, "model4").await.unwrap_err();
        // An unknown option wins over the declining provider: the provider was never asked
        assert!(matches!(err, BillingError::InvalidTier { expected: "payment option", .. }));
        assert!(store.get(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_declined_payment_changes_nothing() {
        let store = MemoryLedgerStore::new();
        let user = buyer();
        purchase(&store, &DummyProvider::new(false), &user, "model1").await.unwrap();

        let err = purchase(&store, &DummyProvider::new(true), &user, "all").await.unwrap_err();
        assert!(matches!(err, BillingError::Payment(_)));

        let row = store.get(user.id).await.unwrap().unwrap();
        assert_eq!(row.credits, 30);
        assert_eq!(row.unlocked, [true, false, false]);
        assert_eq!(store.count_transactions(user.id).await.unwrap(), 1);
    }
}
