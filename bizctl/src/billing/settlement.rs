//! Charging for a prediction once its outcome is known.

use tracing::{debug, warn};

use super::{
    BillingError,
    admission::{self, Admitted},
    ledger::LedgerStore,
};
use crate::{db::errors::DbError, inference::InferenceError, types::UserId};

/// A charged prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub label: i64,
    pub credits_left: i64,
}

/// Debit the ledger for an admitted prediction, or pass its failure through untouched.
///
/// A failed inference never reaches the ledger. A successful one is charged with a conditional
/// debit; if that is refused (another request spent the balance first), the current row is
/// re-checked so the caller gets the same error admission would now return.
pub async fn settle(
    ledger: &dyn LedgerStore,
    user_id: UserId,
    admitted: Admitted,
    inference: Result<i64, InferenceError>,
) -> Result<Settlement, BillingError> {
    let label = inference.inspect_err(|e| warn!("Inference on {} failed, not charging: {e}", admitted.tier))?;

    match ledger.debit(user_id, admitted.tier).await? {
        Some(row) => {
            debug!("Charged {} credits for {}, {} left", admitted.cost, admitted.tier, row.credits);
            Ok(Settlement {
                label,
                credits_left: row.credits,
            })
        }
        None => {
            let current = ledger.get(user_id).await?;
            match admission::authorize(current.as_ref(), admitted.tier) {
                Err(rejection) => Err(rejection),
                Ok(_) => Err(BillingError::Ledger(DbError::Other(anyhow::anyhow!(
                    "ledger refused a {} debit that admission allows",
                    admitted.tier
                )))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{LedgerRow, MemoryLedgerStore, tiers::ModelTier};
    use uuid::Uuid;

    fn funded(store: &MemoryLedgerStore, credits: i64) -> UserId {
        let user_id = Uuid::new_v4();
        store.insert(LedgerRow {
            user_id,
            unlocked: [true, true, true],
            credits,
        });
        user_id
    }

    fn admitted(tier: ModelTier) -> Admitted {
        Admitted {
            tier,
            cost: tier.inference_cost(),
        }
    }

    #[tokio::test]
    async fn test_failed_inference_is_not_charged() {
        let store = MemoryLedgerStore::new();
        let user_id = funded(&store, 5);

        let failure = Err(InferenceError::InvalidArtifact {
            tier: ModelTier::Model1,
            reason: "truncated".to_string(),
        });
        let err = settle(&store, user_id, admitted(ModelTier::Model1), failure).await.unwrap_err();

        assert!(matches!(err, BillingError::Inference(InferenceError::InvalidArtifact { .. })));
        assert_eq!(store.get(user_id).await.unwrap().unwrap().credits, 5);
        assert_eq!(store.count_transactions(user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_success_is_charged_once() {
        let store = MemoryLedgerStore::new();
        let user_id = funded(&store, 3);

        let settled = settle(&store, user_id, admitted(ModelTier::Model3), Ok(1)).await.unwrap();
        assert_eq!(settled, Settlement { label: 1, credits_left: 0 });
        assert_eq!(store.get(user_id).await.unwrap().unwrap().credits, 0);
    }

    #[tokio::test]
    async fn test_balance_spent_elsewhere_reports_insufficient_credits() {
        let store = MemoryLedgerStore::new();
        let user_id = funded(&store, 1);

        // Admitted against a stale view of the balance
        let err = settle(&store, user_id, admitted(ModelTier::Model2), Ok(0)).await.unwrap_err();
        assert!(matches!(
            err,
            BillingError::InsufficientCredits {
                tier: ModelTier::Model2,
                available: 1,
                ..
            }
        ));
        assert_eq!(store.get(user_id).await.unwrap().unwrap().credits, 1);
    }
}
