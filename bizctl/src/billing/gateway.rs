//! The prediction gateway: admission, inference and settlement as one unit per user.

use dashmap::DashMap;
use std::{sync::Arc, time::Duration};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument};

use super::{
    BillingError, admission,
    ledger::LedgerStore,
    settlement::{self, Settlement},
    tiers::ModelTier,
};
use crate::{
    inference::{Features, InferenceError, Predictor},
    types::{UserId, abbrev_uuid},
};

/// A charged prediction, as returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionOutcome {
    pub tier: ModelTier,
    pub label: i64,
    pub credits_left: i64,
}

type UserLocks = DashMap<UserId, Arc<Mutex<()>>>;

/// Runs paid predictions against the ledger.
///
/// Requests for the same user are serialized from admission through settlement, so two
/// concurrent requests cannot both be admitted on a balance that covers one. Requests for
/// different users run concurrently. The ledger's conditional debit still guards against other
/// processes sharing the same store.
pub struct PredictionGateway {
    ledger: Arc<dyn LedgerStore>,
    predictor: Arc<dyn Predictor>,
    inference_timeout: Option<Duration>,
    user_locks: UserLocks,
}

/// Holds a user's slot for the duration of one request and frees the map entry afterwards.
struct UserSlot<'a> {
    locks: &'a UserLocks,
    user_id: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserSlot<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map's own reference left means nobody holds or waits on this lock
        self.locks.remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl PredictionGateway {
    pub fn new(ledger: Arc<dyn LedgerStore>, predictor: Arc<dyn Predictor>, inference_timeout: Option<Duration>) -> Self {
        Self {
            ledger,
            predictor,
            inference_timeout,
            user_locks: DashMap::new(),
        }
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    /// Run one prediction on `model_name` for `user_id`, charging only if it succeeds.
    #[instrument(skip(self, features), fields(user_id = %abbrev_uuid(&user_id)))]
    pub async fn predict(&self, user_id: UserId, model_name: &str, features: &Features) -> Result<PredictionOutcome, BillingError> {
        let tier = admission::resolve_tier(model_name)?;

        let mut slot = UserSlot {
            locks: &self.user_locks,
            user_id,
            guard: None,
        };
        let lock = self.user_locks.entry(user_id).or_default().value().clone();
        slot.guard = Some(lock.lock_owned().await);

        let row = self.ledger.get(user_id).await?;
        let admitted = admission::authorize(row.as_ref(), tier)?;
        let inference = self.infer(tier, features).await;
        let Settlement { label, credits_left } = settlement::settle(self.ledger.as_ref(), user_id, admitted, inference).await?;

        info!("Prediction on {tier} charged {} credits, {credits_left} left", admitted.cost);
        Ok(PredictionOutcome {
            tier,
            label,
            credits_left,
        })
    }

    async fn infer(&self, tier: ModelTier, features: &Features) -> Result<i64, InferenceError> {
        let call = self.predictor.predict(tier, features);
        match self.inference_timeout {
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| InferenceError::Timeout { tier, timeout })?,
            None => call.await,
        }
    }

    #[cfg(test)]
    fn tracked_users(&self) -> usize {
        self.user_locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        billing::{LedgerRow, LedgerTransaction, MemoryLedgerStore, tiers::PurchaseOption},
        db::errors::Result as DbResult,
        test_utils::{FailingPredictor, FixedPredictor, SlowPredictor, applicant},
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn seeded(unlocked: [bool; 3], credits: i64) -> (Arc<MemoryLedgerStore>, UserId) {
        let store = Arc::new(MemoryLedgerStore::new());
        let user_id = Uuid::new_v4();
        store.insert(LedgerRow {
            user_id,
            unlocked,
            credits,
        });
        (store, user_id)
    }

    /// Counts every ledger access, to prove which requests never reach storage.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryLedgerStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LedgerStore for CountingStore {
        async fn get(&self, user_id: UserId) -> DbResult<Option<LedgerRow>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get(user_id).await
        }
        async fn credit_and_unlock(&self, user_id: UserId, option: PurchaseOption, source_id: &str) -> DbResult<LedgerRow> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.credit_and_unlock(user_id, option, source_id).await
        }
        async fn debit(&self, user_id: UserId, tier: ModelTier) -> DbResult<Option<LedgerRow>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.debit(user_id, tier).await
        }
        async fn list_transactions(&self, user_id: UserId, skip: i64, limit: i64) -> DbResult<Vec<LedgerTransaction>> {
            self.inner.list_transactions(user_id, skip, limit).await
        }
        async fn count_transactions(&self, user_id: UserId) -> DbResult<i64> {
            self.inner.count_transactions(user_id).await
        }
    }

    #[tokio::test]
    async fn test_unknown_model_never_touches_ledger() {
        let store = Arc::new(CountingStore::default());
        let gateway = PredictionGateway::new(store.clone(), Arc::new(FixedPredictor(1)), None);

        let err = gateway.predict(Uuid::new_v4(), "model9", &applicant()).await.unwrap_err();
        assert!(matches!(err, BillingError::InvalidTier { .. }));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_model3_spends_last_three_credits() {
        let (store, user_id) = seeded([false, false, true], 3);
        let gateway = PredictionGateway::new(store.clone(), Arc::new(FixedPredictor(1)), None);

        let outcome = gateway.predict(user_id, "model3", &applicant()).await.unwrap();
        assert_eq!(outcome.label, 1);
        assert_eq!(outcome.credits_left, 0);
        assert_eq!(store.get(user_id).await.unwrap().unwrap().credits, 0);
    }

    #[tokio::test]
    async fn test_failed_inference_leaves_credits() {
        let (store, user_id) = seeded([true, false, false], 5);
        let gateway = PredictionGateway::new(store.clone(), Arc::new(FailingPredictor), None);

        let err = gateway.predict(user_id, "model1", &applicant()).await.unwrap_err();
        assert!(matches!(err, BillingError::Inference(_)));
        assert_eq!(store.get(user_id).await.unwrap().unwrap().credits, 5);
    }

    #[tokio::test]
    async fn test_no_purchase_yet() {
        let store = Arc::new(MemoryLedgerStore::new());
        let gateway = PredictionGateway::new(store, Arc::new(FixedPredictor(0)), None);

        let err = gateway.predict(Uuid::new_v4(), "model1", &applicant()).await.unwrap_err();
        assert!(matches!(err, BillingError::PaymentRequired { tier: None }));
    }

    #[tokio::test]
    async fn test_locked_and_broke_sees_entitlement_error() {
        let (store, user_id) = seeded([true, false, false], 0);
        let gateway = PredictionGateway::new(store, Arc::new(FixedPredictor(0)), None);

        let err = gateway.predict(user_id, "model2", &applicant()).await.unwrap_err();
        assert!(matches!(
            err,
            BillingError::PaymentRequired {
                tier: Some(ModelTier::Model2)
            }
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_an_uncharged_failure() {
        let (store, user_id) = seeded([true, true, true], 10);
        let predictor = Arc::new(SlowPredictor::new(Duration::from_secs(5), 1));
        let gateway = PredictionGateway::new(store.clone(), predictor, Some(Duration::from_millis(20)));

        let err = gateway.predict(user_id, "model2", &applicant()).await.unwrap_err();
        assert!(matches!(err, BillingError::Inference(InferenceError::Timeout { .. })));
        assert_eq!(store.get(user_id).await.unwrap().unwrap().credits, 10);
    }

    #[tokio::test]
    async fn test_concurrent_requests_cannot_overspend() {
        // Enough for one model2 prediction, not two
        let (store, user_id) = seeded([false, true, false], 3);
        let predictor = Arc::new(SlowPredictor::new(Duration::from_millis(50), 1));
        let gateway = PredictionGateway::new(store.clone(), predictor, None);

        let features = applicant();
        let (a, b) = tokio::join!(
            gateway.predict(user_id, "model2", &features),
            gateway.predict(user_id, "model2", &features)
        );

        let outcomes = [a, b];
        let successes = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(
            outcomes
                .iter()
                .any(|r| matches!(r, Err(BillingError::InsufficientCredits { available: 1, .. })))
        );
        assert_eq!(store.get(user_id).await.unwrap().unwrap().credits, 1);
        assert_eq!(gateway.tracked_users(), 0);
    }

    #[tokio::test]
    async fn test_gateways_sharing_a_store_cannot_overspend() {
        let (store, user_id) = seeded([true, false, false], 1);
        let predictor: Arc<dyn Predictor> = Arc::new(SlowPredictor::new(Duration::from_millis(50), 0));
        let first = PredictionGateway::new(store.clone(), predictor.clone(), None);
        let second = PredictionGateway::new(store.clone(), predictor, None);

        let features = applicant();
        let (a, b) = tokio::join!(
            first.predict(user_id, "model1", &features),
            second.predict(user_id, "model1", &features)
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(store.get(user_id).await.unwrap().unwrap().credits, 0);
    }

    #[tokio::test]
    async fn test_different_users_run_concurrently() {
        let (store, alice) = seeded([true, true, true], 10);
        let bob = Uuid::new_v4();
        store.insert(LedgerRow {
            user_id: bob,
            unlocked: [true, true, true],
            credits: 10,
        });
        let predictor = Arc::new(SlowPredictor::new(Duration::from_millis(200), 1));
        let gateway = PredictionGateway::new(store, predictor, None);

        let started = tokio::time::Instant::now();
        let features = applicant();
        let (a, b) = tokio::join!(
            gateway.predict(alice, "model1", &features),
            gateway.predict(bob, "model1", &features)
        );
        assert!(a.is_ok() && b.is_ok());
        assert!(started.elapsed() < Duration::from_millis(390), "requests were serialized across users");
    }
}
