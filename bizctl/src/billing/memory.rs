//! In-process [`LedgerStore`] backed by a [`DashMap`].
//!
//! Each mutation runs under the map's per-entry lock, so a debit's check and subtraction are a
//! single step even without the gateway's per-user serialization.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::{
    Mutex,
    atomic::{AtomicI64, Ordering},
};

use super::{
    ledger::{LedgerRow, LedgerStore, LedgerTransaction, TransactionKind},
    tiers::{ModelTier, PurchaseOption},
};
use crate::{db::errors::Result, types::UserId};

#[derive(Default)]
pub struct MemoryLedgerStore {
    rows: DashMap<UserId, LedgerRow>,
    history: Mutex<Vec<LedgerTransaction>>,
    next_transaction_id: AtomicI64,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly, bypassing the purchase flow.
    pub fn insert(&self, row: LedgerRow) {
        self.rows.insert(row.user_id, row);
    }

    fn record(&self, row: &LedgerRow, kind: TransactionKind, item: &str, amount: i64, source_id: Option<&str>) {
        let entry = LedgerTransaction {
            id: self.next_transaction_id.fetch_add(1, Ordering::Relaxed) + 1,
            user_id: row.user_id,
            kind,
            item: item.to_string(),
            amount,
            balance_after: row.credits,
            source_id: source_id.map(str::to_string),
            created_at: Utc::now(),
        };
        // A poisoned history only loses audit entries; the balance lives in `rows`
        match self.history.lock() {
            Ok(mut history) => history.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    fn history_for(&self, user_id: UserId) -> Vec<LedgerTransaction> {
        let history = match self.history.lock() {
            Ok(history) => history,
            Err(poisoned) => poisoned.into_inner(),
        };
        history.iter().filter(|entry| entry.user_id == user_id).cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get(&self, user_id: UserId) -> Result<Option<LedgerRow>> {
        Ok(self.rows.get(&user_id).map(|row| row.value().clone()))
    }

    async fn credit_and_unlock(&self, user_id: UserId, option: PurchaseOption, source_id: &str) -> Result<LedgerRow> {
        let granted = option.terms().credits_granted;
        let updated = {
            let mut row = self.rows.entry(user_id).or_insert_with(|| LedgerRow::new(user_id));
            row.credit_and_unlock(option, granted);
            row.value().clone()
        };
        self.record(&updated, TransactionKind::Purchase, option.as_str(), granted, Some(source_id));
        Ok(updated)
    }

    async fn debit(&self, user_id: UserId, tier: ModelTier) -> Result<Option<LedgerRow>> {
        let updated = {
            let Some(mut row) = self.rows.get_mut(&user_id) else {
                return Ok(None);
            };
            if !row.is_unlocked(tier) || !row.has_sufficient(tier) {
                return Ok(None);
            }
            row.debit(tier);
            row.value().clone()
        };
        self.record(&updated, TransactionKind::Usage, tier.as_str(), -tier.inference_cost(), None);
        Ok(Some(updated))
    }

    async fn list_transactions(&self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<LedgerTransaction>> {
        let mut entries = self.history_for(user_id);
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_transactions(&self, user_id: UserId) -> Result<i64> {
        Ok(self.history_for(user_id).len() as i64)
    }
}
