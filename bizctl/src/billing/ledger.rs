//! The per-user entitlement ledger: unlock flags for each tier plus a credit balance.
//!
//! [`LedgerRow`] carries the pure arithmetic; [`LedgerStore`] is the persistence seam. The
//! Postgres store lives in [`crate::db::handlers::entitlements`], and an in-memory store backs
//! tests and single-process deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::tiers::{ModelTier, PurchaseOption};
use crate::{db::errors::Result, types::UserId};

/// A user's entitlement flags and prepaid balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub user_id: UserId,
    pub unlocked: [bool; ModelTier::COUNT],
    pub credits: i64,
}

impl LedgerRow {
    /// Zero state: every tier locked, no credits.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            unlocked: [false; ModelTier::COUNT],
            credits: 0,
        }
    }

    pub fn is_unlocked(&self, tier: ModelTier) -> bool {
        self.unlocked[tier.index()]
    }

    pub fn has_sufficient(&self, tier: ModelTier) -> bool {
        self.credits >= tier.inference_cost()
    }

    /// Subtract the tier's inference cost.
    ///
    /// # Panics
    ///
    /// If the balance does not cover the cost. Callers check [`has_sufficient`](Self::has_sufficient) first.
    pub fn debit(&mut self, tier: ModelTier) {
        assert!(
            self.has_sufficient(tier),
            "debit of {} credits for {tier} exceeds balance {}",
            tier.inference_cost(),
            self.credits
        );
        self.credits -= tier.inference_cost();
    }

    /// Apply a purchase: set the option's unlock flags and add `amount` credits.
    pub fn credit_and_unlock(&mut self, option: PurchaseOption, amount: i64) {
        for tier in option.terms().unlocks {
            self.unlocked[tier.index()] = true;
        }
        self.credits += amount;
    }
}

/// Whether a ledger movement added or consumed credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Purchase,
    Usage,
}

impl TransactionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Usage => "usage",
        }
    }
}

/// One entry in a user's ledger history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTransaction {
    pub id: i64,
    pub user_id: UserId,
    pub kind: TransactionKind,
    /// The purchase option or tier this movement was for
    pub item: String,
    /// Signed change to the balance: positive for purchases, negative for usage
    pub amount: i64,
    pub balance_after: i64,
    pub source_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Persistence for ledger rows.
///
/// Mutations are single atomic units: `credit_and_unlock` creates the row on first purchase,
/// and `debit` refuses to drive the balance negative or to charge for a locked tier.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Fetch the user's row, if they have ever purchased anything.
    async fn get(&self, user_id: UserId) -> Result<Option<LedgerRow>>;

    /// Apply a purchase, creating the row if needed. `source_id` is the payment receipt.
    async fn credit_and_unlock(&self, user_id: UserId, option: PurchaseOption, source_id: &str) -> Result<LedgerRow>;

    /// Charge one prediction on `tier`.
    ///
    /// Returns `None` without mutating anything when the row is missing, the tier is locked, or
    /// the balance does not cover the cost.
    async fn debit(&self, user_id: UserId, tier: ModelTier) -> Result<Option<LedgerRow>>;

    /// The user's ledger history, newest first.
    async fn list_transactions(&self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<LedgerTransaction>>;

    /// Total number of history entries for the user.
    async fn count_transactions(&self, user_id: UserId) -> Result<i64>;

    /// The existing row, or a zero-state row that is not persisted until mutated.
    async fn get_or_create(&self, user_id: UserId) -> Result<LedgerRow> {
        Ok(self.get(user_id).await?.unwrap_or_else(|| LedgerRow::new(user_id)))
    }
}
