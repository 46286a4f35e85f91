//! API models for the entitlement ledger and its history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{pagination::Pagination, payments::PaidModels};
use crate::{
    billing::{LedgerRow, LedgerTransaction, TransactionKind},
    types::UserId,
};

/// A user's unlocked tiers and credit balance
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EntitlementResponse {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub paid_models: PaidModels,
    pub credits: i64,
}

impl From<LedgerRow> for EntitlementResponse {
    fn from(row: LedgerRow) -> Self {
        Self {
            user_id: row.user_id,
            paid_models: row.unlocked.into(),
            credits: row.credits,
        }
    }
}

/// One purchase or usage entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerTransactionResponse {
    pub id: i64,
    pub kind: TransactionKind,
    /// Purchase option (`model1`..`model3`, `all`) or tier used
    pub item: String,
    /// Signed change to the balance
    pub amount: i64,
    pub balance_after: i64,
    /// Payment receipt for purchases
    pub source_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerTransaction> for LedgerTransactionResponse {
    fn from(tx: LedgerTransaction) -> Self {
        Self {
            id: tx.id,
            kind: tx.kind,
            item: tx.item,
            amount: tx.amount,
            balance_after: tx.balance_after,
            source_id: tx.source_id,
            created_at: tx.created_at,
        }
    }
}

/// Query parameters for listing ledger history
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListTransactionsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}
