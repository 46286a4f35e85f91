//! Postgres storage for the entitlement ledger and its transaction history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, PgConnection, PgPool};
use tracing::instrument;

use crate::{
    billing::{LedgerRow, LedgerStore, LedgerTransaction, ModelTier, PurchaseOption, TransactionKind},
    db::errors::{DbError, Result},
    types::{UserId, abbrev_uuid},
};

const ENTITLEMENT_COLUMNS: &str = "user_id, model1, model2, model3, credits";
const TRANSACTION_COLUMNS: &str = "id, user_id, kind, item, amount, balance_after, source_id, created_at";

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Entitlement {
    user_id: UserId,
    model1: bool,
    model2: bool,
    model3: bool,
    credits: i64,
}

impl From<Entitlement> for LedgerRow {
    fn from(row: Entitlement) -> Self {
        Self {
            user_id: row.user_id,
            unlocked: [row.model1, row.model2, row.model3],
            credits: row.credits,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct Transaction {
    id: i64,
    user_id: UserId,
    kind: String,
    item: String,
    amount: i64,
    balance_after: i64,
    source_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<Transaction> for LedgerTransaction {
    type Error = DbError;

    fn try_from(tx: Transaction) -> Result<Self> {
        let kind = match tx.kind.as_str() {
            "purchase" => TransactionKind::Purchase,
            "usage" => TransactionKind::Usage,
            other => return Err(anyhow::anyhow!("unknown ledger transaction kind '{other}'").into()),
        };
        Ok(Self {
            id: tx.id,
            user_id: tx.user_id,
            kind,
            item: tx.item,
            amount: tx.amount,
            balance_after: tx.balance_after,
            source_id: tx.source_id,
            created_at: tx.created_at,
        })
    }
}

/// Repository over `entitlements` and `ledger_transactions`.
///
/// Each mutation and its history entry are written in one transaction.
pub struct Entitlements<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Entitlements<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn get(&mut self, user_id: UserId) -> Result<Option<LedgerRow>> {
        let row = sqlx::query_as::<_, Entitlement>(&format!("SELECT {ENTITLEMENT_COLUMNS} FROM entitlements WHERE user_id = $1"))
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Upsert: the first purchase creates the row, later ones OR the flags in and add credits.
    #[instrument(skip(self, source_id), fields(user_id = %abbrev_uuid(&user_id), option = %option), err)]
    pub async fn credit_and_unlock(&mut self, user_id: UserId, option: PurchaseOption, source_id: &str) -> Result<LedgerRow> {
        let terms = option.terms();
        let mut unlocks = [false; ModelTier::COUNT];
        for tier in terms.unlocks {
            unlocks[tier.index()] = true;
        }

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, Entitlement>(&format!(
            r#"
            INSERT INTO entitlements (user_id, model1, model2, model3, credits)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                model1 = entitlements.model1 OR EXCLUDED.model1,
                model2 = entitlements.model2 OR EXCLUDED.model2,
                model3 = entitlements.model3 OR EXCLUDED.model3,
                credits = entitlements.credits + EXCLUDED.credits,
                updated_at = NOW()
            RETURNING {ENTITLEMENT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(unlocks[0])
        .bind(unlocks[1])
        .bind(unlocks[2])
        .bind(terms.credits_granted)
        .fetch_one(&mut *tx)
        .await?;

        Self::record(
            &mut tx,
            &row,
            TransactionKind::Purchase,
            option.as_str(),
            terms.credits_granted,
            Some(source_id),
        )
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Conditional decrement: only matches when the tier is unlocked and the balance covers the
    /// cost, so concurrent debits from any number of processes cannot overdraw.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), tier = %tier), err)]
    pub async fn debit(&mut self, user_id: UserId, tier: ModelTier) -> Result<Option<LedgerRow>> {
        let cost = tier.inference_cost();
        let mut tx = self.db.begin().await?;

        // The tier name doubles as its flag column
        let row = sqlx::query_as::<_, Entitlement>(&format!(
            r#"
            UPDATE entitlements SET
                credits = credits - $2,
                updated_at = NOW()
            WHERE user_id = $1 AND {tier} AND credits >= $2
            RETURNING {ENTITLEMENT_COLUMNS}
            "#,
            tier = tier.as_str()
        ))
        .bind(user_id)
        .bind(cost)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Self::record(&mut tx, &row, TransactionKind::Usage, tier.as_str(), -cost, None).await?;

        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn record(
        conn: &mut PgConnection,
        row: &Entitlement,
        kind: TransactionKind,
        item: &str,
        amount: i64,
        source_id: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_transactions (user_id, kind, item, amount, balance_after, source_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(row.user_id)
        .bind(kind.as_str())
        .bind(item)
        .bind(amount)
        .bind(row.credits)
        .bind(source_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), skip, limit), err)]
    pub async fn list_transactions(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<LedgerTransaction>> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM ledger_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *self.db)
        .await?;

        rows.into_iter().map(LedgerTransaction::try_from).collect()
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn count_transactions(&mut self, user_id: UserId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ledger_transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }
}

/// [`LedgerStore`] over a connection pool, for deployments that share one database.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn get(&self, user_id: UserId) -> Result<Option<LedgerRow>> {
        let mut conn = self.pool.acquire().await?;
        Entitlements::new(&mut conn).get(user_id).await
    }

    async fn credit_and_unlock(&self, user_id: UserId, option: PurchaseOption, source_id: &str) -> Result<LedgerRow> {
        let mut conn = self.pool.acquire().await?;
        Entitlements::new(&mut conn).credit_and_unlock(user_id, option, source_id).await
    }

    async fn debit(&self, user_id: UserId, tier: ModelTier) -> Result<Option<LedgerRow>> {
        let mut conn = self.pool.acquire().await?;
        Entitlements::new(&mut conn).debit(user_id, tier).await
    }

    async fn list_transactions(&self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<LedgerTransaction>> {
        let mut conn = self.pool.acquire().await?;
        Entitlements::new(&mut conn).list_transactions(user_id, skip, limit).await
    }

    async fn count_transactions(&self, user_id: UserId) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Entitlements::new(&mut conn).count_transactions(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_user;

    #[sqlx::test]
    #[cfg_attr(not(feature = "postgres-tests"), ignore)]
    async fn test_first_purchase_creates_row_and_history(pool: PgPool) {
        let user = create_test_user(&pool, "buyer@example.com").await;
        let store = PgLedgerStore::new(pool.clone());

        assert!(store.get(user.id).await.unwrap().is_none());

        let row = store.credit_and_unlock(user.id, PurchaseOption::Model1, "receipt-1").await.unwrap();
        assert_eq!(row.credits, 30);
        assert_eq!(row.unlocked, [true, false, false]);
        assert_eq!(store.get(user.id).await.unwrap(), Some(row));

        let history = store.list_transactions(user.id, 0, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, TransactionKind::Purchase);
        assert_eq!(history[0].item, "model1");
        assert_eq!(history[0].amount, 30);
        assert_eq!(history[0].balance_after, 30);
        assert_eq!(history[0].source_id.as_deref(), Some("receipt-1"));
    }

    #[sqlx::test]
    #[cfg_attr(not(feature = "postgres-tests"), ignore)]
    async fn test_purchases_stack_and_keep_flags(pool: PgPool) {
        let user = create_test_user(&pool, "stacker@example.com").await;
        let store = PgLedgerStore::new(pool.clone());

        store.credit_and_unlock(user.id, PurchaseOption::Model2, "a").await.unwrap();
        let row = store.credit_and_unlock(user.id, PurchaseOption::Model2, "b").await.unwrap();
        assert_eq!(row.credits, 120);
        assert_eq!(row.unlocked, [false, true, false]);

        let row = store.credit_and_unlock(user.id, PurchaseOption::All, "c").await.unwrap();
        assert_eq!(row.credits, 220);
        assert_eq!(row.unlocked, [true, true, true]);
        assert_eq!(store.count_transactions(user.id).await.unwrap(), 3);
    }

    #[sqlx::test]
    #[cfg_attr(not(feature = "postgres-tests"), ignore)]
    async fn test_debit_refuses_locked_or_underfunded(pool: PgPool) {
        let user = create_test_user(&pool, "debtor@example.com").await;
        let store = PgLedgerStore::new(pool.clone());

        assert!(store.debit(user.id, ModelTier::Model1).await.unwrap().is_none());

        store.credit_and_unlock(user.id, PurchaseOption::Model3, "r").await.unwrap();
        assert!(store.debit(user.id, ModelTier::Model1).await.unwrap().is_none());

        for _ in 0..30 {
            store.debit(user.id, ModelTier::Model3).await.unwrap().unwrap();
        }
        assert_eq!(store.get(user.id).await.unwrap().unwrap().credits, 0);
        assert!(store.debit(user.id, ModelTier::Model3).await.unwrap().is_none());

        let history = store.list_transactions(user.id, 0, 1).await.unwrap();
        assert_eq!(history[0].kind, TransactionKind::Usage);
        assert_eq!(history[0].amount, -3);
        assert_eq!(history[0].balance_after, 0);
        assert_eq!(store.count_transactions(user.id).await.unwrap(), 31);
    }

    #[sqlx::test]
    #[cfg_attr(not(feature = "postgres-tests"), ignore)]
    async fn test_concurrent_debits_cannot_overdraw(pool: PgPool) {
        let user = create_test_user(&pool, "racer@example.com").await;
        let store = PgLedgerStore::new(pool.clone());
        store.credit_and_unlock(user.id, PurchaseOption::Model1, "r").await.unwrap();

        // 30 credits, 40 concurrent single-credit debits
        let attempts = (0..40).map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.debit(user.id, ModelTier::Model1).await.unwrap() })
        });
        let results = futures::future::join_all(attempts).await;

        let succeeded = results.into_iter().filter(|r| matches!(r, Ok(Some(_)))).count();
        assert_eq!(succeeded, 30);
        assert_eq!(store.get(user.id).await.unwrap().unwrap().credits, 0);
    }

    #[sqlx::test]
    #[cfg_attr(not(feature = "postgres-tests"), ignore)]
    async fn test_ledger_goes_with_the_user(pool: PgPool) {
        let user = create_test_user(&pool, "leaver@example.com").await;
        let store = PgLedgerStore::new(pool.clone());
        store.credit_and_unlock(user.id, PurchaseOption::All, "r").await.unwrap();

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(store.get(user.id).await.unwrap().is_none());
        assert_eq!(store.count_transactions(user.id).await.unwrap(), 0);
    }
}
