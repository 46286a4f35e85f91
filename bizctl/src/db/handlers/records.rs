//! Generic repository for the business-record tables.
//!
//! One implementation serves every [`BusinessRecord`]; the table name and column list come from
//! the record type, and values are always bound as parameters.

use std::{collections::HashMap, marker::PhantomData};

use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::records::BusinessRecord,
    },
    types::RecordId,
};

/// Filter for listing records, in id order
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub skip: i64,
    pub limit: i64,
}

impl RecordFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

fn select_columns<R: BusinessRecord>() -> String {
    format!("id, {}", R::COLUMNS.join(", "))
}

pub struct Records<'c, R> {
    db: &'c mut PgConnection,
    _record: PhantomData<R>,
}

impl<'c, R: BusinessRecord> Records<'c, R> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db, _record: PhantomData }
    }

    #[instrument(skip(self), fields(table = R::TABLE), err)]
    pub async fn count(&mut self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", R::TABLE))
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c, R: BusinessRecord> Repository for Records<'c, R> {
    type CreateRequest = R::Draft;
    type UpdateRequest = R::Draft;
    type Response = R;
    type Id = RecordId;
    type Filter = RecordFilter;

    #[instrument(skip(self, request), fields(table = R::TABLE), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let placeholders = (1..=R::COLUMNS.len()).map(|i| format!("${i}")).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders}) RETURNING {}",
            R::TABLE,
            R::COLUMNS.join(", "),
            select_columns::<R>()
        );

        let record = R::bind_draft(sqlx::query_as::<_, R>(&sql), request)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(record)
    }

    #[instrument(skip(self), fields(table = R::TABLE), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", select_columns::<R>(), R::TABLE);
        let record = sqlx::query_as::<_, R>(&sql).bind(id).fetch_optional(&mut *self.db).await?;
        Ok(record)
    }

    #[instrument(skip(self, ids), fields(table = R::TABLE, count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!("SELECT {} FROM {} WHERE id = ANY($1)", select_columns::<R>(), R::TABLE);
        let records = sqlx::query_as::<_, R>(&sql).bind(&ids).fetch_all(&mut *self.db).await?;
        Ok(records.into_iter().map(|record| (record.id(), record)).collect())
    }

    #[instrument(skip(self, filter), fields(table = R::TABLE, limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY id LIMIT $1 OFFSET $2",
            select_columns::<R>(),
            R::TABLE
        );
        let records = sqlx::query_as::<_, R>(&sql)
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(records)
    }

    #[instrument(skip(self), fields(table = R::TABLE), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", R::TABLE))
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite every column of the record. Partial updates are merged into a full draft by the
    /// caller first.
    #[instrument(skip(self, request), fields(table = R::TABLE), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let assignments = R::COLUMNS
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{column} = ${}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE id = $1 RETURNING {}",
            R::TABLE,
            select_columns::<R>()
        );

        let record = R::bind_draft(sqlx::query_as::<_, R>(&sql).bind(id), request)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok(record)
    }
}
