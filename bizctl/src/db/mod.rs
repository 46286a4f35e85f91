//! Database layer: SQLx over PostgreSQL, organised as repositories.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (api::handlers)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers: queries and transactions)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models: table rows)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: repositories, plus the Postgres ledger store
//! - [`models`]: row structures and the business-record definitions
//! - [`errors`]: [`errors::DbError`], classified from `sqlx::Error`
//!
//! # Transactions
//!
//! Repositories borrow a connection. Handlers that read then write (a partial record update, a
//! user deletion) open a transaction and build the repository from it:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut repo = Records::<Project>::new(&mut tx);
//! // ... reads and writes ...
//! tx.commit().await?;
//! ```
//!
//! Migrations live in `migrations/` and are embedded by [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
