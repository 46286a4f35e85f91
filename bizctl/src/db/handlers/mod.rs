//! Repository implementations for database access.
//!
//! Each repository wraps a borrowed connection (or transaction), so callers decide the
//! transaction boundary:
//!
//! ```ignore
//! use bizctl::db::handlers::{Repository, Users};
//!
//! let mut tx = pool.begin().await?;
//! let user = Users::new(&mut tx).get_user_by_email("user@example.com").await?;
//! tx.commit().await?;
//! ```
//!
//! # Available Repositories
//!
//! - [`Users`]: accounts and authentication lookups
//! - [`Records`]: the business-record tables, one generic implementation
//! - [`Entitlements`]: the prediction ledger and its history, also exposed as a
//!   [`LedgerStore`](crate::billing::LedgerStore) via [`PgLedgerStore`]

pub mod entitlements;
pub mod records;
pub mod repository;
pub mod users;

pub use entitlements::{Entitlements, PgLedgerStore};
pub use records::{RecordFilter, Records};
pub use repository::Repository;
pub use users::Users;
