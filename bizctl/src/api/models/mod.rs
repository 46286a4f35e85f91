//! API request and response data models.
//!
//! API models are kept apart from database models so the wire format can change independently of
//! the schema. Business records are the exception: they are served exactly as stored, see
//! [`crate::db::models::records`].

pub mod auth;
pub mod entitlements;
pub mod pagination;
pub mod payments;
pub mod predictions;
pub mod records;
pub mod users;
