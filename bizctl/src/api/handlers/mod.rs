//! HTTP request handlers for all API endpoints.
//!
//! Handlers authenticate through the [`CurrentUser`](crate::api::models::users::CurrentUser)
//! extractor and return [`crate::errors::Error`], which renders as a status code plus message.
//!
//! - [`auth`]: registration, login and logout
//! - [`entitlements`]: balances, unlocked tiers and ledger history
//! - [`payments`]: buying model tiers
//! - [`predictions`]: paid predictions through the gateway
//! - [`records`]: generic CRUD for every business-record table
//! - [`users`]: the current account and user management

pub mod auth;
pub mod entitlements;
pub mod payments;
pub mod predictions;
pub mod records;
pub mod users;
