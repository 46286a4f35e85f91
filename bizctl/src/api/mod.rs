//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/authentication/*`): registration, login, logout
//! - **Users** (`/api/v1/users/*`): the current account, and user management for superusers
//! - **Records** (`/api/v1/{resource}/*`): CRUD over the five business-record tables
//! - **Payments** (`/api/v1/payments/{option}`): buying model tiers
//! - **Predictions** (`/api/v1/predictions/{model_name}`): paid loan-approval predictions
//! - **Entitlements** (`/api/v1/entitlements/*`): balances, unlocked tiers and ledger history
//!
//! # OpenAPI Documentation
//!
//! Endpoints are documented with `utoipa`; the rendered reference is served at `/api/docs`.

pub mod handlers;
pub mod models;
