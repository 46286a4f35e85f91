//! Authentication for the management API.
//!
//! Users log in with email and password via `/authentication/login` and receive a signed JWT,
//! both in the response body and as an HTTP-only session cookie. Every authenticated route
//! extracts a [`CurrentUser`](crate::api::models::users::CurrentUser), which accepts either the
//! cookie (browsers) or the same token as `Authorization: Bearer <jwt>` (scripts).
//!
//! Authorization is deliberately small: superusers may manage other users and read any ledger,
//! everyone else sees only their own data.
//!
//! # Modules
//!
//! - [`current_user`]: the request extractor and the superuser guard
//! - [`password`]: Argon2id hashing and verification
//! - [`session`]: JWT creation and verification

pub mod current_user;
pub mod password;
pub mod session;
