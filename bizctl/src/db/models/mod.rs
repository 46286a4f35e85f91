//! Database record models matching table schemas.
//!
//! These are distinct from the API models in [`crate::api::models`] so storage and wire formats
//! can evolve independently. Business records are the exception: they are served as stored.
//!
//! - [`users`]: user accounts
//! - [`records`]: commercial and personal customers, projects, employees and competitors

pub mod records;
pub mod users;
