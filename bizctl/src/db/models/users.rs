//! Database models for users.

use crate::api::models::auth::RegisterRequest;
use crate::types::UserId;
use chrono::{DateTime, Utc};

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl UserCreateDBRequest {
    /// A self-registered account: active, never a superuser.
    pub fn registration(request: RegisterRequest, password_hash: String) -> Self {
        Self {
            email: request.email,
            full_name: request.full_name,
            password_hash: Some(password_hash),
            is_active: true,
            is_superuser: false,
        }
    }
}

/// Database request for updating a user. `None` leaves a column as it is.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub full_name: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Database response for a user
#[derive(Debug, Clone)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
