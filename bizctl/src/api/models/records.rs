//! API models shared by the business-record endpoints.
//!
//! Records themselves are served as stored, see [`crate::db::models::records`].

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::pagination::Pagination;

/// Query parameters for listing records
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListRecordsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

/// Confirmation of a deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DetailResponse {
    #[schema(example = "Project deleted")]
    pub detail: String,
}
