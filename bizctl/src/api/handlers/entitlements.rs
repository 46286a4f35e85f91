use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::{
    AppState,
    api::models::{
        entitlements::{EntitlementResponse, LedgerTransactionResponse, ListTransactionsQuery},
        pagination::PaginatedResponse,
        users::CurrentUser,
    },
    auth::current_user::require_superuser,
    errors::Result,
    types::{Operation, UserId, abbrev_uuid},
};

/// The caller's unlocked tiers and balance
///
/// Users who have never purchased anything get the zero state.
#[utoipa::path(
    get,
    path = "/entitlements/current",
    tag = "entitlements",
    responses(
        (status = 200, description = "Current entitlements", body = EntitlementResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&current_user.id)))]
pub async fn get_current_entitlements(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<EntitlementResponse>> {
    let row = state.ledger.get_or_create(current_user.id).await?;
    Ok(Json(row.into()))
}

/// The caller's purchases and charged predictions, newest first
#[utoipa::path(
    get,
    path = "/entitlements/current/transactions",
    tag = "entitlements",
    params(ListTransactionsQuery),
    responses(
        (status = 200, description = "Page of ledger history", body = PaginatedResponse<LedgerTransactionResponse>),
        (status = 401, description = "Not authenticated"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&current_user.id)))]
pub async fn list_current_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
    current_user: CurrentUser,
) -> Result<Json<PaginatedResponse<LedgerTransactionResponse>>> {
    let (skip, limit) = query.pagination.params();
    let transactions = state.ledger.list_transactions(current_user.id, skip, limit).await?;
    let total_count = state.ledger.count_transactions(current_user.id).await?;

    Ok(Json(PaginatedResponse::page(
        transactions.into_iter().map(Into::into).collect(),
        total_count,
        &query.pagination,
    )))
}

/// Any user's entitlements
#[utoipa::path(
    get,
    path = "/entitlements/{user_id}",
    tag = "entitlements",
    params(("user_id" = uuid::Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The user's entitlements", body = EntitlementResponse),
        (status = 403, description = "Superuser only"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&user_id)))]
pub async fn get_user_entitlements(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    current_user: CurrentUser,
) -> Result<Json<EntitlementResponse>> {
    require_superuser(&current_user, Operation::Read, "entitlements")?;

    let row = state.ledger.get_or_create(user_id).await?;
    Ok(Json(row.into()))
}
