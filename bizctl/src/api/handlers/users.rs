use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::info;

use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        users::{CurrentUser, ListUsersQuery, UserResponse},
    },
    auth::current_user::require_superuser,
    db::handlers::{Repository, Users, users::UserFilter},
    errors::{Error, Result},
    types::{Operation, UserId, abbrev_uuid},
};

fn user_not_found(id: UserId) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/users/current",
    tag = "users",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "The account no longer exists"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&current_user.id)))]
pub async fn get_current_user(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| user_not_found(current_user.id))?;

    Ok(Json(user.into()))
}

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Page of users", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Superuser only"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
    current_user: CurrentUser,
) -> Result<Json<PaginatedResponse<UserResponse>>> {
    require_superuser(&current_user, Operation::Read, "users")?;

    let (skip, limit) = query.pagination.params();
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    let users = repo.list(&UserFilter::new(skip, limit)).await?;
    let total_count = repo.count().await?;

    Ok(Json(PaginatedResponse::page(
        users.into_iter().map(Into::into).collect(),
        total_count,
        &query.pagination,
    )))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = uuid::Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 403, description = "Only superusers may read other accounts"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&id)))]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<UserId>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    if current_user.id != id {
        require_superuser(&current_user, Operation::Read, "users")?;
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).get_by_id(id).await?.ok_or_else(|| user_not_found(id))?;

    Ok(Json(user.into()))
}

/// Delete a user, together with their ledger and its history
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(("id" = uuid::Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Superusers cannot delete themselves"),
        (status = 403, description = "Superuser only"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&id)))]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<UserId>, current_user: CurrentUser) -> Result<StatusCode> {
    require_superuser(&current_user, Operation::Delete, "users")?;

    if current_user.id == id {
        return Err(Error::BadRequest {
            message: "Superusers are not allowed to delete themselves".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Users::new(&mut conn).delete(id).await? {
        return Err(user_not_found(id));
    }

    info!("Deleted user {} on behalf of {}", abbrev_uuid(&id), abbrev_uuid(&current_user.id));
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_state, create_test_state_with_pool, create_test_token, create_test_user, test_server};
    use sqlx::PgPool;
    use uuid::Uuid;

    fn caller(is_superuser: bool) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "caller@example.com".to_string(),
            is_superuser,
        }
    }

    #[tokio::test]
    async fn test_permission_checks_run_before_the_database() {
        let state = create_test_state();
        let token = create_test_token(&caller(false), &state.config);
        let server = test_server(state);

        server.get("/api/v1/users").authorization_bearer(&token).await.assert_status_forbidden();
        server
            .get(&format!("/api/v1/users/{}", Uuid::new_v4()))
            .authorization_bearer(&token)
            .await
            .assert_status_forbidden();
        server
            .delete(&format!("/api/v1/users/{}", Uuid::new_v4()))
            .authorization_bearer(&token)
            .await
            .assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_superuser_cannot_delete_self() {
        let state = create_test_state();
        let admin = caller(true);
        let token = create_test_token(&admin, &state.config);
        let server = test_server(state);

        let response = server.delete(&format!("/api/v1/users/{}", admin.id)).authorization_bearer(&token).await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_requires_authentication() {
        let server = test_server(create_test_state());
        server.get("/api/v1/users/current").await.assert_status_unauthorized();
    }

    #[sqlx::test]
    #[cfg_attr(not(feature = "postgres-tests"), ignore)]
    async fn test_admin_lists_and_deletes(pool: PgPool) {
        let state = create_test_state_with_pool(pool.clone());
        let admin = create_test_user(&pool, "admin@example.com").await;
        sqlx::query("UPDATE users SET is_superuser = TRUE WHERE id = $1")
            .bind(admin.id)
            .execute(&pool)
            .await
            .unwrap();
        let member = create_test_user(&pool, "member@example.com").await;

        let admin_token = create_test_token(
            &CurrentUser {
                id: admin.id,
                email: admin.email.clone(),
                is_superuser: true,
            },
            &state.config,
        );
        let member_token = create_test_token(&CurrentUser::from(&member), &state.config);
        let server = test_server(state);

        let page: PaginatedResponse<UserResponse> = server
            .get("/api/v1/users")
            .add_query_param("limit", 1)
            .authorization_bearer(&admin_token)
            .await
            .json();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.data.len(), 1);

        // Members can read themselves
        server
            .get(&format!("/api/v1/users/{}", member.id))
            .authorization_bearer(&member_token)
            .await
            .assert_status_ok();

        server
            .delete(&format!("/api/v1/users/{}", member.id))
            .authorization_bearer(&admin_token)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete(&format!("/api/v1/users/{}", member.id))
            .authorization_bearer(&admin_token)
            .await
            .assert_status_not_found();
    }
}
