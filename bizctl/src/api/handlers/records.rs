//! CRUD handlers shared by every business-record resource.
//!
//! Handlers are generic over [`BusinessRecord`]; [`record_routes`] mounts one resource's set at
//! `/{resource}` and `/{resource}/{id}`.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde_json::{Map, Value};
use tracing::info;

use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        records::{DetailResponse, ListRecordsQuery},
        users::CurrentUser,
    },
    db::{
        handlers::{RecordFilter, Records, Repository},
        models::records::BusinessRecord,
    },
    errors::{Error, Result},
    sample_data::Generate,
    types::RecordId,
};

fn not_found<R: BusinessRecord>(id: RecordId) -> Error {
    Error::NotFound {
        resource: R::LABEL.to_string(),
        id: id.to_string(),
    }
}

/// Overlay the JSON object `patch` onto `stored`.
///
/// Only known columns are taken from the patch, so `id` and unknown keys are dropped. A value of
/// the wrong type, or one that does not fit its column, fails the whole update.
pub(crate) fn merge_patch<R: BusinessRecord>(stored: &R::Draft, patch: Value) -> Result<R::Draft> {
    let Value::Object(patch) = patch else {
        return Err(Error::BadRequest {
            message: "Request body must be a JSON object".to_string(),
        });
    };

    let mut merged = match serde_json::to_value(stored).map_err(|e| Error::Internal {
        operation: format!("serialize {}: {e}", R::LABEL),
    })? {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };

    for (key, value) in patch {
        if R::COLUMNS.contains(&key.as_str()) {
            merged.insert(key, value);
        }
    }

    let draft: R::Draft = serde_json::from_value(Value::Object(merged)).map_err(|e| Error::BadRequest {
        message: format!("Invalid {} data: {e}", R::LABEL),
    })?;
    R::validate_draft(&draft).map_err(|e| Error::BadRequest {
        message: format!("Invalid {} data: {e}", R::LABEL),
    })?;

    Ok(draft)
}

/// Create a record filled with generated sample data
#[tracing::instrument(skip_all, fields(table = R::TABLE))]
pub async fn create_record<R: BusinessRecord>(State(state): State<AppState>, _user: CurrentUser) -> Result<(StatusCode, Json<R>)> {
    let draft = R::Draft::generate(&mut rand::rng());

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let record = Records::<R>::new(&mut conn).create(&draft).await?;

    info!("Created {} {}", R::LABEL, record.id());
    Ok((StatusCode::CREATED, Json(record)))
}

/// List records in id order
#[tracing::instrument(skip_all, fields(table = R::TABLE))]
pub async fn list_records<R: BusinessRecord>(
    State(state): State<AppState>,
    Query(query): Query<ListRecordsQuery>,
    _user: CurrentUser,
) -> Result<Json<PaginatedResponse<R>>> {
    let (skip, limit) = query.pagination.params();
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Records::<R>::new(&mut conn);

    let records = repo.list(&RecordFilter::new(skip, limit)).await?;
    let total_count = repo.count().await?;

    Ok(Json(PaginatedResponse::page(records, total_count, &query.pagination)))
}

#[tracing::instrument(skip_all, fields(table = R::TABLE, id))]
pub async fn get_record<R: BusinessRecord>(State(state): State<AppState>, Path(id): Path<RecordId>, _user: CurrentUser) -> Result<Json<R>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let record = Records::<R>::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found::<R>(id))?;
    Ok(Json(record))
}

/// Partially update a record: fields present in the body replace the stored ones
#[tracing::instrument(skip_all, fields(table = R::TABLE, id))]
pub async fn update_record<R: BusinessRecord>(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
    _user: CurrentUser,
    Json(patch): Json<Value>,
) -> Result<Json<R>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Records::<R>::new(&mut tx);

    let stored = repo.get_by_id(id).await?.ok_or_else(|| not_found::<R>(id))?;
    let draft = merge_patch::<R>(&stored.into_draft(), patch)?;
    let updated = repo.update(id, &draft).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Json(updated))
}

#[tracing::instrument(skip_all, fields(table = R::TABLE, id))]
pub async fn delete_record<R: BusinessRecord>(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
    _user: CurrentUser,
) -> Result<Json<DetailResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Records::<R>::new(&mut conn).delete(id).await? {
        return Err(not_found::<R>(id));
    }

    info!("Deleted {} {id}", R::LABEL);
    Ok(Json(DetailResponse {
        detail: format!("{} deleted", R::LABEL),
    }))
}

/// Mount the five operations for `R` onto `router`.
pub fn record_routes<R: BusinessRecord>(router: Router<AppState>) -> Router<AppState> {
    let collection = format!("/{}", R::RESOURCE);
    let item = format!("/{}/{{id}}", R::RESOURCE);

    router
        .route(&collection, get(list_records::<R>).post(create_record::<R>))
        .route(
            &item,
            get(get_record::<R>).put(update_record::<R>).delete(delete_record::<R>),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::models::records::{Competitor, CompetitorDraft, Project, ProjectDraft},
        test_utils::{create_test_state, create_test_state_with_pool, create_test_token, create_test_user, test_server},
    };
    use chrono::NaiveDate;
    use rand::{SeedableRng, rngs::StdRng};
    use rust_decimal::Decimal;
    use serde_json::json;
    use sqlx::PgPool;
    use std::str::FromStr;

    #[test]
    fn test_merge_patch_overlays_known_fields() {
        let stored = ProjectDraft::generate(&mut StdRng::seed_from_u64(8));
        let merged = merge_patch::<Project>(
            &stored,
            json!({
                "status": "Completed",
                "budget": "1500.25",
                "end_date": "2031-01-31",
                "id": 999,
                "colour": "blue",
            }),
        )
        .unwrap();

        assert_eq!(merged.status, "Completed");
        assert_eq!(merged.budget, Decimal::from_str("1500.25").unwrap());
        assert_eq!(merged.end_date, NaiveDate::from_ymd_opt(2031, 1, 31).unwrap());
        assert_eq!(merged.project_name, stored.project_name);
        assert_eq!(merged.start_date, stored.start_date);
    }

    #[test]
    fn test_merge_patch_rejects_wrong_types() {
        let stored = CompetitorDraft::generate(&mut StdRng::seed_from_u64(8));

        let err = merge_patch::<Competitor>(&stored, json!({"number_of_employees": "lots"})).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = merge_patch::<Competitor>(&stored, json!(["not", "an", "object"])).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_merge_patch_rejects_money_that_does_not_fit() {
        let stored = ProjectDraft::generate(&mut StdRng::seed_from_u64(8));

        let err = merge_patch::<Project>(&stored, json!({"budget": "10000000000000"})).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = merge_patch::<Project>(&stored, json!({"budget": "1500.255"})).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.user_message().contains("budget"));
    }

    #[test]
    fn test_empty_patch_changes_nothing() {
        let stored = CompetitorDraft::generate(&mut StdRng::seed_from_u64(9));
        assert_eq!(merge_patch::<Competitor>(&stored, json!({})).unwrap(), stored);
    }

    #[tokio::test]
    async fn test_requires_authentication() {
        let server = test_server(create_test_state());
        server.post("/api/v1/projects").await.assert_status_unauthorized();
        server.get("/api/v1/employees").await.assert_status_unauthorized();
        server.delete("/api/v1/competitors/1").await.assert_status_unauthorized();
    }

    #[sqlx::test]
    #[cfg_attr(not(feature = "postgres-tests"), ignore)]
    async fn test_record_lifecycle(pool: PgPool) {
        let state = create_test_state_with_pool(pool.clone());
        let user = create_test_user(&pool, "clerk@example.com").await;
        let token = create_test_token(&CurrentUser::from(&user), &state.config);
        let server = test_server(state);

        let created = server.post("/api/v1/projects").authorization_bearer(&token).await;
        created.assert_status(StatusCode::CREATED);
        let project: Project = created.json();

        let fetched: Project = server
            .get(&format!("/api/v1/projects/{}", project.id))
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(fetched, project);

        let updated: Project = server
            .put(&format!("/api/v1/projects/{}", project.id))
            .authorization_bearer(&token)
            .json(&json!({"status": "On Hold", "id": project.id + 100}))
            .await
            .json();
        assert_eq!(updated.id, project.id);
        assert_eq!(updated.status, "On Hold");
        assert_eq!(updated.project_name, project.project_name);

        server
            .put(&format!("/api/v1/projects/{}", project.id))
            .authorization_bearer(&token)
            .json(&json!({"budget": "a lot"}))
            .await
            .assert_status_bad_request();

        server
            .put(&format!("/api/v1/projects/{}", project.id))
            .authorization_bearer(&token)
            .json(&json!({"budget": "10000000000000"}))
            .await
            .assert_status_bad_request();

        let unchanged: Project = server
            .get(&format!("/api/v1/projects/{}", project.id))
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(unchanged.budget, project.budget);

        let deleted = server
            .delete(&format!("/api/v1/projects/{}", project.id))
            .authorization_bearer(&token)
            .await;
        deleted.assert_status_ok();
        deleted.assert_json(&json!({"detail": "Project deleted"}));

        let missing = server
            .get(&format!("/api/v1/projects/{}", project.id))
            .authorization_bearer(&token)
            .await;
        missing.assert_status_not_found();
        missing.assert_text("Project not found");
    }

    #[sqlx::test]
    #[cfg_attr(not(feature = "postgres-tests"), ignore)]
    async fn test_list_is_paginated(pool: PgPool) {
        let state = create_test_state_with_pool(pool.clone());
        let user = create_test_user(&pool, "clerk@example.com").await;
        let token = create_test_token(&CurrentUser::from(&user), &state.config);
        let server = test_server(state);

        for _ in 0..3 {
            server
                .post("/api/v1/commercial-customers")
                .authorization_bearer(&token)
                .await
                .assert_status(StatusCode::CREATED);
        }

        let page: Value = server
            .get("/api/v1/commercial-customers")
            .add_query_param("skip", 1)
            .add_query_param("limit", 1)
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(page["total_count"], 3);
        assert_eq!(page["skip"], 1);
        assert_eq!(page["limit"], 1);
        assert_eq!(page["data"].as_array().unwrap().len(), 1);

        server
            .delete("/api/v1/commercial-customers/999999")
            .authorization_bearer(&token)
            .await
            .assert_text("Commercial Customer not found");
    }
}
