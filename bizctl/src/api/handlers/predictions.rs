use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    api::models::{predictions::PredictionResponse, users::CurrentUser},
    errors::Result,
    inference::Features,
    types::abbrev_uuid,
};

/// Run a paid prediction
///
/// The tier must be unlocked and the balance must cover its cost. Credits are only taken when
/// the model produces an answer.
#[utoipa::path(
    post,
    path = "/predictions/{model_name}",
    tag = "predictions",
    params(("model_name" = String, Path, description = "One of `model1`, `model2`, `model3`")),
    request_body = Features,
    responses(
        (status = 200, description = "Prediction made and charged", body = PredictionResponse),
        (status = 400, description = "Unknown model"),
        (status = 401, description = "Not authenticated"),
        (status = 402, description = "Tier not purchased, or not enough credits"),
        (status = 500, description = "The model failed; nothing was charged"),
        (status = 504, description = "The model timed out; nothing was charged"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&current_user.id), model = %model_name))]
pub async fn predict(
    State(state): State<AppState>,
    Path(model_name): Path<String>,
    current_user: CurrentUser,
    Json(features): Json<Features>,
) -> Result<Json<PredictionResponse>> {
    let outcome = state.gateway.predict(current_user.id, &model_name, &features).await?;
    Ok(Json(outcome.into()))
}
