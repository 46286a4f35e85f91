use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    api::models::{payments::PaymentResponse, users::CurrentUser},
    billing,
    errors::Result,
    types::abbrev_uuid,
};

/// Buy access to a model tier, or the bundle of all three
#[utoipa::path(
    post,
    path = "/payments/{option}",
    tag = "payments",
    params(("option" = String, Path, description = "One of `model1`, `model2`, `model3`, `all`")),
    responses(
        (status = 200, description = "Payment taken and credits granted", body = PaymentResponse),
        (status = 400, description = "Unknown option, or the payment was declined"),
        (status = 401, description = "Not authenticated"),
        (status = 502, description = "Payment provider unreachable"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&current_user.id), option = %option))]
pub async fn purchase(
    State(state): State<AppState>,
    Path(option): Path<String>,
    current_user: CurrentUser,
) -> Result<Json<PaymentResponse>> {
    let outcome = billing::purchase(state.ledger.as_ref(), state.payments.as_ref(), &current_user, &option).await?;
    Ok(Json(outcome.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        billing::TransactionKind,
        payment_providers::dummy::DummyProvider,
        test_utils::{create_test_state, create_test_token, test_server},
    };
    use axum::http::StatusCode;
    use serde_json::Value;
    use std::sync::Arc;
    use uuid::Uuid;

    fn buyer() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "buyer@example.com".to_string(),
            is_superuser: false,
        }
    }

    #[tokio::test]
    async fn test_bundle_then_single() {
        let state = create_test_state();
        let user = buyer();
        let token = create_test_token(&user, &state.config);
        let ledger = state.ledger.clone();
        let server = test_server(state);

        let bundle: PaymentResponse = server.post("/api/v1/payments/all").authorization_bearer(&token).await.json();
        assert_eq!(bundle.message, "Payment successful");
        assert_eq!(bundle.credits_added, 100);
        assert_eq!(bundle.total_credits, 100);
        assert!(bundle.receipt_id.starts_with("dummy_"));
        assert!(bundle.paid_models.model1 && bundle.paid_models.model2 && bundle.paid_models.model3);

        let single: PaymentResponse = server.post("/api/v1/payments/model3").authorization_bearer(&token).await.json();
        assert_eq!(single.credits_added, 90);
        assert_eq!(single.total_credits, 190);
        assert_ne!(single.receipt_id, bundle.receipt_id);

        let history = ledger.list_transactions(user.id, 0, 10).await.unwrap();
        assert!(history.iter().any(|tx| tx.source_id.as_deref() == Some(single.receipt_id.as_str())));
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|tx| tx.kind == TransactionKind::Purchase));
    }

    #[tokio::test]
    async fn test_unknown_option() {
        let state = create_test_state();
        let token = create_test_token(&buyer(), &state.config);
        let server = test_server(state);

        let response = server.post("/api/v1/payments/model4").authorization_bearer(&token).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "invalid_tier");
    }

    #[tokio::test]
    async fn test_declined_payment_grants_nothing() {
        let mut state = create_test_state();
        state.payments = Arc::new(DummyProvider::new(true));
        let user = buyer();
        let token = create_test_token(&user, &state.config);
        let ledger = state.ledger.clone();
        let server = test_server(state);

        let response = server.post("/api/v1/payments/model1").authorization_bearer(&token).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "payment_failed");

        assert!(ledger.get(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_requires_authentication() {
        let server = test_server(create_test_state());
        server.post("/api/v1/payments/all").await.assert_status_unauthorized();
    }
}
