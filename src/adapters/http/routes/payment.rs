use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use serde::Serialize;

use crate::{
    adapters::http::{app_state::AppState, middleware::CurrentPrincipal},
    app_error::{AppError, AppResult},
    domain::entities::subscription::Subscription,
    infra::stripe_client::StripeClient,
    use_cases::billing_webhook::WebhookOutcome,
};

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscription-status", get(subscription_status))
        .route("/subscription", get(subscription))
        .route("/webhook", post(billing_webhook))
}

#[derive(Serialize)]
struct SubscriptionStatusResponse {
    subscribed: bool,
}

#[derive(Serialize)]
struct WebhookAck {
    received: bool,
    outcome: &'static str,
}

/// GET /api/payment/subscription-status
async fn subscription_status(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<Json<SubscriptionStatusResponse>> {
    let subscribed = app_state
        .subscription_use_cases
        .is_subscribed(&principal.subject_id)
        .await?;
    Ok(Json(SubscriptionStatusResponse { subscribed }))
}

/// GET /api/payment/subscription
async fn subscription(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> AppResult<Json<Subscription>> {
    app_state
        .subscription_use_cases
        .subscription_for(&principal.subject_id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// POST /api/payment/webhook
///
/// Non-2xx makes the provider re-deliver, so only transient failures (and
/// out-of-order updates when configured) return an error status.
async fn billing_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::SignatureInvalid)?;

    let event = StripeClient::construct_event(
        &body,
        signature,
        &app_state.config.stripe_webhook_secret,
        app_state.config.stripe_webhook_tolerance_secs,
    )?;

    let outcome = match app_state.billing_webhook_use_cases.handle(event).await? {
        WebhookOutcome::Reconciled(outcome) => outcome.as_str(),
        WebhookOutcome::Ignored => "ignored",
    };

    Ok(Json(WebhookAck {
        received: true,
        outcome,
    }))
}
