use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::ExposeSecret;

use crate::{
    adapters::http::{app_state::AppState, middleware::CurrentPrincipal},
    app_error::{AppError, AppResult},
    domain::entities::principal::Principal,
    infra::crypto::constant_time_compare,
    use_cases::user::{IdentityWebhookOutcome, IdentityWebhookPayload},
};

const SUPABASE_SECRET_HEADER: &str = "x-supabase-secret";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile))
        .route("/webhook", post(identity_webhook))
}

/// GET /api/user/profile
async fn profile(CurrentPrincipal(principal): CurrentPrincipal) -> Json<Principal> {
    Json(principal)
}

/// POST /api/user/webhook
///
/// Database-change hook from the identity provider. Only user deletion acts.
async fn identity_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let provided = headers
        .get(SUPABASE_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !constant_time_compare(
        provided,
        app_state.config.supabase_webhook_secret.expose_secret(),
    ) {
        return Err(AppError::Forbidden);
    }

    let payload: IdentityWebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid webhook payload: {}", e)))?;

    match app_state.user_use_cases.handle_identity_webhook(payload).await? {
        IdentityWebhookOutcome::Deleted => Ok(StatusCode::NO_CONTENT.into_response()),
        IdentityWebhookOutcome::Ignored => Ok(StatusCode::OK.into_response()),
    }
}
