use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppError,
    domain::entities::principal::Principal,
    use_cases::auth::AuthOutcome,
};

/// Run the authentication gate once per request.
///
/// An authenticated principal is stored in the request extensions. Requests
/// without credentials pass through; routes decide whether that is allowed.
pub async fn authenticate_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match app_state.auth_gate.authenticate(request.headers()).await? {
        AuthOutcome::Authenticated(principal) => {
            tracing::debug!(subject_id = %principal.subject_id, "Request authenticated");
            request.extensions_mut().insert(principal);
        }
        AuthOutcome::Anonymous => {}
    }

    Ok(next.run(request).await)
}

/// The authenticated principal; rejects anonymous requests with 401.
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or(AppError::Unauthenticated)
    }
}

pub struct MaybePrincipal(pub Option<Principal>);

impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybePrincipal(parts.extensions.get::<Principal>().cloned()))
    }
}
