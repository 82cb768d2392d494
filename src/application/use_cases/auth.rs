use std::sync::Arc;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::{jwt::TokenVerifier, use_cases::identity::IdentityResolver},
    domain::entities::principal::Principal,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Principal),
    Anonymous,
}

/// Turns request headers into an authenticated principal or an anonymous caller.
///
/// Whether anonymous callers may proceed is decided by each route, not here.
#[derive(Clone)]
pub struct AuthenticationGate {
    verifier: Arc<TokenVerifier>,
    resolver: Arc<IdentityResolver>,
}

impl AuthenticationGate {
    pub fn new(verifier: Arc<TokenVerifier>, resolver: Arc<IdentityResolver>) -> Self {
        Self { verifier, resolver }
    }

    #[instrument(skip_all)]
    pub async fn authenticate(&self, headers: &HeaderMap) -> AppResult<AuthOutcome> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(AuthOutcome::Anonymous);
        };
        let raw = value.to_str().map_err(|_| AppError::MalformedCredential)?;

        let claims = self.verifier.verify(raw)?;
        let principal = self.resolver.resolve(&claims.sub, &claims).await?;
        Ok(AuthOutcome::Authenticated(principal))
    }
}
