use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::jwt::Claims,
    domain::entities::principal::Principal,
    infra::cache::IdentityCache,
};

#[async_trait]
pub trait PrincipalRepo: Send + Sync {
    async fn find_by_subject_id(&self, subject_id: &str) -> AppResult<Option<Principal>>;

    /// Fails with `AppError::UniqueConstraintViolation` if the subject already exists.
    async fn insert(&self, principal: &Principal) -> AppResult<()>;

    /// Returns whether a row was removed.
    async fn delete_by_id(&self, subject_id: &str) -> AppResult<bool>;
}

/// Maps a verified subject to its local principal, provisioning it on first sight.
#[derive(Clone)]
pub struct IdentityResolver {
    repo: Arc<dyn PrincipalRepo>,
    cache: Arc<IdentityCache>,
    auto_provision: bool,
}

impl IdentityResolver {
    pub fn new(repo: Arc<dyn PrincipalRepo>, cache: Arc<IdentityCache>, auto_provision: bool) -> Self {
        Self {
            repo,
            cache,
            auto_provision,
        }
    }

    #[instrument(skip(self, claims))]
    pub async fn resolve(&self, subject_id: &str, claims: &Claims) -> AppResult<Principal> {
        if let Some(principal) = self.cache.get(subject_id) {
            return Ok(principal);
        }

        let principal = match self.repo.find_by_subject_id(subject_id).await? {
            Some(found) => found,
            None if self.auto_provision => self.provision(subject_id, claims.email()).await?,
            None => return Err(AppError::UserNotFound),
        };

        self.cache.insert(subject_id, principal.clone());
        Ok(principal)
    }

    /// Drop the cached principal so the next request re-reads the store.
    pub fn forget(&self, subject_id: &str) {
        self.cache.invalidate(subject_id);
    }

    async fn provision(&self, subject_id: &str, email: Option<&str>) -> AppResult<Principal> {
        let candidate = Principal::provisioned(subject_id, email);

        match self.repo.insert(&candidate).await {
            Ok(()) => {
                tracing::info!(subject_id, "Provisioned principal on first sight");
                Ok(candidate)
            }
            // A concurrent request created it first; use the stored row.
            Err(AppError::UniqueConstraintViolation) => {
                tracing::debug!(subject_id, "Principal created concurrently, re-reading");
                self.repo
                    .find_by_subject_id(subject_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal(format!(
                            "principal {subject_id} reported as duplicate but not found"
                        ))
                    })
            }
            Err(e) => Err(e),
        }
    }
}
