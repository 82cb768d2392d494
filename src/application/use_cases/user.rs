use std::sync::Arc;

use serde::Deserialize;
use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::identity::{IdentityResolver, PrincipalRepo},
};

/// Database-change notification sent by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityWebhookPayload {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub old_record: Option<IdentityRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityRecord {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    UserDeleted { subject_id: String },
    Other,
}

impl IdentityWebhookPayload {
    pub fn into_event(self) -> AppResult<IdentityEvent> {
        let subject_id = self
            .old_record
            .and_then(|r| r.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::InvalidInput("User ID is missing.".into()))?;

        if self.event_type == "DELETE" && self.table == "users" && self.schema == "auth" {
            Ok(IdentityEvent::UserDeleted { subject_id })
        } else {
            Ok(IdentityEvent::Other)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityWebhookOutcome {
    Deleted,
    Ignored,
}

#[derive(Clone)]
pub struct UserUseCases {
    repo: Arc<dyn PrincipalRepo>,
    resolver: Arc<IdentityResolver>,
}

impl UserUseCases {
    pub fn new(repo: Arc<dyn PrincipalRepo>, resolver: Arc<IdentityResolver>) -> Self {
        Self { repo, resolver }
    }

    #[instrument(skip(self, payload), fields(event_type = %payload.event_type))]
    pub async fn handle_identity_webhook(
        &self,
        payload: IdentityWebhookPayload,
    ) -> AppResult<IdentityWebhookOutcome> {
        match payload.into_event()? {
            IdentityEvent::UserDeleted { subject_id } => {
                self.delete_principal(&subject_id).await?;
                Ok(IdentityWebhookOutcome::Deleted)
            }
            IdentityEvent::Other => Ok(IdentityWebhookOutcome::Ignored),
        }
    }

    /// Remove the local principal and its cached identity.
    pub async fn delete_principal(&self, subject_id: &str) -> AppResult<()> {
        let removed = self.repo.delete_by_id(subject_id).await?;
        self.resolver.forget(subject_id);
        if !removed {
            return Err(AppError::NotFound);
        }
        tracing::info!(subject_id, "Principal deleted by identity provider");
        Ok(())
    }
}
