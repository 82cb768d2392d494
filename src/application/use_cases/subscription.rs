use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::clock::Clock,
    domain::entities::{
        billing_event::{
            BillingEvent, CheckoutCompleted, ReconcileOutcome, ReportReason, SubscriptionChange,
        },
        subscription::Subscription,
    },
    infra::cache::SubscriptionStatusCache,
};

pub const DEFAULT_GRACE_SECS: i64 = 86_400;

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn get_by_subject_id(&self, subject_id: &str) -> AppResult<Option<Subscription>>;

    /// Create the subject's subscription, or overwrite it if one exists.
    async fn upsert_for_subject(&self, input: &CheckoutCompleted) -> AppResult<Subscription>;

    /// Update price and period end only. `None` if no row matches.
    async fn update_billing_period(
        &self,
        external_subscription_id: &str,
        external_price_id: Option<&str>,
        period_end: Option<DateTime<Utc>>,
    ) -> AppResult<Option<Subscription>>;

    /// Returns the removed row, if any.
    async fn delete_by_external_subscription_id(
        &self,
        external_subscription_id: &str,
    ) -> AppResult<Option<Subscription>>;
}

/// Applies billing events to the local store and answers validity queries.
#[derive(Clone)]
pub struct SubscriptionUseCases {
    repo: Arc<dyn SubscriptionRepo>,
    status_cache: Arc<SubscriptionStatusCache>,
    clock: Arc<dyn Clock>,
    grace: Duration,
}

impl SubscriptionUseCases {
    pub fn new(
        repo: Arc<dyn SubscriptionRepo>,
        status_cache: Arc<SubscriptionStatusCache>,
        clock: Arc<dyn Clock>,
        grace: Duration,
    ) -> Self {
        Self {
            repo,
            status_cache,
            clock,
            grace,
        }
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    #[instrument(skip(self), fields(kind = event.kind()))]
    pub async fn reconcile(&self, event: BillingEvent) -> AppResult<ReconcileOutcome> {
        let outcome = match event {
            BillingEvent::CheckoutCompleted(checkout) => self.on_checkout_completed(checkout).await?,
            BillingEvent::SubscriptionUpdated(change) => self.on_subscription_updated(change).await?,
            BillingEvent::SubscriptionDeleted {
                external_subscription_id,
            } => self.on_subscription_deleted(&external_subscription_id).await?,
        };

        if let ReconcileOutcome::Reported(reason) = &outcome {
            tracing::warn!(reason = reason.as_str(), detail = ?reason, "Billing event reported");
        }
        Ok(outcome)
    }

    pub async fn on_checkout_completed(
        &self,
        checkout: CheckoutCompleted,
    ) -> AppResult<ReconcileOutcome> {
        let result = match self.repo.upsert_for_subject(&checkout).await {
            // A duplicate delivery raced us on another unique column; by now the
            // winner has committed and the upsert takes the conflict path.
            Err(AppError::UniqueConstraintViolation) => {
                self.repo.upsert_for_subject(&checkout).await
            }
            other => other,
        };

        self.status_cache.invalidate(&checkout.subject_id);

        match result {
            Ok(subscription) => {
                tracing::info!(
                    subject_id = %subscription.subject_id,
                    external_subscription_id = ?subscription.external_subscription_id,
                    "Subscription stored from checkout"
                );
                Ok(ReconcileOutcome::Applied)
            }
            Err(AppError::UniqueConstraintViolation) => {
                Ok(ReconcileOutcome::Reported(ReportReason::Conflict {
                    subject_id: checkout.subject_id,
                }))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn on_subscription_updated(
        &self,
        change: SubscriptionChange,
    ) -> AppResult<ReconcileOutcome> {
        let updated = self
            .repo
            .update_billing_period(
                &change.external_subscription_id,
                change.external_price_id.as_deref(),
                change.period_end,
            )
            .await?;

        match updated {
            Some(subscription) => {
                self.status_cache.invalidate(&subscription.subject_id);
                Ok(ReconcileOutcome::Applied)
            }
            None => Ok(ReconcileOutcome::Reported(ReportReason::EventOutOfOrder {
                external_subscription_id: change.external_subscription_id,
            })),
        }
    }

    pub async fn on_subscription_deleted(
        &self,
        external_subscription_id: &str,
    ) -> AppResult<ReconcileOutcome> {
        match self
            .repo
            .delete_by_external_subscription_id(external_subscription_id)
            .await?
        {
            Some(removed) => {
                self.status_cache.invalidate(&removed.subject_id);
                Ok(ReconcileOutcome::Applied)
            }
            None => Ok(ReconcileOutcome::Reported(ReportReason::AlreadyRemoved {
                external_subscription_id: external_subscription_id.to_string(),
            })),
        }
    }

    // ========================================================================
    // Status
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn is_subscribed(&self, subject_id: &str) -> AppResult<bool> {
        if let Some(cached) = self.status_cache.get(subject_id) {
            return Ok(cached);
        }

        // A reconcile between the read and the insert must not leave a stale answer cached.
        let seen = self.status_cache.generation();
        let valid = self
            .repo
            .get_by_subject_id(subject_id)
            .await?
            .is_some_and(|s| s.is_valid_at(self.clock.now(), self.grace));

        self.status_cache.insert_if_current(subject_id, valid, seen);
        Ok(valid)
    }

    pub async fn subscription_for(&self, subject_id: &str) -> AppResult<Option<Subscription>> {
        self.repo.get_by_subject_id(subject_id).await
    }
}
