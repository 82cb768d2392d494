use std::sync::Arc;

use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::billing_provider::{
            BillingProvider, ProviderCheckoutSession, ProviderEvent, ProviderSubscription,
        },
        use_cases::subscription::SubscriptionUseCases,
    },
    domain::entities::billing_event::{
        BillingEvent, CheckoutCompleted, ReconcileOutcome, ReportReason, SubscriptionChange,
    },
};

const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Reconciled(ReconcileOutcome),
    /// Event type or shape we do not reconcile; acknowledged as-is.
    Ignored,
}

/// Turns verified provider webhooks into billing events and applies them.
#[derive(Clone)]
pub struct BillingWebhookUseCases {
    provider: Arc<dyn BillingProvider>,
    subscriptions: Arc<SubscriptionUseCases>,
    retry_out_of_order: bool,
}

impl BillingWebhookUseCases {
    pub fn new(
        provider: Arc<dyn BillingProvider>,
        subscriptions: Arc<SubscriptionUseCases>,
        retry_out_of_order: bool,
    ) -> Self {
        Self {
            provider,
            subscriptions,
            retry_out_of_order,
        }
    }

    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle(&self, event: ProviderEvent) -> AppResult<WebhookOutcome> {
        let Some(billing_event) = self.decode(&event).await? else {
            tracing::debug!("Webhook event not reconciled");
            return Ok(WebhookOutcome::Ignored);
        };

        let outcome = self.subscriptions.reconcile(billing_event).await?;

        match &outcome {
            ReconcileOutcome::Reported(ReportReason::EventOutOfOrder { .. })
                if self.retry_out_of_order =>
            {
                return Err(AppError::EventOutOfOrder);
            }
            // Another subject owns the identifiers; acknowledging would drop
            // a paid subscription, so make the provider re-deliver.
            ReconcileOutcome::Reported(ReportReason::Conflict { .. }) => {
                return Err(AppError::UniqueConstraintViolation);
            }
            _ => {}
        }

        Ok(WebhookOutcome::Reconciled(outcome))
    }

    /// `None` for events that carry nothing to reconcile.
    pub async fn decode(&self, event: &ProviderEvent) -> AppResult<Option<BillingEvent>> {
        match event.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => self.decode_checkout(event).await,
            SUBSCRIPTION_UPDATED => {
                let sub = parse_object::<ProviderSubscription>(event)?;
                Ok(Some(BillingEvent::SubscriptionUpdated(SubscriptionChange {
                    external_price_id: sub.price_id().map(str::to_string),
                    period_end: sub.period_end(),
                    external_subscription_id: sub.id,
                })))
            }
            SUBSCRIPTION_DELETED => {
                let sub = parse_object::<ProviderSubscription>(event)?;
                Ok(Some(BillingEvent::SubscriptionDeleted {
                    external_subscription_id: sub.id,
                }))
            }
            _ => Ok(None),
        }
    }

    async fn decode_checkout(&self, event: &ProviderEvent) -> AppResult<Option<BillingEvent>> {
        let session = parse_object::<ProviderCheckoutSession>(event)?;

        let (Some(subscription_id), Some(subject_id)) =
            (session.subscription.as_deref(), session.subject_id())
        else {
            // One-time payment or a session opened without a subject.
            tracing::debug!("Checkout without subscription or subject id");
            return Ok(None);
        };

        // The session only references the subscription; price and period
        // come from the provider.
        let sub = self.provider.get_subscription(subscription_id).await?;

        Ok(Some(BillingEvent::CheckoutCompleted(CheckoutCompleted {
            subject_id: subject_id.to_string(),
            external_customer_id: sub.customer.clone().or(session.customer.clone()),
            external_price_id: sub.price_id().map(str::to_string),
            period_end: sub.period_end(),
            external_subscription_id: sub.id,
        })))
    }
}

fn parse_object<T: serde::de::DeserializeOwned>(event: &ProviderEvent) -> AppResult<T> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| {
        AppError::InvalidInput(format!("Invalid {} payload: {}", event.event_type, e))
    })
}
