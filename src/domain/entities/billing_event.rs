use chrono::{DateTime, Utc};

/// Subscription lifecycle events the reconciler applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    CheckoutCompleted(CheckoutCompleted),
    SubscriptionUpdated(SubscriptionChange),
    SubscriptionDeleted { external_subscription_id: String },
}

impl BillingEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            BillingEvent::CheckoutCompleted(_) => "checkout_completed",
            BillingEvent::SubscriptionUpdated(_) => "subscription_updated",
            BillingEvent::SubscriptionDeleted { .. } => "subscription_deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCompleted {
    pub subject_id: String,
    pub external_subscription_id: String,
    pub external_customer_id: Option<String>,
    pub external_price_id: Option<String>,
    pub period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionChange {
    pub external_subscription_id: String,
    pub external_price_id: Option<String>,
    pub period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied,
    Reported(ReportReason),
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Applied => "applied",
            ReconcileOutcome::Reported(reason) => reason.as_str(),
        }
    }
}

/// Non-fatal conditions met while applying an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportReason {
    /// Update for a subscription not stored yet.
    EventOutOfOrder { external_subscription_id: String },
    /// Deletion of a subscription that is already gone.
    AlreadyRemoved { external_subscription_id: String },
    /// Another subject already holds one of the external identifiers.
    Conflict { subject_id: String },
}

impl ReportReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportReason::EventOutOfOrder { .. } => "event_out_of_order",
            ReportReason::AlreadyRemoved { .. } => "already_removed",
            ReportReason::Conflict { .. } => "conflict",
        }
    }
}
