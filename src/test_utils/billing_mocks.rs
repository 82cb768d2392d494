//! In-memory subscription store and stub billing provider.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::billing_provider::{BillingProvider, ProviderEvent, ProviderSubscription},
        use_cases::subscription::SubscriptionRepo,
    },
    domain::entities::{billing_event::CheckoutCompleted, subscription::Subscription},
};

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

/// Keyed by subject; enforces the same unique columns as the table
/// (customer and subscription id; prices are shared between subjects).
#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    pub subscriptions: Mutex<HashMap<String, Subscription>>,
    read_calls: AtomicUsize,
    fail_write: AtomicBool,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        let repo = Self::default();
        for subscription in subscriptions {
            repo.put(subscription);
        }
        repo
    }

    pub fn put(&self, subscription: Subscription) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.subject_id.clone(), subscription);
    }

    pub fn count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    /// Reads by subject id.
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_write(&self) {
        self.fail_write.store(true, Ordering::SeqCst);
    }

    fn check_write(&self) -> AppResult<()> {
        if self.fail_write.swap(false, Ordering::SeqCst) {
            return Err(AppError::Database("write failed".into()));
        }
        Ok(())
    }
}

fn clashes(existing: &Option<String>, candidate: &Option<String>) -> bool {
    matches!((existing, candidate), (Some(a), Some(b)) if a == b)
}

fn violates_unique(
    rows: &HashMap<String, Subscription>,
    owner: &str,
    candidate: &Subscription,
) -> bool {
    rows.values().filter(|s| s.subject_id != owner).any(|s| {
        clashes(&s.external_customer_id, &candidate.external_customer_id)
            || clashes(&s.external_subscription_id, &candidate.external_subscription_id)
    })
}

#[async_trait]
impl SubscriptionRepo for InMemorySubscriptionRepo {
    async fn get_by_subject_id(&self, subject_id: &str) -> AppResult<Option<Subscription>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.subscriptions.lock().unwrap().get(subject_id).cloned())
    }

    async fn upsert_for_subject(&self, input: &CheckoutCompleted) -> AppResult<Subscription> {
        self.check_write()?;
        let mut rows = self.subscriptions.lock().unwrap();

        let id = rows
            .get(&input.subject_id)
            .map(|s| s.id)
            .unwrap_or_else(Uuid::new_v4);
        let candidate = Subscription {
            id,
            subject_id: input.subject_id.clone(),
            external_customer_id: input.external_customer_id.clone(),
            external_subscription_id: Some(input.external_subscription_id.clone()),
            external_price_id: input.external_price_id.clone(),
            current_period_end: input.period_end,
        };

        if violates_unique(&rows, &input.subject_id, &candidate) {
            return Err(AppError::UniqueConstraintViolation);
        }
        rows.insert(input.subject_id.clone(), candidate.clone());
        Ok(candidate)
    }

    async fn update_billing_period(
        &self,
        external_subscription_id: &str,
        external_price_id: Option<&str>,
        period_end: Option<DateTime<Utc>>,
    ) -> AppResult<Option<Subscription>> {
        self.check_write()?;
        let mut rows = self.subscriptions.lock().unwrap();

        let Some(current) = rows
            .values()
            .find(|s| s.external_subscription_id.as_deref() == Some(external_subscription_id))
            .cloned()
        else {
            return Ok(None);
        };

        let updated = Subscription {
            external_price_id: external_price_id.map(str::to_string),
            current_period_end: period_end,
            ..current
        };
        if violates_unique(&rows, &updated.subject_id, &updated) {
            return Err(AppError::UniqueConstraintViolation);
        }
        rows.insert(updated.subject_id.clone(), updated.clone());
        Ok(Some(updated))
    }

    async fn delete_by_external_subscription_id(
        &self,
        external_subscription_id: &str,
    ) -> AppResult<Option<Subscription>> {
        self.check_write()?;
        let mut rows = self.subscriptions.lock().unwrap();
        let subject = rows
            .values()
            .find(|s| s.external_subscription_id.as_deref() == Some(external_subscription_id))
            .map(|s| s.subject_id.clone());
        Ok(subject.and_then(|subject| rows.remove(&subject)))
    }
}

// ============================================================================
// StubBillingProvider
// ============================================================================

#[derive(Default)]
pub struct StubBillingProvider {
    subscriptions: Mutex<HashMap<String, ProviderSubscription>>,
    fetch_calls: AtomicUsize,
}

impl StubBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription object as the provider API would return it.
    pub fn add_subscription(&self, object: serde_json::Value) {
        let subscription: ProviderSubscription = serde_json::from_value(object).unwrap();
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id.clone(), subscription);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BillingProvider for StubBillingProvider {
    async fn get_subscription(&self, subscription_id: &str) -> AppResult<ProviderSubscription> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("no such subscription: {subscription_id}")))
    }
}

/// Build a provider event envelope around `object`.
pub fn provider_event(event_type: &str, object: serde_json::Value) -> ProviderEvent {
    serde_json::from_value(json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": event_type,
        "data": { "object": object },
    }))
    .unwrap()
}
