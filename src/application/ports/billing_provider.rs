use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::app_error::AppResult;

/// Read access to the billing provider's view of a subscription.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn get_subscription(&self, subscription_id: &str) -> AppResult<ProviderSubscription>;
}

/// A signature-verified webhook envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: ProviderEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSubscription {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: ProviderSubscriptionItems,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSubscriptionItems {
    #[serde(default)]
    pub data: Vec<ProviderSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSubscriptionItem {
    pub price: ProviderPrice,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderPrice {
    pub id: String,
}

impl ProviderSubscription {
    /// Price of the first subscription item.
    pub fn price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }

    /// Period end, read from the subscription or, on newer API versions, its first item.
    pub fn period_end(&self) -> Option<DateTime<Utc>> {
        self.current_period_end
            .or_else(|| self.items.data.first().and_then(|i| i.current_period_end))
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCheckoutSession {
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ProviderCheckoutSession {
    /// Subject the checkout was opened for.
    pub fn subject_id(&self) -> Option<&str> {
        self.metadata
            .get("user_id")
            .map(String::as_str)
            .filter(|id| !id.is_empty())
            .or_else(|| self.client_reference_id.as_deref().filter(|id| !id.is_empty()))
    }
}
