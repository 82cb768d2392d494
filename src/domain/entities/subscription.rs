use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Read replica of the billing provider's subscription for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub subject_id: String,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub external_price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn is_valid_at(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        is_valid_subscription(
            self.external_price_id.as_deref(),
            self.current_period_end,
            now,
            grace,
        )
    }
}

/// A subscription grants access while it has a price and
/// `current_period_end + grace` is still in the future.
pub fn is_valid_subscription(
    price_id: Option<&str>,
    current_period_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    grace: Duration,
) -> bool {
    match (price_id, current_period_end) {
        (Some(price), Some(end)) if !price.is_empty() => end + grace > now,
        _ => false,
    }
}
