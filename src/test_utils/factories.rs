//! Test data factories.
//!
//! Each factory creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::{
    application::jwt::Claims,
    domain::entities::{
        billing_event::{BillingEvent, CheckoutCompleted},
        principal::Principal,
        subscription::Subscription,
    },
};

pub fn test_datetime() -> NaiveDateTime {
    test_instant().naive_utc()
}

fn test_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// Far enough ahead that the subscription is valid against any test clock.
fn far_future() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap()
}

pub fn create_test_principal(subject_id: &str, overrides: impl FnOnce(&mut Principal)) -> Principal {
    let mut principal = Principal {
        subject_id: subject_id.to_string(),
        email: Some(format!("{subject_id}@example.com")),
        locally_provisioned: false,
        created_at: Some(test_datetime()),
    };
    overrides(&mut principal);
    principal
}

/// External identifiers are derived from the subject so fixtures never collide.
pub fn create_test_subscription(
    subject_id: &str,
    overrides: impl FnOnce(&mut Subscription),
) -> Subscription {
    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        subject_id: subject_id.to_string(),
        external_customer_id: Some(format!("cus_{subject_id}")),
        external_subscription_id: Some(format!("sub_{subject_id}")),
        external_price_id: Some(format!("price_{subject_id}")),
        current_period_end: Some(far_future()),
    };
    overrides(&mut subscription);
    subscription
}

pub fn checkout_event(
    subject_id: &str,
    external_subscription_id: &str,
    period_end: Option<DateTime<Utc>>,
) -> BillingEvent {
    BillingEvent::CheckoutCompleted(CheckoutCompleted {
        subject_id: subject_id.to_string(),
        external_subscription_id: external_subscription_id.to_string(),
        external_customer_id: Some(format!("cus_{subject_id}")),
        external_price_id: Some(format!("price_{subject_id}")),
        period_end,
    })
}

pub fn test_claims(sub: &str, email: Option<&str>) -> Claims {
    Claims {
        sub: sub.to_string(),
        email: email.map(str::to_string),
        exp: far_future().timestamp(),
        role: Some("authenticated".to_string()),
    }
}
