use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    infra::config::AppConfig,
    use_cases::{
        auth::AuthenticationGate, billing_webhook::BillingWebhookUseCases,
        subscription::SubscriptionUseCases, user::UserUseCases,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth_gate: Arc<AuthenticationGate>,
    pub user_use_cases: Arc<UserUseCases>,
    pub subscription_use_cases: Arc<SubscriptionUseCases>,
    pub billing_webhook_use_cases: Arc<BillingWebhookUseCases>,
}

impl FromRef<AppState> for Arc<SubscriptionUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.subscription_use_cases.clone()
    }
}

impl FromRef<AppState> for Arc<UserUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.user_use_cases.clone()
    }
}
