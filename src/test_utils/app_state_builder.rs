//! `TestAppStateBuilder` wires the real use cases around in-memory adapters
//! so HTTP tests can drive the full router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use chrono::Duration;
use secrecy::SecretString;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::subscription::DEFAULT_GRACE_SECS,
    domain::entities::{principal::Principal, subscription::Subscription},
    infra::{config::AppConfig, setup::build_app_state},
    test_utils::{
        InMemoryPrincipalRepo, InMemorySubscriptionRepo, ManualClock, StubBillingProvider,
        TEST_AUDIENCE, TEST_JWT_SECRET,
    },
};

pub const TEST_STRIPE_WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_SUPABASE_SECRET: &str = "supabase-test-secret";

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
        jwt_audience: TEST_AUDIENCE.to_string(),
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        stripe_secret_key: SecretString::new("sk_test_unused".into()),
        stripe_webhook_secret: SecretString::new(TEST_STRIPE_WEBHOOK_SECRET.into()),
        stripe_webhook_tolerance_secs: 300,
        supabase_webhook_secret: SecretString::new(TEST_SUPABASE_SECRET.into()),
        identity_cache_ttl: Duration::seconds(300),
        subscription_status_ttl: Duration::seconds(120),
        subscription_grace: Duration::seconds(DEFAULT_GRACE_SECS),
        auto_provision_users: true,
        retry_out_of_order_updates: false,
    }
}

pub struct TestAppStateBuilder {
    config: AppConfig,
    principal_repo: Arc<InMemoryPrincipalRepo>,
    subscription_repo: Arc<InMemorySubscriptionRepo>,
    billing_provider: Arc<StubBillingProvider>,
    clock: Arc<ManualClock>,
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            config: test_config(),
            principal_repo: Arc::new(InMemoryPrincipalRepo::new()),
            subscription_repo: Arc::new(InMemorySubscriptionRepo::new()),
            billing_provider: Arc::new(StubBillingProvider::new()),
            clock: Arc::new(ManualClock::new()),
        }
    }

    pub fn with_config(mut self, overrides: impl FnOnce(&mut AppConfig)) -> Self {
        overrides(&mut self.config);
        self
    }

    pub fn with_principal(self, principal: Principal) -> Self {
        self.principal_repo
            .principals
            .lock()
            .unwrap()
            .insert(principal.subject_id.clone(), principal);
        self
    }

    pub fn with_subscription(self, subscription: Subscription) -> Self {
        self.subscription_repo.put(subscription);
        self
    }

    /// Subscription object the stub provider returns on fetch.
    pub fn with_provider_subscription(self, object: serde_json::Value) -> Self {
        self.billing_provider.add_subscription(object);
        self
    }

    pub fn principal_repo(&self) -> Arc<InMemoryPrincipalRepo> {
        self.principal_repo.clone()
    }

    pub fn subscription_repo(&self) -> Arc<InMemorySubscriptionRepo> {
        self.subscription_repo.clone()
    }

    pub fn clock(&self) -> Arc<ManualClock> {
        self.clock.clone()
    }

    pub fn build(self) -> AppState {
        build_app_state(
            self.config,
            self.principal_repo,
            self.subscription_repo,
            self.billing_provider,
            self.clock,
        )
    }
}
