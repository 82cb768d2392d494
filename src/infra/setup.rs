use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt::TokenVerifier,
        ports::{
            billing_provider::BillingProvider,
            clock::{Clock, SystemClock},
        },
    },
    infra::{
        InfraError,
        cache::{IdentityCache, SubscriptionStatusCache},
        config::AppConfig,
        postgres_persistence,
        stripe_client::StripeClient,
    },
    use_cases::{
        auth::AuthenticationGate,
        billing_webhook::BillingWebhookUseCases,
        identity::{IdentityResolver, PrincipalRepo},
        subscription::{SubscriptionRepo, SubscriptionUseCases},
        user::UserUseCases,
    },
};

const LOG_FILE: &str = "app.log";

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc =
        Arc::new(postgres_persistence(&config.database_url, config.database_max_connections).await?);
    let principal_repo = postgres_arc.clone() as Arc<dyn PrincipalRepo>;
    let subscription_repo = postgres_arc.clone() as Arc<dyn SubscriptionRepo>;

    let billing_provider =
        Arc::new(StripeClient::new(config.stripe_secret_key.clone())) as Arc<dyn BillingProvider>;

    Ok(build_app_state(
        config,
        principal_repo,
        subscription_repo,
        billing_provider,
        Arc::new(SystemClock),
    ))
}

/// Wire use cases around the given adapters. Caches start empty.
pub fn build_app_state(
    config: AppConfig,
    principal_repo: Arc<dyn PrincipalRepo>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
    billing_provider: Arc<dyn BillingProvider>,
    clock: Arc<dyn Clock>,
) -> AppState {
    let identity_cache = Arc::new(IdentityCache::new(config.identity_cache_ttl, clock.clone()));
    let status_cache = Arc::new(SubscriptionStatusCache::new(
        config.subscription_status_ttl,
        clock.clone(),
    ));

    let verifier = Arc::new(TokenVerifier::new(&config.jwt_secret, &config.jwt_audience));
    let resolver = Arc::new(IdentityResolver::new(
        principal_repo.clone(),
        identity_cache,
        config.auto_provision_users,
    ));
    let auth_gate = AuthenticationGate::new(verifier, resolver.clone());

    let subscription_use_cases = Arc::new(SubscriptionUseCases::new(
        subscription_repo,
        status_cache,
        clock,
        config.subscription_grace,
    ));
    let billing_webhook_use_cases = BillingWebhookUseCases::new(
        billing_provider,
        subscription_use_cases.clone(),
        config.retry_out_of_order_updates,
    );
    let user_use_cases = UserUseCases::new(principal_repo, resolver);

    AppState {
        config: Arc::new(config),
        auth_gate: Arc::new(auth_gate),
        user_use_cases: Arc::new(user_use_cases),
        subscription_use_cases,
        billing_webhook_use_cases: Arc::new(billing_webhook_use_cases),
    }
}

pub fn init_tracing() -> Result<(), InfraError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "billing_auth_api=debug,tower_http=debug".into());

    let console_layer = fmt::layer().with_target(false).with_level(true).pretty();

    let file = File::create(LOG_FILE).map_err(|source| InfraError::LogFile {
        path: LOG_FILE,
        source,
    })?;
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();

    Ok(())
}
