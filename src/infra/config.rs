use std::net::SocketAddr;

use axum::http::HeaderValue;
use chrono::Duration;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;

pub struct AppConfig {
    /// Shared secret the identity provider signs access tokens with.
    pub jwt_secret: SecretString,
    pub jwt_audience: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
    pub stripe_secret_key: SecretString,
    pub stripe_webhook_secret: SecretString,
    /// Maximum age of a signed webhook timestamp.
    pub stripe_webhook_tolerance_secs: i64,
    /// Value the identity provider sends in `x-supabase-secret`.
    pub supabase_webhook_secret: SecretString,
    pub identity_cache_ttl: Duration,
    pub subscription_status_ttl: Duration,
    /// Access is kept this long past `current_period_end` to absorb renewal webhook latency.
    pub subscription_grace: Duration,
    /// Create a local principal the first time a valid token for an unknown subject is seen.
    pub auto_provision_users: bool,
    /// Answer out-of-order subscription updates with 409 so the provider re-delivers.
    pub retry_out_of_order_updates: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let jwt_audience: String = get_env_default("JWT_AUDIENCE", "authenticated".to_string());

        let database_url: String = get_env("DATABASE_URL");
        let database_max_connections: u32 = get_env_default("DATABASE_MAX_CONNECTIONS", 5);

        let bind_addr: SocketAddr =
            get_env_default("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3001)));
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:3000"));

        let stripe_secret_key = SecretString::new(get_env::<String>("STRIPE_SECRET_KEY").into());
        let stripe_webhook_secret =
            SecretString::new(get_env::<String>("STRIPE_WEBHOOK_SECRET").into());
        let stripe_webhook_tolerance_secs: i64 =
            get_env_default("STRIPE_WEBHOOK_TOLERANCE_SECS", 300);
        let supabase_webhook_secret =
            SecretString::new(get_env::<String>("SUPABASE_WEBHOOK_SECRET").into());

        let identity_cache_ttl_secs: i64 = get_env_default("IDENTITY_CACHE_TTL_SECS", 300);
        let subscription_status_ttl_secs: i64 =
            get_env_default("SUBSCRIPTION_STATUS_TTL_SECS", 120);
        let subscription_grace_secs: i64 = get_env_default("SUBSCRIPTION_GRACE_SECS", 86_400);

        let auto_provision_users: bool = get_env_default("AUTO_PROVISION_USERS", true);
        let retry_out_of_order_updates: bool = get_env_default("RETRY_OUT_OF_ORDER_UPDATES", false);

        Self {
            jwt_secret,
            jwt_audience,
            database_url,
            database_max_connections,
            bind_addr,
            cors_origin,
            stripe_secret_key,
            stripe_webhook_secret,
            stripe_webhook_tolerance_secs,
            supabase_webhook_secret,
            identity_cache_ttl: Duration::seconds(identity_cache_ttl_secs),
            subscription_status_ttl: Duration::seconds(subscription_status_ttl_secs),
            subscription_grace: Duration::seconds(subscription_grace_secs),
            auto_provision_users,
            retry_out_of_order_updates,
        }
    }
}
