pub mod auth;
pub mod billing_webhook;
pub mod identity;
pub mod subscription;
pub mod user;
