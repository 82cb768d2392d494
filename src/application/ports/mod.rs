pub mod billing_provider;
pub mod clock;
