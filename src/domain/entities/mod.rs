pub mod billing_event;
pub mod principal;
pub mod subscription;
