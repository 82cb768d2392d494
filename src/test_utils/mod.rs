//! Test utilities shared by unit and HTTP-level tests.
//!
//! This module provides:
//! - Test data factories for creating valid fixtures
//! - In-memory repository implementations with call counters
//! - A manual clock, a stub billing provider and a token issuer
//! - `TestAppStateBuilder` for exercising the full router

mod app_state_builder;
mod auth_mocks;
mod billing_mocks;
mod factories;

pub use app_state_builder::*;
pub use auth_mocks::*;
pub use billing_mocks::*;
pub use factories::*;
