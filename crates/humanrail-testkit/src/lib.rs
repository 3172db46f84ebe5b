//! HumanRail Testing Infrastructure
//!
//! Shared fixtures for integration tests across the workspace: deterministic
//! keys, parameter builders, a tracing initializer and proptest strategies.
//!
//! Only use this crate from `tests/` directories. Unit tests inside an engine
//! crate would see a second copy of that crate's types.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod builders;
pub mod keys;
pub mod strategies;
pub mod tracing;

pub use builders::*;
pub use keys::KeyTestFixture;
pub use tracing::init_test_tracing;

/// Fixed clock used across integration tests (2023-11-14T22:13:20Z)
pub const TEST_NOW: i64 = 1_700_000_000;
