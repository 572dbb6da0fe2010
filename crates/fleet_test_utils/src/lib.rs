//! # Fleet Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Determinism test harness
//! - Map and ship fixtures plus a sandbox environment
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

pub use determinism::strategies;

/// Re-export proptest for convenience.
pub use proptest;
