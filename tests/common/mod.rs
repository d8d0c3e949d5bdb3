//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Fixtures for models, operations and on-disk databases
//! - A scriptable in-process remote API
//! - Custom assertion macros

#![allow(dead_code)]

pub mod assertions;
pub mod fake_api;
pub mod fixtures;

// Re-export commonly used utilities
pub use fake_api::*;
pub use fixtures::*;
