//! Shared Module
//!
//! This module contains types that are used by every layer of the client:
//! domain models exchanged with the server and configuration.

/// Fitness domain models (steps, goals, profile)
pub mod models;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use models::{DailyStats, Goal, GoalPeriod, StepRecord, UserProfile, WeeklyTrend};
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
