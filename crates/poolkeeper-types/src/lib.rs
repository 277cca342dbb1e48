//! # Poolkeeper Types
//!
//! Core types, models, and error definitions for Poolkeeper.
//!
//! This crate provides the foundational type system for the Poolkeeper workspace:
//!
//! - **`error`** - Typed error hierarchy for accounts, refresh attempts, and configuration
//! - **`models`** - Domain models (Account, ScheduledRefreshState, config, report shapes)
//!
//! ## Architecture Role
//!
//! `poolkeeper-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!          poolkeeper-types (this crate)
//!                  │
//!                  ▼
//!           poolkeeper-core
//!                  │
//!                  ▼
//!          poolkeeper-server
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for the admin API and the on-disk account store
//! - **Clone** for cheap copying out of the registry into snapshots
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{AccountError, ConfigError, RefreshError};

// Re-export core model types
pub use models::{
    Account, AppConfig, FailureCategory, QuotaStatus, RefreshOutcome, ResourceKind,
    ScheduledRefreshConfig, ScheduledRefreshState, ScheduledRefreshStatesResponse,
    SchedulerTuning,
};
