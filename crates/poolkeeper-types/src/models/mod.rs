//! Core domain models for Poolkeeper.
//!
//! This module contains all shared data structures used across the workspace.

mod account;
mod config;
mod quota;
mod refresh;
mod report;

// Re-export all models
pub use account::{Account, Cooldown, ResourceCooldowns, ResourceKind};
pub use config::{
    AppConfig, ExecutorConfig, ScheduledRefreshConfig, SchedulerTuning, ServerConfig,
    DEFAULT_MIN_BATCH_SIZE,
};
pub use quota::{AccountQuota, QuotaStatus};
pub use refresh::{FailureCategory, RefreshOutcome, ScheduledRefreshState};
pub use report::{
    AccountView, BatchConfigView, BatchSummary, ManualRefreshResponse, ManualRefreshSkip,
    SchedulerPhase, SchedulerStatusView, ScheduledRefreshStateEntry,
    ScheduledRefreshStatesResponse,
};
