//! # Poolkeeper Core
//!
//! Account registry and scheduled-refresh coordinator.
//!
//! ```text
//! poolkeeper-core/src/
//! ├── registry/      # per-account state, claims, AttemptGuard
//! ├── scheduler/     # tick state machine, selection, driver loop
//! ├── executor/      # RefreshExecutor trait + HTTP webhook
//! ├── backoff.rs     # pure backoff policy
//! ├── quota.rs       # derived per-resource availability
//! ├── reporter.rs    # admin API projections
//! ├── clock.rs       # epoch seconds + Beijing formatting
//! └── modules/       # config file, accounts.json, logger
//! ```

#![allow(
    clippy::significant_drop_tightening,
    reason = "DashMap entry guards are scoped to a single account update"
)]
#![allow(
    clippy::derive_partial_eq_without_eq,
    reason = "Some types intentionally don't implement Eq"
)]
// Test-only lints: allow panic!, unwrap, float equality in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::float_cmp,
        clippy::assertions_on_result_states
    )
)]

pub mod backoff;
pub mod clock;
pub mod error;
pub mod executor;
pub mod failure;
pub mod modules;
pub mod quota;
pub mod registry;
pub mod reporter;
pub mod scheduler;

// Re-export commonly used types
pub use backoff::BackoffPolicy;
pub use clock::{format_beijing, Clock, ManualClock, SystemClock};
pub use error::{AppError, AppResult};
pub use executor::{HttpRefreshExecutor, RefreshExecutor, UnconfiguredExecutor};
pub use quota::QuotaTracker;
pub use registry::{AccountRegistry, AccountSnapshot, AttemptGuard, AttemptToken, RefreshPolicy};
pub use reporter::StateReporter;
pub use scheduler::{BatchConfig, RefreshScheduler, SchedulerSettings, SchedulerStatus};
