//! Refresh attempt errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a single refresh attempt failed.
///
/// These never abort a batch; they are folded into the account's
/// `last_error` through [`crate::models::RefreshOutcome::Failure`].
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum RefreshError {
    /// The executor did not answer within the per-attempt timeout
    #[error("timeout")]
    Timeout {
        /// Timeout that elapsed, in seconds
        after_secs: u64,
    },

    /// The executor reported a failure (auth error, network error, ...)
    #[error("{reason}")]
    Executor {
        /// Failure text as returned by the executor
        reason: String,
    },
}
