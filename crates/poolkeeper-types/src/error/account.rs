//! Account-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during account registry operations.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum AccountError {
    /// Account with given ID not found
    #[error("Account not found: {id}")]
    NotFound {
        /// Unique identifier of the missing account
        id: String,
    },

    /// An account with the same ID is already registered
    #[error("Account already exists: {id}")]
    AlreadyExists {
        /// Unique identifier of the existing account
        id: String,
    },

    /// Account is disabled (manually or by the failure policy)
    #[error("Account {id} is disabled: {}", reason.as_deref().unwrap_or("no reason provided"))]
    Disabled {
        /// Unique identifier of the disabled account
        id: String,
        /// Optional explanation for why the account was disabled
        reason: Option<String>,
    },

    /// Another refresh attempt already holds the claim on this account
    #[error("Account {id} already has a refresh attempt in flight")]
    AlreadyInFlight {
        /// Unique identifier of the claimed account
        id: String,
    },

    /// The attempt token does not match the account's current claim
    /// (already completed, abandoned, or superseded)
    #[error("Attempt {attempt_id} is not the active claim for account {id}")]
    StaleAttempt {
        /// Unique identifier of the account
        id: String,
        /// Identifier of the rejected attempt
        attempt_id: String,
    },
}

impl AccountError {
    /// Losing a claim race is expected during scheduling and is skipped, not reported.
    pub const fn is_benign_skip(&self) -> bool {
        matches!(self, Self::AlreadyInFlight { .. })
    }
}
