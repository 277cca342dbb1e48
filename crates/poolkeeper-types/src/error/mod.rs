//! Typed error definitions for Poolkeeper.
//!
//! This module provides a structured error hierarchy with specific error types
//! for different domains. All errors are designed to be:
//!
//! - **Serializable** for API responses via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for error handling logic via enum variants

mod account;
mod config;
mod refresh;

pub use account::AccountError;
pub use config::ConfigError;
pub use refresh::RefreshError;
