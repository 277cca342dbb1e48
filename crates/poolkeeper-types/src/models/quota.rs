//! Quota data models.

use serde::{Deserialize, Serialize};

/// Availability of one resource type for one account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaStatus {
    /// Whether requests of this type may be served right now
    pub available: bool,
    /// Seconds until the restriction lifts (absent when available or open-ended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<f64>,
    /// Why the resource is restricted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl QuotaStatus {
    pub const fn available() -> Self {
        Self { available: true, remaining_seconds: None, reason: None }
    }

    pub fn restricted(remaining_seconds: Option<f64>, reason: impl Into<String>) -> Self {
        Self { available: false, remaining_seconds, reason: Some(reason.into()) }
    }
}

/// Derived quota view for an account across all resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountQuota {
    pub text: QuotaStatus,
    pub images: QuotaStatus,
    pub videos: QuotaStatus,
    /// Longest remaining cooldown across resources, 0 when none is active
    pub cooldown_seconds: f64,
    /// Reason attached to the longest active cooldown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_reason: Option<String>,
}

impl AccountQuota {
    /// Whether at least one resource can serve requests.
    pub const fn any_available(&self) -> bool {
        self.text.available || self.images.available || self.videos.available
    }
}
