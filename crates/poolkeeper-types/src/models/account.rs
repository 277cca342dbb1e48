//! Account model and related types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generation resource an account serves, each with its own cooldown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Text,
    Images,
    Videos,
}

impl ResourceKind {
    pub const ALL: [Self; 3] = [Self::Text, Self::Images, Self::Videos];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Images => "images",
            Self::Videos => "videos",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "images" | "image" => Ok(Self::Images),
            "videos" | "video" => Ok(Self::Videos),
            other => Err(format!("unknown resource kind: {other}")),
        }
    }
}

/// A timed restriction placed on one resource after a rate-limit event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cooldown {
    /// Epoch seconds at which the restriction lifts
    pub until: f64,
    /// Why the restriction was placed
    pub reason: String,
}

/// Per-resource cooldowns. Absent means never restricted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResourceCooldowns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Cooldown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Cooldown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<Cooldown>,
}

impl ResourceCooldowns {
    pub const fn get(&self, kind: ResourceKind) -> Option<&Cooldown> {
        match kind {
            ResourceKind::Text => self.text.as_ref(),
            ResourceKind::Images => self.images.as_ref(),
            ResourceKind::Videos => self.videos.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: ResourceKind) -> &mut Option<Cooldown> {
        match kind {
            ResourceKind::Text => &mut self.text,
            ResourceKind::Images => &mut self.images,
            ResourceKind::Videos => &mut self.videos,
        }
    }

    pub fn set(&mut self, kind: ResourceKind, cooldown: Cooldown) {
        *self.slot_mut(kind) = Some(cooldown);
    }

    pub fn clear(&mut self, kind: ResourceKind) -> bool {
        self.slot_mut(kind).take().is_some()
    }
}

/// Pool account as tracked by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    /// Unique identifier for the account
    pub id: String,
    /// Optional display label (usually the login email)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Whether the account is disabled; disabled accounts are never scheduled
    #[serde(default)]
    pub disabled: bool,
    /// Reason for disable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
    /// Timestamp when account was disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_at: Option<i64>,
    /// Request errors counted by the serving path
    #[serde(default)]
    pub error_count: u32,
    /// Request failures counted by the serving path
    #[serde(default)]
    pub failure_count: u32,
    /// Credential/session expiry in epoch seconds, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Per-resource cooldowns
    #[serde(default)]
    pub cooldowns: ResourceCooldowns,
}

impl Account {
    /// Create a new, enabled account with no history.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            disabled: false,
            disabled_reason: None,
            disabled_at: None,
            error_count: 0,
            failure_count: 0,
            expires_at: None,
            cooldowns: ResourceCooldowns::default(),
        }
    }

    pub fn with_expiry(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Disable the account with a reason.
    pub fn disable(&mut self, reason: impl Into<String>, at: i64) {
        self.disabled = true;
        self.disabled_reason = Some(reason.into());
        self.disabled_at = Some(at);
    }

    /// Re-enable the account.
    pub fn enable(&mut self) {
        self.disabled = false;
        self.disabled_reason = None;
        self.disabled_at = None;
    }

    /// Whether the credential expires within `window_secs` of `now` (or already has).
    /// Unknown expiry counts as due.
    pub fn expires_within(&self, now: f64, window_secs: f64) -> bool {
        match self.expires_at {
            #[allow(clippy::cast_precision_loss, reason = "epoch seconds fit in f64")]
            Some(expires_at) => (expires_at as f64) - now <= window_secs,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disable_and_enable() {
        let mut acc = Account::new("acc-1");
        acc.disable("banned upstream", 1_700_000_000);
        assert!(acc.disabled);
        assert_eq!(acc.disabled_reason.as_deref(), Some("banned upstream"));

        acc.enable();
        assert!(!acc.disabled);
        assert!(acc.disabled_reason.is_none());
        assert!(acc.disabled_at.is_none());
    }

    #[test]
    fn test_expires_within() {
        let acc = Account::new("acc-1").with_expiry(10_000);
        assert!(acc.expires_within(9_000.0, 3_600.0));
        assert!(!acc.expires_within(1_000.0, 3_600.0));
        assert!(Account::new("unknown").expires_within(0.0, 1.0));
    }

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!("Images".parse::<ResourceKind>(), Ok(ResourceKind::Images));
        assert_eq!("video".parse::<ResourceKind>(), Ok(ResourceKind::Videos));
        assert!("audio".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_cooldown_slots() {
        let mut cooldowns = ResourceCooldowns::default();
        cooldowns.set(ResourceKind::Videos, Cooldown { until: 50.0, reason: "429".to_string() });
        assert!(cooldowns.get(ResourceKind::Videos).is_some());
        assert!(cooldowns.get(ResourceKind::Text).is_none());
        assert!(cooldowns.clear(ResourceKind::Videos));
        assert!(!cooldowns.clear(ResourceKind::Videos));
    }
}
