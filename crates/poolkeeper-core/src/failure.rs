//! Helpers for refresh failure text: classification, truncation, id masking.

use poolkeeper_types::FailureCategory;

/// Longest `last_error` kept per account, in characters.
pub const MAX_ERROR_CHARS: usize = 500;

const CAPTCHA_RAW: &[&str] = &["验证码", "校验码"];
const CAPTCHA_LOWER: &[&str] = &["verification", "otp", "code", "captcha"];
const RISK_RAW: &[&str] = &["风控", "限制", "封禁"];
const RISK_LOWER: &[&str] = &["risk", "blocked", "rate limit", "429"];
const TIMEOUT_RAW: &[&str] = &["超时"];
const TIMEOUT_LOWER: &[&str] = &["timeout", "timed out"];
const ELEMENT_RAW: &[&str] = &["元素"];
const ELEMENT_LOWER: &[&str] = &["element", "selector"];
const NETWORK_RAW: &[&str] = &["网络"];
const NETWORK_LOWER: &[&str] = &["network", "connection", "dns"];

/// Bucket a failure message by keyword. First matching category wins.
pub fn classify_failure(message: &str) -> FailureCategory {
    let lower = message.to_lowercase();
    let matches = |raw: &[&str], low: &[&str]| {
        raw.iter().any(|k| message.contains(k)) || low.iter().any(|k| lower.contains(k))
    };

    if matches(CAPTCHA_RAW, CAPTCHA_LOWER) {
        FailureCategory::CaptchaOrCode
    } else if matches(RISK_RAW, RISK_LOWER) {
        FailureCategory::RiskOrRateLimit
    } else if matches(TIMEOUT_RAW, TIMEOUT_LOWER) {
        FailureCategory::Timeout
    } else if matches(ELEMENT_RAW, ELEMENT_LOWER) {
        FailureCategory::ElementNotFound
    } else if matches(NETWORK_RAW, NETWORK_LOWER) {
        FailureCategory::Network
    } else {
        FailureCategory::Other
    }
}

/// Cut `reason` to at most `max_chars` characters, on a char boundary.
pub fn truncate_reason(reason: &str, max_chars: usize) -> String {
    match reason.char_indices().nth(max_chars) {
        Some((idx, _)) => reason[..idx].to_string(),
        None => reason.to_string(),
    }
}

/// Mask an account id for logs, keeping only the last 6 characters.
pub fn mask_account_id(id: &str) -> String {
    let len = id.chars().count();
    if len <= 6 {
        return "*".repeat(len);
    }
    let tail: String = id.chars().skip(len - 6).collect();
    format!("{}{tail}", "*".repeat(len - 6))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_failure() {
        assert_eq!(classify_failure("OTP not received"), FailureCategory::CaptchaOrCode);
        assert_eq!(classify_failure("请输入验证码"), FailureCategory::CaptchaOrCode);
        assert_eq!(classify_failure("HTTP 429 Too Many"), FailureCategory::RiskOrRateLimit);
        assert_eq!(classify_failure("timeout"), FailureCategory::Timeout);
        assert_eq!(classify_failure("selector #login missing"), FailureCategory::ElementNotFound);
        assert_eq!(classify_failure("DNS lookup failed"), FailureCategory::Network);
        assert_eq!(classify_failure("boom"), FailureCategory::Other);
    }

    #[test]
    fn test_truncate_reason_respects_chars() {
        let long = "é".repeat(600);
        let cut = truncate_reason(&long, MAX_ERROR_CHARS);
        assert_eq!(cut.chars().count(), 500);
        assert_eq!(truncate_reason("short", MAX_ERROR_CHARS), "short");
    }

    #[test]
    fn test_mask_account_id() {
        assert_eq!(mask_account_id("user-1234567890"), "*********567890");
        assert_eq!(mask_account_id("abc"), "***");
        assert_eq!(mask_account_id(""), "");
    }
}
