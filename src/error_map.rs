//! Translation of upstream failures into fixed user-facing messages.

use crate::clients::UpstreamError;

pub const QUOTA_EXCEEDED: &str = "The AI service is receiving too many requests right now (quota exceeded). Please wait a moment and try again.";
pub const INVALID_REQUEST: &str = "The request was rejected as invalid. The study may be too long or in an unsupported format; try shortening it or using a different input.";
pub const SERVICE_UNAVAILABLE: &str =
    "The AI service is temporarily unavailable or overloaded. Please try again in a few minutes.";
pub const SAFETY_BLOCKED: &str = "The response was blocked by the AI service's safety filters. Try rephrasing the input or using a different study.";
pub const CONNECTIVITY: &str = "Could not reach the AI service. Please check your connection and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    QuotaExceeded,
    InvalidRequest,
    ServiceUnavailable,
    SafetyBlocked,
    Connectivity,
}

impl FailureClass {
    pub fn message(self) -> &'static str {
        match self {
            FailureClass::QuotaExceeded => QUOTA_EXCEEDED,
            FailureClass::InvalidRequest => INVALID_REQUEST,
            FailureClass::ServiceUnavailable => SERVICE_UNAVAILABLE,
            FailureClass::SafetyBlocked => SAFETY_BLOCKED,
            FailureClass::Connectivity => CONNECTIVITY,
        }
    }
}

/// Classify a raw failure description by known substrings.
///
/// Status markers are checked before safety markers. A bare "blocked" is not
/// a safety marker: permission failures use it too.
pub fn classify_message(message: &str) -> FailureClass {
    let upper = message.to_uppercase();
    let has = |needles: &[&str]| needles.iter().any(|n| upper.contains(n));
    if has(&["429", "RESOURCE_EXHAUSTED", "QUOTA"]) {
        FailureClass::QuotaExceeded
    } else if has(&["400", "INVALID_ARGUMENT"]) {
        FailureClass::InvalidRequest
    } else if has(&["503", "UNAVAILABLE", "OVERLOADED"]) {
        FailureClass::ServiceUnavailable
    } else if has(&["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST"]) {
        FailureClass::SafetyBlocked
    } else {
        FailureClass::Connectivity
    }
}

pub fn classify(err: &UpstreamError) -> FailureClass {
    match err {
        UpstreamError::Blocked { .. } => FailureClass::SafetyBlocked,
        UpstreamError::Http { status: 429, .. } => FailureClass::QuotaExceeded,
        UpstreamError::Http { status: 400, .. } => FailureClass::InvalidRequest,
        UpstreamError::Http { status: 503, .. } => FailureClass::ServiceUnavailable,
        other => classify_message(&other.to_string()),
    }
}

/// User-facing message for an upstream failure. Never fails.
pub fn user_message(err: &UpstreamError) -> &'static str {
    classify(err).message()
}
