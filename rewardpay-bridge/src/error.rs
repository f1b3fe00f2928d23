//! Errors of the bridge service client and their classification.

use reqwest::StatusCode;
use rewardpay::error::{BridgeError, FailureKind};

use crate::types::ErrorBody;

/// Errors that can occur while talking to the bridge service.
#[derive(Debug, thiserror::Error)]
pub enum HttpBridgeError {
    /// URL construction failed.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// The API key is not a valid header value.
    #[error("API key is not a valid header value")]
    InvalidApiKey,
    /// HTTP transport error.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// JSON deserialization error.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Non-success HTTP status.
    #[error("Unexpected HTTP status {status}: {context}: {}", .body.message)]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The error body, or the raw text as message if it was not JSON.
        body: ErrorBody,
    },
    /// The service reported the intent as failed.
    #[error("intent {intent_id} failed: {}", .body.message)]
    IntentFailed {
        /// The failed intent.
        intent_id: String,
        /// Error reported by the service.
        body: ErrorBody,
    },
    /// The status of an accepted intent could not be read.
    #[error("status of intent {intent_id} unavailable: {source}")]
    StatusUnavailable {
        /// The intent.
        intent_id: String,
        /// The failed status request.
        #[source]
        source: Box<HttpBridgeError>,
    },
    /// The intent completed without an outcome.
    #[error("intent {intent_id} completed without an outcome")]
    MissingOutcome {
        /// The intent.
        intent_id: String,
    },
    /// The intent was still pending after every poll.
    #[error("intent {intent_id} still pending after {polls} polls")]
    PollBudgetExhausted {
        /// The intent.
        intent_id: String,
        /// Polls made.
        polls: usize,
    },
}

impl HttpBridgeError {
    /// Classifies this error for the payment flow.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::HttpStatus { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS => {
                FailureKind::RateLimited
            }
            Self::HttpStatus { body, .. } | Self::IntentFailed { body, .. } => classify_body(body),
            Self::UrlParse { .. }
            | Self::InvalidApiKey
            | Self::Http { .. }
            | Self::JsonDeserialization { .. }
            | Self::StatusUnavailable { .. }
            | Self::MissingOutcome { .. }
            | Self::PollBudgetExhausted { .. } => FailureKind::Unknown,
        }
    }

    /// Whether a read may simply be repeated: throttling, server errors and
    /// transport failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { .. } => true,
            Self::HttpStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => false,
        }
    }
}

impl From<HttpBridgeError> for BridgeError {
    fn from(e: HttpBridgeError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

/// Maps a service error code onto a [`FailureKind`].
#[must_use]
pub fn kind_from_code(code: &str) -> Option<FailureKind> {
    match code.to_ascii_uppercase().as_str() {
        "RATE_LIMITED" | "TOO_MANY_REQUESTS" => Some(FailureKind::RateLimited),
        "INSUFFICIENT_ALLOWANCE" | "ALLOWANCE_NOT_SET" => Some(FailureKind::Allowance),
        "INSUFFICIENT_BALANCE" | "INSUFFICIENT_FUNDS" => Some(FailureKind::InsufficientBalance),
        "USER_REJECTED" => Some(FailureKind::UserRejected),
        _ => None,
    }
}

fn classify_body(body: &ErrorBody) -> FailureKind {
    body.code
        .as_deref()
        .and_then(kind_from_code)
        .unwrap_or_else(|| FailureKind::from_message(&body.message))
}
