//! Error types for the payment flow.
//!
//! Failures are tagged with a [`FailureKind`] once, at the boundary where a
//! raw provider or bridge error is caught. Everything downstream (the retry
//! controller, result construction) branches on the kind, never on text.

use std::fmt;

use alloy_primitives::U256;

use crate::amount::AmountError;
use crate::chain::{ChainId, UnsupportedChain};

/// Classification of an external failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The remote side throttled the request (HTTP 429, "rate limit", ...).
    RateLimited,
    /// A token allowance or approval was not yet visible to the remote side.
    Allowance,
    /// The wallet owner declined to sign.
    UserRejected,
    /// The owner does not hold enough of the token.
    InsufficientBalance,
    /// Anything else.
    Unknown,
}

impl FailureKind {
    /// Whether the bridge step may be resubmitted after this failure.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Allowance)
    }

    /// Derives a kind from an error message.
    ///
    /// Only for boundaries that expose nothing but text (JSON-RPC revert
    /// strings, bridge service error messages).
    #[must_use]
    pub fn from_message(message: &str) -> Self {
        let message = message.to_ascii_lowercase();
        if message.contains("rate limit")
            || message.contains("too many requests")
            || message
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|token| token == "429")
        {
            Self::RateLimited
        } else if message.contains("user rejected")
            || message.contains("user denied")
            || message.contains("rejected the request")
        {
            Self::UserRejected
        } else if message.contains("insufficient balance")
            || message.contains("transfer amount exceeds balance")
        {
            Self::InsufficientBalance
        } else if message.contains("allowance") || message.contains("approval") {
            Self::Allowance
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RateLimited => "rate_limited",
            Self::Allowance => "allowance",
            Self::UserRejected => "user_rejected",
            Self::InsufficientBalance => "insufficient_balance",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A classified failure reported by a chain client or wallet session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ChainError {
    /// Failure classification.
    pub kind: FailureKind,
    /// Raw message from the provider.
    pub message: String,
}

impl ChainError {
    /// Creates an error with an explicit kind.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an error whose kind is derived from the message text.
    #[must_use]
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: FailureKind::from_message(&message),
            message,
        }
    }
}

/// A classified failure reported by the bridge-and-execute service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BridgeError {
    /// Failure classification.
    pub kind: FailureKind,
    /// Raw message from the bridge service.
    pub message: String,
}

impl BridgeError {
    /// Creates an error with an explicit kind.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an error whose kind is derived from the message text.
    #[must_use]
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: FailureKind::from_message(&message),
            message,
        }
    }
}

/// Errors raised by the approval and swap steps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    /// The owner holds less than the payment amount.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount the payment needs, in token units.
        required: U256,
        /// Amount the owner holds, in token units.
        available: U256,
    },
    /// The wallet owner declined to sign.
    #[error("user rejected the transaction: {0}")]
    UserRejected(String),
    /// Any other chain failure.
    #[error(transparent)]
    Chain(ChainError),
}

impl From<ChainError> for StepError {
    fn from(e: ChainError) -> Self {
        match e.kind {
            FailureKind::UserRejected => Self::UserRejected(e.message),
            _ => Self::Chain(e),
        }
    }
}

/// Failures detected before any transaction is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    /// No wallet account is connected.
    #[error("no wallet signer connected")]
    MissingSigner,
    /// The chain is not in the registry.
    #[error("unsupported chain {0}")]
    UnsupportedChain(ChainId),
    /// Source and destination chain are the same.
    #[error("source and destination chain must differ (both {0})")]
    SameChain(ChainId),
    /// The amount is malformed or not positive.
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),
    /// Another payment is running on this orchestrator.
    #[error("a payment is already in progress")]
    PaymentInProgress,
    /// Switching or connecting the wallet failed.
    #[error("wallet unavailable: {0}")]
    Wallet(ChainError),
}

impl From<UnsupportedChain> for PreconditionError {
    fn from(e: UnsupportedChain) -> Self {
        Self::UnsupportedChain(e.0)
    }
}

/// Terminal failure of a payment after the init step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentFailure {
    /// The approval step failed.
    #[error("approval failed: {0}")]
    Approval(StepError),
    /// The swap step failed.
    #[error("swap failed: {0}")]
    Swap(StepError),
    /// The bridge step failed with a non-retryable error.
    #[error("bridge failed: {0}")]
    Bridge(BridgeError),
    /// The bridge step stayed rate limited for every attempt.
    #[error("network congested: bridge still failing after {attempts} attempts: {last}")]
    NetworkCongested {
        /// Attempts made.
        attempts: usize,
        /// The final error.
        last: BridgeError,
    },
}

impl PaymentFailure {
    /// Short human-readable summary for the UI.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Approval(StepError::InsufficientBalance { .. }) => {
                "Insufficient balance for this payment".to_owned()
            }
            Self::Approval(StepError::UserRejected(_)) | Self::Swap(StepError::UserRejected(_)) => {
                "Transaction rejected in wallet".to_owned()
            }
            Self::Approval(_) => "Token approval failed".to_owned(),
            Self::Swap(_) => "Swap to bridge token failed".to_owned(),
            Self::Bridge(_) => "Cross-chain transfer failed".to_owned(),
            Self::NetworkCongested { attempts, .. } => {
                format!("Network congested, cross-chain transfer failed after {attempts} attempts")
            }
        }
    }
}
