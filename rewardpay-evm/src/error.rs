//! EVM errors and their classification.

use alloy_json_rpc::RpcError;
use alloy_provider::PendingTransactionError;
use alloy_transport::{TransportError, TransportErrorKind};
use rewardpay::chain::ChainId;
use rewardpay::error::{ChainError, FailureKind};

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_CODE: i64 = 4001;

/// Errors raised while talking to an EVM chain.
#[derive(Debug, thiserror::Error)]
pub enum EvmError {
    /// RPC transport or JSON-RPC error.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Waiting for the receipt failed or timed out.
    #[error(transparent)]
    PendingTransaction(#[from] PendingTransactionError),
    /// The transaction was mined but reverted.
    #[error("{label} transaction {tx_hash} reverted")]
    Reverted {
        /// Label of the call.
        label: &'static str,
        /// Hash of the reverted transaction.
        tx_hash: alloy_primitives::TxHash,
    },
    /// A call returned data that does not match the ABI.
    #[error("failed to decode call result: {0}")]
    Decode(#[from] alloy_sol_types::Error),
    /// The chain has no usable HTTP(S) RPC endpoint.
    #[error("chain {0} has no HTTP RPC endpoint")]
    NoEndpoints(ChainId),
    /// The private key could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidKey(String),
}

impl EvmError {
    /// Classifies this error for the payment flow.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(e) => classify_transport(e),
            Self::PendingTransaction(PendingTransactionError::TransportError(e)) => {
                classify_transport(e)
            }
            Self::PendingTransaction(e) => FailureKind::from_message(&e.to_string()),
            Self::Reverted { .. }
            | Self::Decode(_)
            | Self::NoEndpoints(_)
            | Self::InvalidKey(_) => FailureKind::Unknown,
        }
    }
}

impl From<EvmError> for ChainError {
    fn from(e: EvmError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

/// Maps a transport error onto a [`FailureKind`].
///
/// Structured signals (EIP-1193 codes, retryable JSON-RPC codes, HTTP 429)
/// take precedence; the message heuristic only runs when none applies.
#[must_use]
pub fn classify_transport(e: &TransportError) -> FailureKind {
    match e {
        RpcError::ErrorResp(payload) if payload.code == USER_REJECTED_CODE => {
            FailureKind::UserRejected
        }
        RpcError::ErrorResp(payload) if payload.is_retry_err() => FailureKind::RateLimited,
        RpcError::ErrorResp(payload) => FailureKind::from_message(&payload.message),
        RpcError::Transport(TransportErrorKind::HttpError(http)) if http.status == 429 => {
            FailureKind::RateLimited
        }
        other => FailureKind::from_message(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use alloy_json_rpc::ErrorPayload;
    use alloy_transport::HttpError;

    use super::*;

    fn payload(code: i64, message: &'static str) -> TransportError {
        RpcError::ErrorResp(ErrorPayload {
            code,
            message: message.into(),
            data: None,
        })
    }

    #[test]
    fn test_structured_codes_win() {
        assert_eq!(
            classify_transport(&payload(4001, "whatever")),
            FailureKind::UserRejected
        );
        assert_eq!(
            classify_transport(&payload(429, "slow down")),
            FailureKind::RateLimited
        );
        assert_eq!(
            classify_transport(&payload(-32005, "limit exceeded")),
            FailureKind::RateLimited
        );
    }

    #[test]
    fn test_revert_messages_fall_back_to_heuristic() {
        assert_eq!(
            classify_transport(&payload(3, "execution reverted: ERC20: insufficient allowance")),
            FailureKind::Allowance
        );
        assert_eq!(
            classify_transport(&payload(
                3,
                "execution reverted: ERC20: transfer amount exceeds balance"
            )),
            FailureKind::InsufficientBalance
        );
        assert_eq!(
            classify_transport(&payload(-32000, "nonce too low")),
            FailureKind::Unknown
        );
    }

    #[test]
    fn test_http_429_is_rate_limited() {
        let e = TransportErrorKind::http_error(429, "Too Many Requests".to_owned());
        assert_eq!(classify_transport(&e), FailureKind::RateLimited);
        let e = RpcError::Transport(TransportErrorKind::HttpError(HttpError {
            status: 502,
            body: "bad gateway".to_owned(),
        }));
        assert_eq!(classify_transport(&e), FailureKind::Unknown);
    }

    #[test]
    fn test_into_chain_error() {
        let e: ChainError = EvmError::NoEndpoints(1).into();
        assert_eq!(e.kind, FailureKind::Unknown);
        assert_eq!(e.message, "chain 1 has no HTTP RPC endpoint");
    }
}
