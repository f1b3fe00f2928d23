//! Payment requests and results.

use alloy_primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};

use crate::chain::ChainId;
use crate::error::PaymentFailure;

/// What happens with the bridged funds on the destination chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DestinationAction {
    /// The destination router swaps the bridge token back into the payment
    /// token and sends it to the recipient.
    #[default]
    SwapToRecipient,
    /// A reward contract mints an NFT to the recipient, paid with the bridge token.
    MintReward {
        /// The reward contract on the destination chain.
        contract: Address,
    },
}

/// A single cross-chain payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Human-readable amount in payment token units (e.g. `"100.50"`).
    pub amount: String,
    /// Chain holding the payer's funds.
    pub source_chain_id: ChainId,
    /// Chain the recipient is paid on.
    pub destination_chain_id: ChainId,
    /// Recipient of the payout.
    pub recipient_address: Address,
    /// Destination-side action.
    #[serde(default)]
    pub action: DestinationAction,
}

/// Terminal outcome of one payment.
///
/// Hashes of steps that completed are kept even when a later step failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    /// Whether the destination call succeeded.
    pub success: bool,
    /// Approval transaction, if one was needed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_tx_hash: Option<TxHash>,
    /// Local swap transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_tx_hash: Option<TxHash>,
    /// Destination execute transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_tx_hash: Option<TxHash>,
    /// Explorer link for the execute transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_explorer_url: Option<String>,
    /// Bridge transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_tx_hash: Option<TxHash>,
    /// Explorer link for the bridge transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_explorer_url: Option<String>,
    /// Whether the bridge service found destination funds and skipped bridging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_skipped: Option<bool>,
    /// Raw error for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable summary.
    pub message: String,
}

/// Hashes collected while a payment advances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentProgress {
    /// Approval transaction, if one was sent.
    pub approval_tx_hash: Option<TxHash>,
    /// Swap transaction, once confirmed.
    pub swap_tx_hash: Option<TxHash>,
}

impl PaymentResult {
    /// Builds a failed result that keeps the partial progress.
    #[must_use]
    pub fn failed(progress: PaymentProgress, failure: &PaymentFailure) -> Self {
        Self {
            success: false,
            approval_tx_hash: progress.approval_tx_hash,
            swap_tx_hash: progress.swap_tx_hash,
            error: Some(failure.to_string()),
            message: failure.summary(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, b256};

    use super::*;
    use crate::error::{BridgeError, FailureKind};

    #[test]
    fn test_request_deserializes_with_default_action() {
        let json = serde_json::json!({
            "amount": "100.50",
            "sourceChainId": 11155111,
            "destinationChainId": 421614,
            "recipientAddress": "0x00000000000000000000000000000000000000aa"
        });
        let request: PaymentRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.action, DestinationAction::SwapToRecipient);
        assert_eq!(
            request.recipient_address,
            address!("00000000000000000000000000000000000000aa")
        );
    }

    #[test]
    fn test_mint_action_serialization() {
        let action = DestinationAction::MintReward {
            contract: address!("00000000000000000000000000000000000000bb"),
        };
        let json = serde_json::to_value(action).unwrap();
        assert_eq!(json["type"], "mintReward");
        let back: DestinationAction = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn test_failed_result_keeps_progress() {
        let progress = PaymentProgress {
            approval_tx_hash: Some(b256!(
                "0000000000000000000000000000000000000000000000000000000000000001"
            )),
            swap_tx_hash: Some(b256!(
                "0000000000000000000000000000000000000000000000000000000000000002"
            )),
        };
        let failure = PaymentFailure::Bridge(BridgeError::new(FailureKind::Unknown, "boom"));
        let result = PaymentResult::failed(progress, &failure);
        assert!(!result.success);
        assert_eq!(result.swap_tx_hash, progress.swap_tx_hash);
        assert_eq!(result.error.as_deref(), Some("bridge failed: boom"));

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("approvalTxHash").is_some());
        assert!(json.get("executeTxHash").is_none());
    }
}
