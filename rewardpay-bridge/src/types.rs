//! Wire types of the bridge-and-execute service.

use rewardpay::bridge::{BridgeExecuteOutcome, BridgeStep};
use serde::{Deserialize, Serialize};

/// Response to `POST /v1/bridge-execute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentReceipt {
    /// Identifier to poll.
    pub intent_id: String,
    /// Steps the service is about to run, in order.
    #[serde(default)]
    pub expected_steps: Vec<BridgeStep>,
}

/// Lifecycle state of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentState {
    /// Finished; the outcome is available.
    Completed,
    /// Finished with an error.
    Failed,
    /// Any intermediate state.
    #[serde(other)]
    Pending,
}

/// Error object returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code, e.g. `INSUFFICIENT_ALLOWANCE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

/// Response to `GET /v1/intents/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentStatus {
    /// Current state.
    pub status: IntentState,
    /// Steps completed so far, in order.
    #[serde(default)]
    pub steps: Vec<BridgeStep>,
    /// Set once the intent completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BridgeExecuteOutcome>,
    /// Set once the intent failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}
