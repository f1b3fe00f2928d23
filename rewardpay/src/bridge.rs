//! Bridge-and-execute contract.
//!
//! Bridging itself is delegated to an external cross-chain service. This
//! module defines what is handed to it ([`BridgeExecuteParams`]), what comes
//! back ([`BridgeExecuteOutcome`]) and how its internal steps are observed
//! ([`BridgeStepObserver`]).

use std::future::Future;

use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};

use crate::chain::{ChainConfig, ChainId};
use crate::contracts::{
    IRewardMinter, IRewardRouter, MINT_REWARD_SIGNATURE, SWAP_FROM_BRIDGE_SIGNATURE,
};
use crate::error::BridgeError;
use crate::types::DestinationAction;

/// The contract call performed on the destination chain once funds arrive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCall {
    /// Destination contract.
    pub contract: Address,
    /// Canonical function signature, e.g. `swapFromBridge(uint256,address)`.
    pub function: String,
    /// ABI-encoded call data.
    pub calldata: Bytes,
    /// Native value attached to the call.
    #[serde(default)]
    pub value: U256,
}

impl ExecuteCall {
    /// Builds the destination call for `action`.
    ///
    /// `amount` is denominated in the bridge token, as it arrives on the
    /// destination chain.
    #[must_use]
    pub fn for_action(
        action: &DestinationAction,
        destination: &ChainConfig,
        recipient: Address,
        amount: U256,
    ) -> Self {
        match *action {
            DestinationAction::SwapToRecipient => Self {
                contract: destination.router_address,
                function: SWAP_FROM_BRIDGE_SIGNATURE.to_owned(),
                calldata: IRewardRouter::swapFromBridgeCall { amount, recipient }
                    .abi_encode()
                    .into(),
                value: U256::ZERO,
            },
            DestinationAction::MintReward { contract } => Self {
                contract,
                function: MINT_REWARD_SIGNATURE.to_owned(),
                calldata: IRewardMinter::mintRewardCall { recipient, amount }
                    .abi_encode()
                    .into(),
                value: U256::ZERO,
            },
        }
    }
}

/// Everything the bridge service needs for one bridge-and-execute intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeExecuteParams {
    /// Bridge token on the source chain.
    pub token: Address,
    /// Bridge token symbol, e.g. `USDC`.
    pub token_symbol: String,
    /// Amount in bridge token units.
    pub amount: U256,
    /// Chain the funds leave from.
    pub source_chain_id: ChainId,
    /// Chain the funds arrive on and the call executes on.
    pub destination_chain_id: ChainId,
    /// Owner of the funds.
    pub sender: Address,
    /// Destination call.
    pub execute: ExecuteCall,
}

/// One step inside the bridge service's own flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStep {
    /// Step identifier as reported by the service, e.g. `INTENT_SUBMITTED`.
    pub name: String,
    /// Transaction produced by the step, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TxHash>,
    /// Explorer link for that transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

/// Result reported by the bridge service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeExecuteOutcome {
    /// Whether the destination call succeeded.
    pub success: bool,
    /// Destination call transaction.
    #[serde(default)]
    pub execute_transaction_hash: Option<TxHash>,
    /// Explorer link for the destination call.
    #[serde(default)]
    pub execute_explorer_url: Option<String>,
    /// Cross-chain transfer transaction.
    #[serde(default)]
    pub bridge_transaction_hash: Option<TxHash>,
    /// Explorer link for the transfer.
    #[serde(default)]
    pub bridge_explorer_url: Option<String>,
    /// The service found sufficient funds on the destination chain and did not bridge.
    #[serde(default)]
    pub bridge_skipped: bool,
}

/// Observer of the bridge service's internal steps.
pub trait BridgeStepObserver: Send + Sync {
    /// The full list of steps the service is about to run.
    fn expected_steps(&self, steps: &[BridgeStep]);

    /// A step finished.
    fn step_completed(&self, step: &BridgeStep);
}

/// Observer that ignores every step.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreSteps;

impl BridgeStepObserver for IgnoreSteps {
    fn expected_steps(&self, _steps: &[BridgeStep]) {}

    fn step_completed(&self, _step: &BridgeStep) {}
}

/// An external bridge-and-execute service.
///
/// Implementations classify every failure into a
/// [`FailureKind`](crate::error::FailureKind) before returning it.
pub trait BridgeExecutor: Send + Sync {
    /// Bridges `params.amount` and runs `params.execute` on the destination chain.
    fn bridge_and_execute(
        &self,
        params: &BridgeExecuteParams,
        observer: &dyn BridgeStepObserver,
    ) -> impl Future<Output = Result<BridgeExecuteOutcome, BridgeError>> + Send;
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;

    use super::*;

    fn destination() -> ChainConfig {
        ChainConfig {
            chain_id: 421_614,
            display_name: "Arbitrum Sepolia".to_owned(),
            rpc_endpoints: vec![],
            router_address: address!("1111111111111111111111111111111111111111"),
            source_token_address: address!("2222222222222222222222222222222222222222"),
            bridge_token_address: address!("3333333333333333333333333333333333333333"),
            source_token_decimals: 6,
            bridge_token_decimals: 6,
            explorer_url: None,
        }
    }

    #[test]
    fn test_swap_action_targets_router() {
        let recipient = address!("00000000000000000000000000000000000000aa");
        let call = ExecuteCall::for_action(
            &DestinationAction::SwapToRecipient,
            &destination(),
            recipient,
            U256::from(1_000_000u64),
        );
        assert_eq!(call.contract, destination().router_address);
        assert_eq!(call.function, SWAP_FROM_BRIDGE_SIGNATURE);
        assert_eq!(
            call.calldata[..4],
            IRewardRouter::swapFromBridgeCall::SELECTOR[..]
        );
        assert_eq!(call.value, U256::ZERO);
    }

    #[test]
    fn test_mint_action_targets_contract() {
        let minter = address!("00000000000000000000000000000000000000bb");
        let call = ExecuteCall::for_action(
            &DestinationAction::MintReward { contract: minter },
            &destination(),
            address!("00000000000000000000000000000000000000aa"),
            U256::from(5u64),
        );
        assert_eq!(call.contract, minter);
        assert_eq!(call.function, MINT_REWARD_SIGNATURE);
        assert_eq!(
            call.calldata[..4],
            IRewardMinter::mintRewardCall::SELECTOR[..]
        );
    }

    #[test]
    fn test_outcome_deserializes_sparse_payload() {
        let json = serde_json::json!({ "success": true, "bridgeSkipped": true });
        let outcome: BridgeExecuteOutcome = serde_json::from_value(json).unwrap();
        assert!(outcome.success);
        assert!(outcome.bridge_skipped);
        assert!(outcome.execute_transaction_hash.is_none());
    }
}
