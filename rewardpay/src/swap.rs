//! Local swap step.

use std::time::Duration;

use alloy_primitives::{Address, TxHash, U256};
use alloy_sol_types::SolCall;

use crate::chain::{ChainClient, ContractCall};
use crate::contracts::IRewardRouter;
use crate::error::StepError;

/// Swaps `amount` of the payment token into the bridge token on `router`.
///
/// Waits for confirmation, then for `settle_delay` so that read endpoints
/// and the bridge service observe the new bridge token balance.
///
/// # Errors
///
/// Any send failure is returned; this step never retries.
#[cfg_attr(
    feature = "telemetry",
    tracing::instrument(name = "swap", skip(client), fields(chain = client.chain_id()), err)
)]
pub async fn swap_for_bridge<C: ChainClient>(
    client: &C,
    router: Address,
    amount: U256,
    settle_delay: Duration,
) -> Result<TxHash, StepError> {
    let call = ContractCall {
        to: router,
        calldata: IRewardRouter::swapForBridgeCall { amount }.abi_encode().into(),
        label: "swapForBridge",
    };
    let hash = client.send(call).await?;

    #[cfg(feature = "telemetry")]
    tracing::info!(%hash, ?settle_delay, "swap confirmed, waiting for balances to settle");

    tokio::time::sleep(settle_delay).await;
    Ok(hash)
}
