//! Token approval step.

use alloy_primitives::{Address, TxHash, U256};
use alloy_sol_types::SolCall;

use crate::chain::{ChainClient, ContractCall};
use crate::contracts::IERC20;
use crate::error::StepError;

/// Makes sure `spender` may pull `amount` of `token` from the client's owner.
///
/// The owner's balance is checked first so that a short balance surfaces as
/// [`StepError::InsufficientBalance`] rather than a failed approval. If the
/// current allowance already covers `amount`, nothing is sent and `None` is
/// returned. Otherwise exactly one `approve(spender, amount)` is submitted and
/// its confirmed hash returned.
///
/// # Errors
///
/// Read failures, a rejected signature and a reverted approval are returned
/// as-is; this step never retries.
#[cfg_attr(
    feature = "telemetry",
    tracing::instrument(name = "approval", skip(client), fields(chain = client.chain_id()), err)
)]
pub async fn ensure_approval<C: ChainClient>(
    client: &C,
    token: Address,
    spender: Address,
    amount: U256,
) -> Result<Option<TxHash>, StepError> {
    let owner = client.owner();

    let balance = client.balance_of(token, owner).await?;
    if balance < amount {
        return Err(StepError::InsufficientBalance {
            required: amount,
            available: balance,
        });
    }

    let allowance = client.allowance(token, owner, spender).await?;

    #[cfg(feature = "telemetry")]
    tracing::trace!(%allowance, %amount, "checking allowance");

    if allowance >= amount {
        return Ok(None);
    }

    let call = ContractCall {
        to: token,
        calldata: IERC20::approveCall { spender, amount }.abi_encode().into(),
        label: "approve",
    };
    let hash = client.send(call).await?;

    #[cfg(feature = "telemetry")]
    tracing::info!(%hash, "approval confirmed");

    Ok(Some(hash))
}
