//! Solidity interface definitions used by the payment flow.
//!
//! - [`IERC20`] - approval, allowance and balance checks on the payment token
//! - [`IRewardRouter`] - per-chain router swapping between payment and bridge token
//! - [`IRewardMinter`] - destination contract minting a reward NFT paid in the bridge token
//!
//! The ABI shapes are fixed; only addresses are configurable.

use alloy_sol_types::sol;

sol! {
    /// Minimal ERC-20 interface.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
    }
}

sol! {
    /// Router converting between the payment token and the bridge token.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface IRewardRouter {
        function swapForBridge(uint256 amount) external returns (uint256);
        function swapFromBridge(uint256 amount, address recipient) external returns (uint256);
    }
}

sol! {
    /// Destination contract that mints a reward NFT to the recipient.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface IRewardMinter {
        function mintReward(address recipient, uint256 amount) external returns (uint256);
    }
}

/// Canonical signature of [`IRewardRouter::swapFromBridgeCall`].
pub const SWAP_FROM_BRIDGE_SIGNATURE: &str = "swapFromBridge(uint256,address)";

/// Canonical signature of [`IRewardMinter::mintRewardCall`].
pub const MINT_REWARD_SIGNATURE: &str = "mintReward(address,uint256)";

#[cfg(test)]
mod tests {
    use alloy_sol_types::SolCall;

    use super::*;

    #[test]
    fn test_signatures_match_bindings() {
        assert_eq!(
            IRewardRouter::swapFromBridgeCall::SIGNATURE,
            SWAP_FROM_BRIDGE_SIGNATURE
        );
        assert_eq!(IRewardMinter::mintRewardCall::SIGNATURE, MINT_REWARD_SIGNATURE);
    }
}
