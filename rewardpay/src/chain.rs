//! Chain configuration and chain access.
//!
//! - [`ChainConfig`] / [`ChainRegistry`] - static per-chain contract addresses and RPC endpoints
//! - [`ChainClient`] - reads and writes on one chain on behalf of the wallet owner
//! - [`WalletSession`] - the connected wallet, from which chain clients are derived
//!
//! Chain clients are created per payment and passed explicitly to each step,
//! so no step holds hidden global state.

use std::collections::HashMap;
use std::future::Future;

use alloy_primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ChainError;

/// An EIP-155 chain ID (e.g., 11155111 for Sepolia).
pub type ChainId = u64;

/// Default decimals of PYUSD and USDC.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 6;

const fn default_decimals() -> u8 {
    DEFAULT_TOKEN_DECIMALS
}

/// Static configuration of one supported chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// EIP-155 chain ID.
    pub chain_id: ChainId,
    /// Name shown to users.
    pub display_name: String,
    /// RPC endpoints in priority order; the first is tried first.
    pub rpc_endpoints: Vec<Url>,
    /// Router exposing `swapForBridge` / `swapFromBridge`.
    pub router_address: Address,
    /// The payment token (PYUSD).
    pub source_token_address: Address,
    /// The token moved across chains (USDC).
    pub bridge_token_address: Address,
    /// Decimals of the payment token.
    #[serde(default = "default_decimals")]
    pub source_token_decimals: u8,
    /// Decimals of the bridge token.
    #[serde(default = "default_decimals")]
    pub bridge_token_decimals: u8,
    /// Block explorer base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<Url>,
}

impl ChainConfig {
    /// Block explorer link for a transaction, if an explorer is configured.
    #[must_use]
    pub fn tx_url(&self, hash: &TxHash) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/tx/{hash}", base.as_str().trim_end_matches('/')))
    }
}

/// The chain is not present in the [`ChainRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unsupported chain {0}")]
pub struct UnsupportedChain(pub ChainId);

/// Registry of chain configurations keyed by chain ID.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry(HashMap<ChainId, ChainConfig>);

impl ChainRegistry {
    /// Builds a registry. Later entries replace earlier ones with the same chain ID.
    #[must_use]
    pub fn new(configs: impl IntoIterator<Item = ChainConfig>) -> Self {
        Self(
            configs
                .into_iter()
                .map(|config| (config.chain_id, config))
                .collect(),
        )
    }

    /// Looks up a chain.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedChain`] if the chain is not registered.
    pub fn get_config(&self, chain_id: ChainId) -> Result<&ChainConfig, UnsupportedChain> {
        self.0.get(&chain_id).ok_or(UnsupportedChain(chain_id))
    }

    /// Adds or replaces a chain, returning the previous configuration.
    pub fn insert(&mut self, config: ChainConfig) -> Option<ChainConfig> {
        self.0.insert(config.chain_id, config)
    }

    /// All registered configurations ordered by chain ID.
    #[must_use]
    pub fn configs(&self) -> Vec<&ChainConfig> {
        let mut configs: Vec<_> = self.0.values().collect();
        configs.sort_by_key(|c| c.chain_id);
        configs
    }
}

/// A contract call to be signed and sent by the wallet owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    /// Target contract.
    pub to: Address,
    /// ABI-encoded call data.
    pub calldata: Bytes,
    /// Short label for logs (e.g. `"approve"`).
    pub label: &'static str,
}

/// Read and write access to one chain for the connected wallet owner.
///
/// Reads may use a different (rate-limit friendlier) connection than writes.
pub trait ChainClient: Send + Sync {
    /// The address that signs transactions.
    fn owner(&self) -> Address;

    /// The chain this client talks to.
    fn chain_id(&self) -> ChainId;

    /// ERC-20 `balanceOf(owner)`.
    fn balance_of(
        &self,
        token: Address,
        owner: Address,
    ) -> impl Future<Output = Result<U256, ChainError>> + Send;

    /// ERC-20 `allowance(owner, spender)`.
    fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = Result<U256, ChainError>> + Send;

    /// Signs and sends a call, resolving once it is confirmed on-chain.
    ///
    /// A reverted transaction is an error.
    fn send(&self, call: ContractCall) -> impl Future<Output = Result<TxHash, ChainError>> + Send;
}

/// A connected wallet from which per-chain clients are derived.
pub trait WalletSession: Send + Sync {
    /// Client type produced by [`connect`](Self::connect).
    type Client: ChainClient;

    /// The connected account, if any.
    fn account(&self) -> Option<Address>;

    /// The chain the wallet currently signs for, if one was selected.
    fn active_chain(&self) -> impl Future<Output = Result<Option<ChainId>, ChainError>> + Send;

    /// Asks the wallet to switch to `chain`.
    fn switch_chain(
        &self,
        chain: &ChainConfig,
    ) -> impl Future<Output = Result<(), ChainError>> + Send;

    /// Derives a fresh client for `chain` from the current session.
    fn connect(
        &self,
        chain: &ChainConfig,
    ) -> impl Future<Output = Result<Self::Client, ChainError>> + Send;
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, b256};

    use super::*;

    fn config(chain_id: ChainId) -> ChainConfig {
        ChainConfig {
            chain_id,
            display_name: format!("chain-{chain_id}"),
            rpc_endpoints: vec!["https://rpc.example".parse().unwrap()],
            router_address: address!("1111111111111111111111111111111111111111"),
            source_token_address: address!("2222222222222222222222222222222222222222"),
            bridge_token_address: address!("3333333333333333333333333333333333333333"),
            source_token_decimals: 6,
            bridge_token_decimals: 6,
            explorer_url: Some("https://explorer.example/".parse().unwrap()),
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ChainRegistry::new([config(1), config(2)]);
        assert_eq!(registry.get_config(1).unwrap().chain_id, 1);
        assert_eq!(registry.get_config(3), Err(UnsupportedChain(3)));
        let ids: Vec<_> = registry.configs().iter().map(|c| c.chain_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_registry_insert_replaces() {
        let mut registry = ChainRegistry::new([config(1)]);
        let mut updated = config(1);
        updated.display_name = "renamed".to_owned();
        let previous = registry.insert(updated);
        assert_eq!(previous.unwrap().display_name, "chain-1");
        assert_eq!(registry.get_config(1).unwrap().display_name, "renamed");
    }

    #[test]
    fn test_tx_url() {
        let hash = b256!("00000000000000000000000000000000000000000000000000000000000000aa");
        assert_eq!(
            config(1).tx_url(&hash).unwrap(),
            format!("https://explorer.example/tx/{hash}")
        );
        let mut no_explorer = config(1);
        no_explorer.explorer_url = None;
        assert!(no_explorer.tx_url(&hash).is_none());
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let json = serde_json::json!({
            "chainId": 421614,
            "displayName": "Arbitrum Sepolia",
            "rpcEndpoints": ["https://a.example", "https://b.example"],
            "routerAddress": "0x1111111111111111111111111111111111111111",
            "sourceTokenAddress": "0x2222222222222222222222222222222222222222",
            "bridgeTokenAddress": "0x3333333333333333333333333333333333333333"
        });
        let config: ChainConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.source_token_decimals, 6);
        assert_eq!(config.rpc_endpoints.len(), 2);
        assert!(config.explorer_url.is_none());

        let out = serde_json::to_value(&config).unwrap();
        assert_eq!(out["chainId"], 421_614);
        assert_eq!(out["sourceTokenDecimals"], 6);
    }
}
