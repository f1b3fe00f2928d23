//! Known EVM testnets with PYUSD and USDC deployments.
//!
//! Token addresses, public RPC endpoints and explorers are fixed per chain.
//! The reward router is deployed per installation, so a [`ChainConfig`] is
//! only produced once its address is supplied.

use alloy_primitives::{Address, address};
use rewardpay::chain::{ChainConfig, ChainId, DEFAULT_TOKEN_DECIMALS};
use url::Url;

/// Ethereum Sepolia chain ID.
pub const ETHEREUM_SEPOLIA: ChainId = 11_155_111;

/// Arbitrum Sepolia chain ID.
pub const ARBITRUM_SEPOLIA: ChainId = 421_614;

/// PYUSD contract address on Ethereum Sepolia.
pub const PYUSD_ETHEREUM_SEPOLIA: Address = address!("CaC524BcA292aaade2DF8A05cC58F0a65B1B3bB9");

/// PYUSD contract address on Arbitrum Sepolia.
pub const PYUSD_ARBITRUM_SEPOLIA: Address = address!("637A1259C6afd7E3AdF63993cA7E58BB438aB1B1");

/// USDC contract address on Ethereum Sepolia.
pub const USDC_ETHEREUM_SEPOLIA: Address = address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238");

/// USDC contract address on Arbitrum Sepolia.
pub const USDC_ARBITRUM_SEPOLIA: Address = address!("75faf114eafb1BDbe2F0316DF893fd58CE46AA4d");

/// Static description of a known chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownNetwork {
    /// EIP-155 chain ID.
    pub chain_id: ChainId,
    /// Name shown to users.
    pub display_name: &'static str,
    /// Public RPC endpoints, highest priority first.
    pub rpc_endpoints: &'static [&'static str],
    /// PYUSD deployment.
    pub source_token: Address,
    /// USDC deployment.
    pub bridge_token: Address,
    /// Block explorer base URL.
    pub explorer: &'static str,
}

impl KnownNetwork {
    /// Builds the chain configuration with the given reward router.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the built-in URLs does not parse.
    pub fn chain_config(&self, router_address: Address) -> Result<ChainConfig, url::ParseError> {
        Ok(ChainConfig {
            chain_id: self.chain_id,
            display_name: self.display_name.to_owned(),
            rpc_endpoints: self
                .rpc_endpoints
                .iter()
                .map(|url| Url::parse(url))
                .collect::<Result<_, _>>()?,
            router_address,
            source_token_address: self.source_token,
            bridge_token_address: self.bridge_token,
            source_token_decimals: DEFAULT_TOKEN_DECIMALS,
            bridge_token_decimals: DEFAULT_TOKEN_DECIMALS,
            explorer_url: Some(Url::parse(self.explorer)?),
        })
    }
}

/// All built-in networks, ordered by chain ID.
pub const KNOWN_NETWORKS: &[KnownNetwork] = &[
    KnownNetwork {
        chain_id: ARBITRUM_SEPOLIA,
        display_name: "Arbitrum Sepolia",
        rpc_endpoints: &[
            "https://sepolia-rollup.arbitrum.io/rpc",
            "https://arbitrum-sepolia-rpc.publicnode.com",
        ],
        source_token: PYUSD_ARBITRUM_SEPOLIA,
        bridge_token: USDC_ARBITRUM_SEPOLIA,
        explorer: "https://sepolia.arbiscan.io",
    },
    KnownNetwork {
        chain_id: ETHEREUM_SEPOLIA,
        display_name: "Ethereum Sepolia",
        rpc_endpoints: &[
            "https://ethereum-sepolia-rpc.publicnode.com",
            "https://rpc.sepolia.org",
        ],
        source_token: PYUSD_ETHEREUM_SEPOLIA,
        bridge_token: USDC_ETHEREUM_SEPOLIA,
        explorer: "https://sepolia.etherscan.io",
    },
];

/// Looks up a built-in network.
#[must_use]
pub fn known_network(chain_id: ChainId) -> Option<&'static KnownNetwork> {
    KNOWN_NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;

    use super::*;

    #[test]
    fn test_known_networks_are_sorted_and_unique() {
        let ids: Vec<_> = KNOWN_NETWORKS.iter().map(|n| n.chain_id).collect();
        assert_eq!(ids, vec![ARBITRUM_SEPOLIA, ETHEREUM_SEPOLIA]);
    }

    #[test]
    fn test_every_known_network_builds_a_config() {
        let router = Address::repeat_byte(0x11);
        for network in KNOWN_NETWORKS {
            let config = network.chain_config(router).unwrap();
            assert_eq!(config.router_address, router);
            assert_eq!(config.rpc_endpoints.len(), 2);
            assert!(config.explorer_url.is_some());
            assert_eq!(config.source_token_decimals, 6);
        }
    }

    #[test]
    fn test_lookup_and_explorer_link() {
        let sepolia = known_network(ETHEREUM_SEPOLIA).unwrap();
        assert_eq!(sepolia.source_token, PYUSD_ETHEREUM_SEPOLIA);
        assert!(known_network(1).is_none());

        let config = sepolia.chain_config(Address::ZERO).unwrap();
        let hash = B256::repeat_byte(0xab);
        assert_eq!(
            config.tx_url(&hash).unwrap(),
            format!("https://sepolia.etherscan.io/tx/{hash}")
        );
    }
}
