//! Wallet session backed by a local private key.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use rewardpay::chain::{ChainConfig, ChainId, WalletSession};
use rewardpay::error::ChainError;

use crate::error::EvmError;
use crate::provider::{ClientSettings, Eip155ChainClient};

/// No chain selected yet. EIP-155 never assigns chain ID 0.
const NO_CHAIN: u64 = 0;

/// [`WalletSession`] for a key held in process.
///
/// A local key can sign for any chain, so switching only records the
/// selection. Every [`connect`](WalletSession::connect) builds a fresh
/// [`Eip155ChainClient`].
#[derive(Debug)]
pub struct LocalWalletSession {
    signer: PrivateKeySigner,
    settings: ClientSettings,
    active: AtomicU64,
}

impl LocalWalletSession {
    /// Creates a session with no active chain.
    #[must_use]
    pub const fn new(signer: PrivateKeySigner, settings: ClientSettings) -> Self {
        Self {
            signer,
            settings,
            active: AtomicU64::new(NO_CHAIN),
        }
    }

    /// Parses a hex private key, with or without `0x`.
    ///
    /// # Errors
    ///
    /// Returns [`EvmError::InvalidKey`] if the key is malformed.
    pub fn from_private_key(key: &str, settings: ClientSettings) -> Result<Self, EvmError> {
        let signer = key
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| EvmError::InvalidKey(e.to_string()))?;
        Ok(Self::new(signer, settings))
    }

    /// The signing address.
    #[must_use]
    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl WalletSession for LocalWalletSession {
    type Client = Eip155ChainClient;

    fn account(&self) -> Option<Address> {
        Some(self.signer.address())
    }

    async fn active_chain(&self) -> Result<Option<ChainId>, ChainError> {
        Ok(match self.active.load(Ordering::Relaxed) {
            NO_CHAIN => None,
            id => Some(id),
        })
    }

    async fn switch_chain(&self, chain: &ChainConfig) -> Result<(), ChainError> {
        #[cfg(feature = "telemetry")]
        tracing::info!(chain = chain.chain_id, name = %chain.display_name, "switching active chain");
        self.active.store(chain.chain_id, Ordering::Relaxed);
        Ok(())
    }

    async fn connect(&self, chain: &ChainConfig) -> Result<Eip155ChainClient, ChainError> {
        Ok(Eip155ChainClient::new(
            chain,
            self.signer.clone(),
            self.settings,
        )?)
    }
}
