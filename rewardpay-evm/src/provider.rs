//! EIP-155 chain client.
//!
//! [`Eip155ChainClient`] splits its traffic over two connections:
//!
//! - a **reader** going through [`PriorityFallbackService`] over every HTTP(S)
//!   endpoint of the chain, used for `balanceOf` / `allowance` calls
//! - a **writer** bound to the primary endpoint, which fills gas, nonce and
//!   chain ID, signs with the wallet key and waits for the receipt
//!
//! Sending only through the primary endpoint keeps nonce lookups and
//! receipt polling on the same node.

use std::time::Duration;

use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller,
    SimpleNonceManager, WalletFiller,
};
use alloy_provider::{Identity, Provider, ProviderBuilder, RootProvider};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use alloy_transport_http::Http;
use rewardpay::chain::{ChainClient, ChainConfig, ChainId, ContractCall};
use rewardpay::contracts::IERC20;
use rewardpay::error::ChainError;
use url::Url;

use crate::error::EvmError;
use crate::transport::PriorityFallbackService;

/// Filler stack of the writer: gas, blob gas, nonce and chain ID.
pub type WriterFiller = JoinFill<
    GasFiller,
    JoinFill<BlobGasFiller, JoinFill<NonceFiller<SimpleNonceManager>, ChainIdFiller>>,
>;

/// Signing provider used for transactions.
pub type WriterProvider = FillProvider<
    JoinFill<JoinFill<Identity, WriterFiller>, WalletFiller<EthereumWallet>>,
    RootProvider,
>;

/// Confirmation settings shared by every client of a wallet session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    /// Blocks to wait for after inclusion.
    pub confirmations: u64,
    /// How long to wait for a receipt before giving up.
    pub receipt_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            confirmations: 1,
            receipt_timeout: Duration::from_secs(120),
        }
    }
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// [`ChainClient`] for an EVM chain, signing with a local private key.
#[derive(Debug, Clone)]
pub struct Eip155ChainClient {
    chain_id: ChainId,
    owner: Address,
    reader: RootProvider,
    writer: WriterProvider,
    settings: ClientSettings,
}

impl Eip155ChainClient {
    /// Creates a read client over all HTTP(S) `endpoints`, in the given order.
    ///
    /// Non-HTTP URLs are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`EvmError::NoEndpoints`] if no HTTP(S) endpoint remains.
    #[allow(unused_variables)] // chain_id is only logged on success
    pub fn rpc_client(chain_id: ChainId, endpoints: &[Url]) -> Result<RpcClient, EvmError> {
        let transports = endpoints.iter().filter(|url| is_http(url)).map(|url| {
            #[cfg(feature = "telemetry")]
            tracing::debug!(chain = chain_id, rpc_url = %url, "using HTTP transport");
            Http::new(url.clone())
        });
        let service =
            PriorityFallbackService::new(transports).ok_or(EvmError::NoEndpoints(chain_id))?;
        Ok(RpcClient::new(service, false))
    }

    /// Connects to `chain` as `signer`.
    ///
    /// No request is made until the client is used.
    ///
    /// # Errors
    ///
    /// Returns [`EvmError::NoEndpoints`] if the chain lists no HTTP(S) endpoint.
    pub fn new(
        chain: &ChainConfig,
        signer: PrivateKeySigner,
        settings: ClientSettings,
    ) -> Result<Self, EvmError> {
        let chain_id = chain.chain_id;
        let reader = RootProvider::new(Self::rpc_client(chain_id, &chain.rpc_endpoints)?);

        let primary = chain
            .rpc_endpoints
            .iter()
            .find(|url| is_http(url))
            .ok_or(EvmError::NoEndpoints(chain_id))?;
        let filler = JoinFill::new(
            GasFiller,
            JoinFill::new(
                BlobGasFiller::default(),
                JoinFill::new(
                    NonceFiller::new(SimpleNonceManager::default()),
                    ChainIdFiller::new(Some(chain_id)),
                ),
            ),
        );
        let owner = signer.address();
        let writer: WriterProvider = ProviderBuilder::default()
            .filler(filler)
            .wallet(EthereumWallet::from(signer))
            .connect_client(RpcClient::new(Http::new(primary.clone()), false));

        #[cfg(feature = "telemetry")]
        tracing::info!(chain = chain_id, %owner, rpc_url = %primary, "connected EVM client");

        Ok(Self {
            chain_id,
            owner,
            reader,
            writer,
            settings,
        })
    }

    async fn read<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return, EvmError> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(call.abi_encode());
        let data = self.reader.call(tx).await?;
        Ok(C::abi_decode_returns(&data)?)
    }

    /// Sends `call`, waits for its receipt and rejects reverted transactions.
    ///
    /// # Errors
    ///
    /// Returns an [`EvmError`] if submission fails, the receipt does not
    /// arrive in time, or the transaction reverted.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(name = "evm.send", skip_all, fields(chain = self.chain_id, label = call.label, to = %call.to), err)
    )]
    pub async fn send_call(&self, call: ContractCall) -> Result<TxHash, EvmError> {
        let tx = TransactionRequest::default()
            .with_from(self.owner)
            .with_to(call.to)
            .with_input(call.calldata);

        let pending = self.writer.send_transaction(tx).await?;

        #[cfg(feature = "telemetry")]
        tracing::debug!(hash = %pending.tx_hash(), "transaction submitted");

        let receipt = pending
            .with_required_confirmations(self.settings.confirmations)
            .with_timeout(Some(self.settings.receipt_timeout))
            .get_receipt()
            .await?;

        if receipt.status() {
            Ok(receipt.transaction_hash)
        } else {
            Err(EvmError::Reverted {
                label: call.label,
                tx_hash: receipt.transaction_hash,
            })
        }
    }
}

impl ChainClient for Eip155ChainClient {
    fn owner(&self) -> Address {
        self.owner
    }

    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        Ok(self
            .read(token, IERC20::balanceOfCall { account: owner })
            .await?)
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        Ok(self
            .read(token, IERC20::allowanceCall { owner, spender })
            .await?)
    }

    async fn send(&self, call: ContractCall) -> Result<TxHash, ChainError> {
        Ok(self.send_call(call).await?)
    }
}
