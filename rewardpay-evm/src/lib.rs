#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EIP-155 (EVM) chain access for rewardpay.
//!
//! Implements the [`rewardpay::chain`] traits on top of alloy:
//!
//! - [`LocalWalletSession`] - a wallet session signing with a private key held in process
//! - [`Eip155ChainClient`] - ERC-20 reads over prioritized fallback RPC endpoints,
//!   and confirmed contract calls through the primary endpoint
//! - [`PriorityFallbackService`] - the tower service behind the read path
//!
//! RPC and transport failures are mapped onto [`rewardpay::error::FailureKind`]
//! in [`error`], from structured codes first and message text last.
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod error;
pub mod provider;
pub mod transport;
pub mod wallet;

mod networks;
pub use networks::*;

pub use error::EvmError;
pub use provider::{ClientSettings, Eip155ChainClient};
pub use transport::PriorityFallbackService;
pub use wallet::LocalWalletSession;
