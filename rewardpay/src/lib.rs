#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types and orchestration for cross-chain reward payouts.
//!
//! A payout moves a payment token (PYUSD) from a maintainer on a source chain
//! to a contributor on a destination chain. The [`orchestrator`] drives the
//! whole flow as a strictly ordered sequence:
//!
//! 1. **Approval** - the source router is allowed to spend the payment token
//! 2. **Swap** - the router converts the payment token into the bridge token (USDC)
//! 3. **Bridge and execute** - an external cross-chain service moves the bridge
//!    token and calls a destination contract, retried on transient failures
//!
//! Every step reports to a [`progress::ProgressSink`], and each call ends in a
//! single [`types::PaymentResult`].
//!
//! # Modules
//!
//! - [`amount`] - Human-readable token amount parsing
//! - [`approval`] - Token approval step
//! - [`bridge`] - Bridge-and-execute contract and parameter building
//! - [`chain`] - Chain configuration registry and chain access traits
//! - [`contracts`] - Fixed ABI definitions
//! - [`error`] - Failure kinds and error types
//! - [`orchestrator`] - The payment state machine
//! - [`progress`] - Progress events and sinks
//! - [`retry`] - Backoff policy for the bridge step
//! - [`swap`] - Local swap step
//! - [`types`] - Requests and results
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod amount;
pub mod approval;
pub mod bridge;
pub mod chain;
pub mod contracts;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod retry;
pub mod swap;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use orchestrator::{RewardPaymentConfig, RewardPaymentService};
pub use types::{DestinationAction, PaymentRequest, PaymentResult};
