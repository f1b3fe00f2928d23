#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP client for the bridge-and-execute service.
//!
//! [`HttpBridgeClient`] implements [`rewardpay::bridge::BridgeExecutor`]
//! against a remote service exposing two endpoints:
//!
//! - `POST {base}/v1/bridge-execute` submits an intent and returns its id and
//!   the steps the service expects to run
//! - `GET {base}/v1/intents/{id}` reports the intent's status, the steps
//!   completed so far and, once finished, the outcome
//!
//! Service failures are classified into
//! [`FailureKind`](rewardpay::error::FailureKind) here, from the HTTP status
//! and the error `code` in the response body.
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod client;
pub mod error;
pub mod types;

pub use client::HttpBridgeClient;
pub use error::HttpBridgeError;
