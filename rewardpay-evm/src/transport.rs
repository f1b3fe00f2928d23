//! Priority-ordered RPC fallback.
//!
//! [`PriorityFallbackService`] sends every request to the first endpoint and
//! only moves down the list when that endpoint fails. An endpoint fails when
//! the transport errors (connection refused, timeout, HTTP status) or when
//! the JSON-RPC response carries a retryable error such as 429 / -32005.
//!
//! If every endpoint fails and at least one of them was throttling, the
//! throttling payload is returned as [`RpcError::ErrorResp`] so callers can
//! classify it as rate limiting. Unlike alloy's `FallbackLayer`, endpoints are
//! never re-ranked by latency.

use std::sync::Arc;
use std::task::{Context, Poll};

use alloy_json_rpc::{ErrorPayload, RequestPacket, ResponsePacket, RpcError};
use alloy_transport::{TransportError, TransportErrorKind, TransportFut};
use serde_json::value::RawValue;
use tower::Service;

/// Returns the first retryable error carried by `response`, if any.
fn throttling_error(response: &ResponsePacket) -> Option<ErrorPayload<Box<RawValue>>> {
    response
        .iter_errors()
        .find(|payload| payload.is_retry_err())
        .cloned()
}

/// Tower service trying a fixed list of transports in priority order.
#[derive(Debug, Clone)]
pub struct PriorityFallbackService<S> {
    transports: Arc<[S]>,
}

impl<S> PriorityFallbackService<S> {
    /// Wraps `transports`, highest priority first.
    ///
    /// Returns `None` when the list is empty.
    pub fn new(transports: impl IntoIterator<Item = S>) -> Option<Self> {
        let transports: Arc<[S]> = transports.into_iter().collect();
        if transports.is_empty() {
            None
        } else {
            Some(Self { transports })
        }
    }
}

impl<S> Service<RequestPacket> for PriorityFallbackService<S>
where
    S: Service<RequestPacket, Response = ResponsePacket, Error = TransportError, Future = TransportFut<'static>>
        + Clone
        + Send
        + Sync
        + 'static,
{
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = TransportFut<'static>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    #[allow(unused_variables)] // index is only logged
    fn call(&mut self, request: RequestPacket) -> Self::Future {
        let transports = Arc::clone(&self.transports);
        Box::pin(async move {
            let mut throttled = None;
            let mut failed = None;

            for (index, transport) in transports.iter().enumerate() {
                match transport.clone().call(request.clone()).await {
                    Ok(response) => match throttling_error(&response) {
                        None => return Ok(response),
                        Some(payload) => {
                            #[cfg(feature = "telemetry")]
                            tracing::debug!(endpoint = index, code = payload.code, "endpoint throttled, falling through");
                            throttled = Some(payload);
                        }
                    },
                    Err(e) => {
                        #[cfg(feature = "telemetry")]
                        tracing::debug!(endpoint = index, error = %e, "endpoint failed, falling through");
                        failed = Some(e);
                    }
                }
            }

            #[cfg(feature = "telemetry")]
            tracing::warn!(endpoints = transports.len(), "all RPC endpoints failed");

            Err(match (throttled, failed) {
                (Some(payload), _) => RpcError::ErrorResp(payload),
                (None, Some(e)) => e,
                (None, None) => TransportErrorKind::custom_str("no RPC endpoint answered"),
            })
        })
    }
}
