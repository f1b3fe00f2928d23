//! Step-by-step progress reporting.
//!
//! The orchestrator emits [`ProgressEvent`]s in order to a single
//! [`ProgressSink`]. Sinks are observers: attaching, replacing or detaching
//! one never changes how a payment runs, and events are not buffered for
//! late subscribers.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use alloy_primitives::TxHash;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Stage of the payment an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStep {
    /// Token approval.
    Approval,
    /// Local swap into the bridge token.
    Swap,
    /// Cross-chain transfer, including retries.
    Bridge,
    /// Destination contract call.
    Execute,
    /// Payment finished successfully.
    Completed,
    /// Payment failed.
    Failed,
}

impl fmt::Display for ProgressStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Approval => "approval",
            Self::Swap => "swap",
            Self::Bridge => "bridge",
            Self::Execute => "execute",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Announcement of an upcoming retry of the bridge step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryNotice {
    /// The attempt that just failed (1-based).
    pub attempt: usize,
    /// Total attempts allowed.
    pub max_attempts: usize,
    /// Wait before the next attempt.
    pub delay: Duration,
}

/// A single progress update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Stage of the payment.
    pub step: ProgressStep,
    /// Human-readable status.
    pub message: String,
    /// Transaction produced by this stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TxHash>,
    /// Explorer link for the transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Error detail, for failures and retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Present when the event announces a retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryNotice>,
}

impl ProgressEvent {
    /// Creates an event with just a step and a message.
    #[must_use]
    pub fn new(step: ProgressStep, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
            transaction_hash: None,
            explorer_url: None,
            error: None,
            retry: None,
        }
    }

    /// Attaches a transaction hash and optional explorer link.
    #[must_use]
    pub fn with_transaction(mut self, hash: TxHash, explorer_url: Option<String>) -> Self {
        self.transaction_hash = Some(hash);
        self.explorer_url = explorer_url;
        self
    }

    /// Attaches an error detail.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Marks the event as a retry announcement.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryNotice) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// Receiver of progress events.
///
/// Called synchronously from the payment task, so implementations should not block.
pub trait ProgressSink: Send + Sync {
    /// Handles one event.
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Sink forwarding events into an unbounded channel.
///
/// Once the receiver is dropped, events are silently discarded.
#[derive(Debug, Clone)]
pub struct ChannelProgress(mpsc::UnboundedSender<ProgressEvent>);

impl ProgressSink for ChannelProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        let _ = self.0.send(event.clone());
    }
}

/// Creates a channel-backed sink and its receiving end.
#[must_use]
pub fn progress_channel() -> (ChannelProgress, mpsc::UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelProgress(tx), rx)
}

/// Holds the currently attached sink and dispatches events to it.
pub struct ProgressReporter {
    sink: RwLock<Arc<dyn ProgressSink>>,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter").finish_non_exhaustive()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self {
            sink: RwLock::new(Arc::new(NoopProgress)),
        }
    }
}

impl ProgressReporter {
    /// Replaces the attached sink.
    pub fn attach(&self, sink: Arc<dyn ProgressSink>) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = sink;
    }

    /// Detaches the current sink; later events are dropped.
    pub fn detach(&self) {
        self.attach(Arc::new(NoopProgress));
    }

    /// Delivers an event to the attached sink.
    pub fn emit(&self, event: ProgressEvent) {
        #[cfg(feature = "telemetry")]
        tracing::info!(
            step = %event.step,
            tx = ?event.transaction_hash,
            error = ?event.error,
            "{}",
            event.message
        );
        let sink = Arc::clone(&self.sink.read().unwrap_or_else(PoisonError::into_inner));
        sink.on_progress(&event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_closure_sink_receives_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let reporter = ProgressReporter::default();
        let captured = Arc::clone(&seen);
        reporter.attach(Arc::new(move |event: &ProgressEvent| {
            captured.lock().unwrap().push(event.step);
        }));
        reporter.emit(ProgressEvent::new(ProgressStep::Approval, "a"));
        reporter.emit(ProgressEvent::new(ProgressStep::Swap, "b"));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ProgressStep::Approval, ProgressStep::Swap]
        );
    }

    #[test]
    fn test_detach_drops_later_events() {
        let seen = Arc::new(Mutex::new(0usize));
        let reporter = ProgressReporter::default();
        let captured = Arc::clone(&seen);
        reporter.attach(Arc::new(move |_: &ProgressEvent| {
            *captured.lock().unwrap() += 1;
        }));
        reporter.emit(ProgressEvent::new(ProgressStep::Swap, "one"));
        reporter.detach();
        reporter.emit(ProgressEvent::new(ProgressStep::Swap, "two"));
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (sink, mut rx) = progress_channel();
        sink.on_progress(&ProgressEvent::new(ProgressStep::Completed, "done"));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.step, ProgressStep::Completed);

        drop(rx);
        // receiver gone: sending must not panic
        sink.on_progress(&ProgressEvent::new(ProgressStep::Failed, "late"));
    }

    #[test]
    fn test_event_serialization() {
        let event = ProgressEvent::new(ProgressStep::Bridge, "retrying")
            .with_error("429")
            .with_retry(RetryNotice {
                attempt: 1,
                max_attempts: 5,
                delay: Duration::from_secs(10),
            });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["step"], "bridge");
        assert_eq!(json["retry"]["maxAttempts"], 5);
        assert!(json.get("transactionHash").is_none());
    }
}
