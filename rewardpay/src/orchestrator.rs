//! The payment state machine.
//!
//! [`RewardPaymentService::pay_cross_chain`] runs one payout as a strictly
//! forward sequence:
//!
//! ```text
//! init ──► approval ──► swap ──► bridge/execute (retried) ──► completed
//!   │          │          │              │
//!   └──────────┴──────────┴──────────────┴──► failed
//! ```
//!
//! Init failures are returned as [`PreconditionError`] before anything is
//! sent. Once a transaction may have been broadcast, every failure becomes a
//! [`PaymentResult`] with `success == false` that keeps the hashes collected
//! so far. Nothing is rolled back.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use tokio::sync::Mutex;

use crate::amount::{AmountError, format_token_amount, parse_token_amount, rescale};
use crate::approval::ensure_approval;
use crate::bridge::{
    BridgeExecuteOutcome, BridgeExecuteParams, BridgeExecutor, BridgeStep, BridgeStepObserver,
    ExecuteCall,
};
use crate::chain::{ChainConfig, ChainRegistry, WalletSession};
use crate::error::{PaymentFailure, PreconditionError};
use crate::progress::{ProgressEvent, ProgressReporter, ProgressSink, ProgressStep};
use crate::retry::{RetryPolicy, retry_bridge};
use crate::swap::swap_for_bridge;
use crate::types::{PaymentProgress, PaymentRequest, PaymentResult};

/// Tunables of the payment flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardPaymentConfig {
    /// Backoff for the bridge step.
    pub retry: RetryPolicy,
    /// Pause after the swap confirms, before bridging.
    pub swap_settle_delay: Duration,
    /// Symbol of the bridge token passed to the bridge service.
    pub bridge_token_symbol: String,
}

impl Default for RewardPaymentConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            swap_settle_delay: Duration::from_secs(5),
            bridge_token_symbol: "USDC".to_owned(),
        }
    }
}

/// Validated state of one payment, threaded through every step.
struct PaymentContext<'a, C> {
    client: C,
    source: &'a ChainConfig,
    destination: &'a ChainConfig,
    sender: Address,
    amount: U256,
    bridge_amount: U256,
}

/// Orchestrates cross-chain reward payouts for one wallet session.
///
/// At most one payment runs at a time per instance; a concurrent call is
/// rejected with [`PreconditionError::PaymentInProgress`].
pub struct RewardPaymentService<W, B> {
    wallet: W,
    bridge: B,
    chains: ChainRegistry,
    config: RewardPaymentConfig,
    progress: ProgressReporter,
    in_flight: Mutex<()>,
}

impl<W, B> std::fmt::Debug for RewardPaymentService<W, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewardPaymentService")
            .field("chains", &self.chains)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<W, B> RewardPaymentService<W, B>
where
    W: WalletSession,
    B: BridgeExecutor,
{
    /// Creates a service with the default [`RewardPaymentConfig`].
    pub fn new(wallet: W, bridge: B, chains: ChainRegistry) -> Self {
        Self {
            wallet,
            bridge,
            chains,
            config: RewardPaymentConfig::default(),
            progress: ProgressReporter::default(),
            in_flight: Mutex::new(()),
        }
    }

    /// Replaces the flow tunables.
    #[must_use]
    pub fn with_config(mut self, config: RewardPaymentConfig) -> Self {
        self.config = config;
        self
    }

    /// Chains this service can pay from and to.
    pub const fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    /// Attaches a progress sink, replacing any previous one.
    pub fn set_progress_sink(&self, sink: impl ProgressSink + 'static) {
        self.progress.attach(Arc::new(sink));
    }

    /// Detaches the progress sink. A running payment continues unaffected.
    pub fn clear_progress_sink(&self) {
        self.progress.detach();
    }

    /// Pays `request.amount` of the payment token to `request.recipient_address`
    /// on the destination chain.
    ///
    /// # Errors
    ///
    /// Returns [`PreconditionError`] if the request is rejected before any
    /// transaction is sent. Failures after that point are reported in the
    /// returned [`PaymentResult`].
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(
            name = "pay_cross_chain",
            skip_all,
            fields(
                source = request.source_chain_id,
                destination = request.destination_chain_id,
                recipient = %request.recipient_address,
                amount = %request.amount,
            )
        )
    )]
    pub async fn pay_cross_chain(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentResult, PreconditionError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            #[cfg(feature = "telemetry")]
            tracing::warn!("rejected: another payment is in progress");
            return Err(PreconditionError::PaymentInProgress);
        };

        let ctx = match self.prepare(&request).await {
            Ok(ctx) => ctx,
            Err(e) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %e, "payment rejected");
                self.progress.emit(
                    ProgressEvent::new(ProgressStep::Failed, "Payment could not be started")
                        .with_error(e.to_string()),
                );
                return Err(e);
            }
        };

        Ok(self.execute(&request, ctx).await)
    }

    /// Init state: validates the request and connects to the source chain.
    async fn prepare<'a>(
        &'a self,
        request: &PaymentRequest,
    ) -> Result<PaymentContext<'a, W::Client>, PreconditionError> {
        let sender = self
            .wallet
            .account()
            .ok_or(PreconditionError::MissingSigner)?;

        if request.source_chain_id == request.destination_chain_id {
            return Err(PreconditionError::SameChain(request.source_chain_id));
        }
        let source = self.chains.get_config(request.source_chain_id)?;
        let destination = self.chains.get_config(request.destination_chain_id)?;

        let amount = parse_token_amount(&request.amount, source.source_token_decimals)?;
        let bridge_amount = rescale(
            amount,
            source.source_token_decimals,
            source.bridge_token_decimals,
        )
        .ok_or_else(|| AmountError::Overflow(request.amount.clone()))?;
        if bridge_amount.is_zero() {
            return Err(AmountError::NotPositive(request.amount.clone()).into());
        }

        let active = self
            .wallet
            .active_chain()
            .await
            .map_err(PreconditionError::Wallet)?;
        if active != Some(source.chain_id) {
            #[cfg(feature = "telemetry")]
            tracing::info!(from = ?active, to = source.chain_id, "switching wallet chain");
            self.wallet
                .switch_chain(source)
                .await
                .map_err(PreconditionError::Wallet)?;
        }
        let client = self
            .wallet
            .connect(source)
            .await
            .map_err(PreconditionError::Wallet)?;

        Ok(PaymentContext {
            client,
            source,
            destination,
            sender,
            amount,
            bridge_amount,
        })
    }

    async fn execute(
        &self,
        request: &PaymentRequest,
        ctx: PaymentContext<'_, W::Client>,
    ) -> PaymentResult {
        let PaymentContext {
            client,
            source,
            destination,
            sender,
            amount,
            bridge_amount,
        } = ctx;
        let mut progress = PaymentProgress::default();
        let display_amount = format_token_amount(amount, source.source_token_decimals);

        match ensure_approval(
            &client,
            source.source_token_address,
            source.router_address,
            amount,
        )
        .await
        {
            Ok(Some(hash)) => {
                progress.approval_tx_hash = Some(hash);
                self.progress.emit(
                    ProgressEvent::new(ProgressStep::Approval, "Token approval confirmed")
                        .with_transaction(hash, source.tx_url(&hash)),
                );
            }
            Ok(None) => self.progress.emit(ProgressEvent::new(
                ProgressStep::Approval,
                "Existing allowance covers this payment",
            )),
            Err(e) => return self.fail(progress, PaymentFailure::Approval(e)),
        }

        self.progress.emit(ProgressEvent::new(
            ProgressStep::Swap,
            format!(
                "Swapping {display_amount} for {} on {}",
                self.config.bridge_token_symbol, source.display_name
            ),
        ));
        match swap_for_bridge(
            &client,
            source.router_address,
            amount,
            self.config.swap_settle_delay,
        )
        .await
        {
            Ok(hash) => {
                progress.swap_tx_hash = Some(hash);
                self.progress.emit(
                    ProgressEvent::new(ProgressStep::Swap, "Swap confirmed")
                        .with_transaction(hash, source.tx_url(&hash)),
                );
            }
            Err(e) => return self.fail(progress, PaymentFailure::Swap(e)),
        }

        let params = BridgeExecuteParams {
            token: source.bridge_token_address,
            token_symbol: self.config.bridge_token_symbol.clone(),
            amount: bridge_amount,
            source_chain_id: source.chain_id,
            destination_chain_id: destination.chain_id,
            sender,
            execute: ExecuteCall::for_action(
                &request.action,
                destination,
                request.recipient_address,
                bridge_amount,
            ),
        };
        self.progress.emit(ProgressEvent::new(
            ProgressStep::Bridge,
            format!(
                "Bridging {} {} to {}",
                format_token_amount(bridge_amount, source.bridge_token_decimals),
                params.token_symbol,
                destination.display_name
            ),
        ));

        let observer = ForwardSteps(&self.progress);
        let outcome = retry_bridge(
            &self.config.retry,
            || self.bridge.bridge_and_execute(&params, &observer),
            |notice, e| {
                self.progress.emit(
                    ProgressEvent::new(
                        ProgressStep::Bridge,
                        format!(
                            "Bridge attempt {}/{} failed, retrying in {}s",
                            notice.attempt,
                            notice.max_attempts,
                            notice.delay.as_secs()
                        ),
                    )
                    .with_error(e.to_string())
                    .with_retry(notice),
                );
            },
        )
        .await;

        match outcome {
            Ok(outcome) => self.complete(progress, outcome),
            Err(failure) => self.fail(progress, failure),
        }
    }

    fn complete(&self, progress: PaymentProgress, outcome: BridgeExecuteOutcome) -> PaymentResult {
        if let Some(hash) = outcome.execute_transaction_hash {
            self.progress.emit(
                ProgressEvent::new(ProgressStep::Execute, "Destination call executed")
                    .with_transaction(hash, outcome.execute_explorer_url.clone()),
            );
        }

        let (message, error) = if outcome.success {
            ("Payment completed".to_owned(), None)
        } else {
            (
                "Destination call did not succeed".to_owned(),
                Some("bridge service reported an unsuccessful execution".to_owned()),
            )
        };

        let mut event = ProgressEvent::new(
            if outcome.success {
                ProgressStep::Completed
            } else {
                ProgressStep::Failed
            },
            message.clone(),
        );
        if let Some(error) = &error {
            event = event.with_error(error.clone());
        }
        self.progress.emit(event);

        PaymentResult {
            success: outcome.success,
            approval_tx_hash: progress.approval_tx_hash,
            swap_tx_hash: progress.swap_tx_hash,
            execute_tx_hash: outcome.execute_transaction_hash,
            execute_explorer_url: outcome.execute_explorer_url,
            bridge_tx_hash: outcome.bridge_transaction_hash,
            bridge_explorer_url: outcome.bridge_explorer_url,
            bridge_skipped: Some(outcome.bridge_skipped),
            error,
            message,
        }
    }

    fn fail(&self, progress: PaymentProgress, failure: PaymentFailure) -> PaymentResult {
        #[cfg(feature = "telemetry")]
        tracing::error!(error = %failure, "payment failed");
        let result = PaymentResult::failed(progress, &failure);
        self.progress.emit(
            ProgressEvent::new(ProgressStep::Failed, result.message.clone())
                .with_error(failure.to_string()),
        );
        result
    }
}

/// Forwards the bridge service's own steps as `bridge` progress events.
struct ForwardSteps<'a>(&'a ProgressReporter);

impl BridgeStepObserver for ForwardSteps<'_> {
    fn expected_steps(&self, steps: &[BridgeStep]) {
        let names: Vec<&str> = steps.iter().map(|s| s.name.as_str()).collect();
        self.0.emit(ProgressEvent::new(
            ProgressStep::Bridge,
            format!("Bridge will run {} steps: {}", steps.len(), names.join(", ")),
        ));
    }

    fn step_completed(&self, step: &BridgeStep) {
        let mut event = ProgressEvent::new(ProgressStep::Bridge, format!("{} completed", step.name));
        if let Some(hash) = step.transaction_hash {
            event = event.with_transaction(hash, step.explorer_url.clone());
        }
        self.0.emit(event);
    }
}
