//! A [`BridgeExecutor`] talking to a remote bridge-and-execute service over HTTP.
//!
//! A call submits one intent with `POST ./v1/bridge-execute`, then polls
//! `GET ./v1/intents/{id}` at a constant interval until the intent completes,
//! fails, or the poll budget runs out. Steps are reported to the observer as
//! they appear in the poll responses, each exactly once.
//!
//! Once an intent is accepted, throttled or failed status reads only use up
//! the poll budget, and any other read error is reported as
//! [`HttpBridgeError::StatusUnavailable`], which is never retried. Only a
//! rejected submission or a failed intent can lead to a new intent.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use reqwest::header::HeaderValue;
use reqwest::{Client, RequestBuilder, Response};
use rewardpay::bridge::{
    BridgeExecuteOutcome, BridgeExecuteParams, BridgeExecutor, BridgeStepObserver,
};
use rewardpay::error::BridgeError;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::HttpBridgeError;
use crate::types::{ErrorBody, IntentReceipt, IntentState, IntentStatus};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Outcome of a single poll.
#[derive(Debug)]
enum PollError {
    Pending,
    Fatal(HttpBridgeError),
}

/// Client for a remote bridge-and-execute service.
#[derive(Clone, Debug)]
pub struct HttpBridgeClient {
    /// Base URL of the service, with a trailing slash
    base_url: Url,
    /// Full URL to `POST /v1/bridge-execute`
    submit_url: Url,
    /// Shared Reqwest HTTP client
    client: Client,
    /// Optional API key sent with each request
    api_key: Option<HeaderValue>,
    /// Optional per-request timeout
    timeout: Option<Duration>,
    /// Wait between two polls of an intent
    poll_interval: Duration,
    /// Total polls before giving up on an intent
    max_polls: usize,
}

impl HttpBridgeClient {
    /// Default wait between two polls.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

    /// Default number of polls (ten minutes at the default interval).
    pub const DEFAULT_MAX_POLLS: usize = 120;

    /// Returns the computed `./v1/bridge-execute` URL.
    pub const fn submit_url(&self) -> &Url {
        &self.submit_url
    }

    /// Constructs a client from a base URL.
    ///
    /// # Errors
    ///
    /// Returns [`HttpBridgeError::UrlParse`] if URL construction fails.
    pub fn try_new(base_url: Url) -> Result<Self, HttpBridgeError> {
        let submit_url =
            base_url
                .join("./v1/bridge-execute")
                .map_err(|e| HttpBridgeError::UrlParse {
                    context: "Failed to construct ./v1/bridge-execute URL",
                    source: e,
                })?;
        Ok(Self {
            base_url,
            submit_url,
            client: Client::new(),
            api_key: None,
            timeout: None,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            max_polls: Self::DEFAULT_MAX_POLLS,
        })
    }

    /// Sends `api_key` in the [`API_KEY_HEADER`] header of every request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpBridgeError::InvalidApiKey`] if the key is not a valid header value.
    pub fn with_api_key(mut self, api_key: &str) -> Result<Self, HttpBridgeError> {
        let mut value =
            HeaderValue::from_str(api_key).map_err(|_| HttpBridgeError::InvalidApiKey)?;
        value.set_sensitive(true);
        self.api_key = Some(value);
        Ok(self)
    }

    /// Sets a timeout for every request.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the wait between two polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the total number of polls per intent. At least one poll is made.
    #[must_use]
    pub fn with_max_polls(mut self, max_polls: usize) -> Self {
        self.max_polls = max_polls.max(1);
        self
    }

    /// Submits a bridge-and-execute intent.
    ///
    /// # Errors
    ///
    /// Returns [`HttpBridgeError`] if the request fails or is rejected.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(name = "bridge.submit", skip_all, fields(
            source = params.source_chain_id,
            destination = params.destination_chain_id,
            amount = %params.amount,
        ), err)
    )]
    pub async fn submit(
        &self,
        params: &BridgeExecuteParams,
    ) -> Result<IntentReceipt, HttpBridgeError> {
        const CONTEXT: &str = "POST /v1/bridge-execute";
        let response = self
            .prepare(self.client.post(self.submit_url.clone()).json(params))
            .send()
            .await
            .map_err(|e| HttpBridgeError::Http {
                context: CONTEXT,
                source: e,
            })?;
        read_json(response, CONTEXT).await
    }

    /// Fetches the current status of an intent.
    ///
    /// # Errors
    ///
    /// Returns [`HttpBridgeError`] if the request fails or is rejected.
    pub async fn intent_status(&self, intent_id: &str) -> Result<IntentStatus, HttpBridgeError> {
        let url = self.intent_url(intent_id)?;
        self.fetch_status(&url).await
    }

    fn intent_url(&self, intent_id: &str) -> Result<Url, HttpBridgeError> {
        self.base_url
            .join(&format!("./v1/intents/{intent_id}"))
            .map_err(|e| HttpBridgeError::UrlParse {
                context: "Failed to construct ./v1/intents URL",
                source: e,
            })
    }

    async fn fetch_status(&self, url: &Url) -> Result<IntentStatus, HttpBridgeError> {
        const CONTEXT: &str = "GET /v1/intents";
        let response = self
            .prepare(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|e| HttpBridgeError::Http {
                context: CONTEXT,
                source: e,
            })?;
        read_json(response, CONTEXT).await
    }

    fn prepare(&self, mut req: RequestBuilder) -> RequestBuilder {
        if let Some(api_key) = &self.api_key {
            req = req.header(API_KEY_HEADER, api_key.clone());
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        req
    }

    /// Polls an intent until it finishes, reporting each newly completed step.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(name = "bridge.await_intent", skip(self, observer), err)
    )]
    async fn await_intent(
        &self,
        intent_id: &str,
        observer: &dyn BridgeStepObserver,
    ) -> Result<BridgeExecuteOutcome, HttpBridgeError> {
        let url = self.intent_url(intent_id)?;
        let reported = AtomicUsize::new(0);

        let poll = || async {
            let status = match self.fetch_status(&url).await {
                Ok(status) => status,
                Err(e) if e.is_transient() => {
                    #[cfg(feature = "telemetry")]
                    tracing::warn!(intent = intent_id, error = %e, "status read failed, polling again");
                    return Err(PollError::Pending);
                }
                Err(e) => {
                    return Err(PollError::Fatal(HttpBridgeError::StatusUnavailable {
                        intent_id: intent_id.to_owned(),
                        source: Box::new(e),
                    }));
                }
            };

            let seen = reported.load(Ordering::Relaxed);
            for step in status.steps.iter().skip(seen) {
                observer.step_completed(step);
            }
            reported.store(seen.max(status.steps.len()), Ordering::Relaxed);

            match status.status {
                IntentState::Pending => Err(PollError::Pending),
                IntentState::Completed => status.outcome.ok_or_else(|| {
                    PollError::Fatal(HttpBridgeError::MissingOutcome {
                        intent_id: intent_id.to_owned(),
                    })
                }),
                IntentState::Failed => Err(PollError::Fatal(HttpBridgeError::IntentFailed {
                    intent_id: intent_id.to_owned(),
                    body: status.error.unwrap_or_default(),
                })),
            }
        };

        let backoff = ConstantBuilder::default()
            .with_delay(self.poll_interval)
            .with_max_times(self.max_polls.saturating_sub(1));

        poll.retry(backoff)
            .when(|e| matches!(e, PollError::Pending))
            .await
            .map_err(|e| match e {
                PollError::Pending => HttpBridgeError::PollBudgetExhausted {
                    intent_id: intent_id.to_owned(),
                    polls: self.max_polls,
                },
                PollError::Fatal(e) => e,
            })
    }
}

impl BridgeExecutor for HttpBridgeClient {
    async fn bridge_and_execute(
        &self,
        params: &BridgeExecuteParams,
        observer: &dyn BridgeStepObserver,
    ) -> Result<BridgeExecuteOutcome, BridgeError> {
        let receipt = self.submit(params).await?;

        #[cfg(feature = "telemetry")]
        tracing::info!(intent = %receipt.intent_id, steps = receipt.expected_steps.len(), "intent submitted");

        observer.expected_steps(&receipt.expected_steps);
        Ok(self.await_intent(&receipt.intent_id, observer).await?)
    }
}

/// Converts a string URL into an [`HttpBridgeClient`], normalizing the trailing slash.
impl TryFrom<&str> for HttpBridgeClient {
    type Error = HttpBridgeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut normalized = value.trim_end_matches('/').to_owned();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|e| HttpBridgeError::UrlParse {
            context: "Failed to parse base url",
            source: e,
        })?;
        Self::try_new(url)
    }
}

/// Decodes a success body as `R`, or turns any other status into
/// [`HttpBridgeError::HttpStatus`].
async fn read_json<R: DeserializeOwned>(
    response: Response,
    context: &'static str,
) -> Result<R, HttpBridgeError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<R>()
            .await
            .map_err(|e| HttpBridgeError::JsonDeserialization { context, source: e });
    }

    let text = response
        .text()
        .await
        .map_err(|e| HttpBridgeError::Http { context, source: e })?;
    let mut body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    if body.message.is_empty() {
        body.message = text;
    }

    #[cfg(feature = "telemetry")]
    tracing::warn!(%status, code = ?body.code, message = %body.message, "bridge service rejected request");

    Err(HttpBridgeError::HttpStatus {
        context,
        status,
        body,
    })
}
