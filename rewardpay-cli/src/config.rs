//! Command-line configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in the raw text. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! private_key = "$REWARDPAY_PRIVATE_KEY"
//! swap_settle_delay_secs = 5
//!
//! [bridge]
//! url = "https://bridge.example/api"
//! api_key = "${BRIDGE_API_KEY}"
//!
//! [retry]
//! base_delay_secs = 10
//! max_attempts = 5
//!
//! # Known chain: only the router is required.
//! [chains."11155111"]
//! router_address = "0x..."
//!
//! # Unknown chain: every address and at least one endpoint.
//! [chains."84532"]
//! display_name = "Base Sepolia"
//! rpc_endpoints = ["https://sepolia.base.org"]
//! router_address = "0x..."
//! source_token_address = "0x..."
//! bridge_token_address = "0x..."
//! ```
//!
//! # Environment Variables
//!
//! - `REWARDPAY_PRIVATE_KEY` - Overrides `private_key`
//! - `REWARDPAY_BRIDGE_URL` - Overrides `bridge.url`
//! - `REWARDPAY_BRIDGE_API_KEY` - Overrides `bridge.api_key`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_primitives::Address;
use rewardpay::RewardPaymentConfig;
use rewardpay::chain::{ChainConfig, ChainId, ChainRegistry, DEFAULT_TOKEN_DECIMALS};
use rewardpay::retry::RetryPolicy;
use rewardpay_evm::{ClientSettings, known_network};
use serde::Deserialize;
use url::Url;

/// Errors raised while loading or resolving the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or does not match the schema.
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    /// A `[chains]` key is not a chain ID.
    #[error("chain key {0:?} is not a numeric chain ID")]
    InvalidChainKey(String),
    /// Two chain keys name the same chain.
    #[error("chain {0} is configured more than once")]
    DuplicateChain(ChainId),
    /// A chain entry misses a field it cannot default.
    #[error("chain {chain_id} is missing {field}")]
    MissingChainField {
        /// The chain.
        chain_id: ChainId,
        /// Name of the missing field.
        field: &'static str,
    },
    /// A built-in endpoint or explorer URL did not parse.
    #[error("built-in URL for chain {chain_id} is invalid: {source}")]
    KnownNetworkUrl {
        /// The chain.
        chain_id: ChainId,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// No private key was configured.
    #[error("private key is not configured (set private_key or REWARDPAY_PRIVATE_KEY)")]
    MissingPrivateKey,
    /// No bridge service URL was configured.
    #[error("bridge URL is not configured (set bridge.url or REWARDPAY_BRIDGE_URL)")]
    MissingBridgeUrl,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CliConfig {
    /// Hex private key of the paying wallet.
    #[serde(default)]
    pub private_key: Option<String>,

    /// Bridge service client settings.
    #[serde(default)]
    pub bridge: BridgeSection,

    /// Backoff of the bridge step.
    #[serde(default)]
    pub retry: RetrySection,

    /// Pause after the swap confirms (default: `5`).
    #[serde(default = "default_swap_settle_delay_secs")]
    pub swap_settle_delay_secs: u64,

    /// Receipt wait timeout (default: `120`).
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,

    /// Confirmations to wait for (default: `1`).
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,

    /// Symbol of the bridge token (default: `USDC`).
    #[serde(default = "default_bridge_token_symbol")]
    pub bridge_token_symbol: String,

    /// Chain entries keyed by decimal chain ID.
    #[serde(default)]
    pub chains: BTreeMap<String, ChainEntry>,
}

/// `[bridge]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BridgeSection {
    /// Base URL of the bridge service.
    #[serde(default)]
    pub url: Option<String>,
    /// Optional API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout (default: `30`).
    #[serde(default = "default_bridge_timeout_secs")]
    pub timeout_secs: u64,
    /// Wait between intent polls (default: `5`).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Polls per intent (default: `120`).
    #[serde(default = "default_max_polls")]
    pub max_polls: usize,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: default_bridge_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            max_polls: default_max_polls(),
        }
    }
}

/// `[retry]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetrySection {
    /// Delay before the first retry (default: `10`).
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
    /// Total attempts of the bridge step (default: `5`).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            base_delay_secs: default_base_delay_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// One `[chains."<id>"]` entry.
///
/// For a known network every field overrides the built-in value and only
/// `router_address` is required. For any other chain every field without
/// a default must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChainEntry {
    /// Name shown to users.
    pub display_name: Option<String>,
    /// RPC endpoints, highest priority first.
    pub rpc_endpoints: Option<Vec<Url>>,
    /// Reward router.
    pub router_address: Option<Address>,
    /// Payment token.
    pub source_token_address: Option<Address>,
    /// Bridge token.
    pub bridge_token_address: Option<Address>,
    /// Payment token decimals (default: `6`).
    pub source_token_decimals: Option<u8>,
    /// Bridge token decimals (default: `6`).
    pub bridge_token_decimals: Option<u8>,
    /// Block explorer base URL.
    pub explorer_url: Option<Url>,
}

const fn default_swap_settle_delay_secs() -> u64 {
    5
}

const fn default_receipt_timeout_secs() -> u64 {
    120
}

const fn default_confirmations() -> u64 {
    1
}

fn default_bridge_token_symbol() -> String {
    "USDC".to_owned()
}

const fn default_bridge_timeout_secs() -> u64 {
    30
}

const fn default_poll_interval_secs() -> u64 {
    5
}

const fn default_max_polls() -> usize {
    120
}

const fn default_base_delay_secs() -> u64 {
    10
}

const fn default_max_attempts() -> usize {
    5
}

impl ChainEntry {
    fn resolve(&self, chain_id: ChainId) -> Result<ChainConfig, ConfigError> {
        let missing = |field| ConfigError::MissingChainField { chain_id, field };
        let router = self.router_address.ok_or_else(|| missing("router_address"))?;

        let mut config = match known_network(chain_id) {
            Some(network) => network
                .chain_config(router)
                .map_err(|source| ConfigError::KnownNetworkUrl { chain_id, source })?,
            None => ChainConfig {
                chain_id,
                display_name: self
                    .display_name
                    .clone()
                    .ok_or_else(|| missing("display_name"))?,
                rpc_endpoints: self
                    .rpc_endpoints
                    .clone()
                    .filter(|endpoints| !endpoints.is_empty())
                    .ok_or_else(|| missing("rpc_endpoints"))?,
                router_address: router,
                source_token_address: self
                    .source_token_address
                    .ok_or_else(|| missing("source_token_address"))?,
                bridge_token_address: self
                    .bridge_token_address
                    .ok_or_else(|| missing("bridge_token_address"))?,
                source_token_decimals: DEFAULT_TOKEN_DECIMALS,
                bridge_token_decimals: DEFAULT_TOKEN_DECIMALS,
                explorer_url: None,
            },
        };

        if let Some(name) = &self.display_name {
            config.display_name.clone_from(name);
        }
        if let Some(endpoints) = self.rpc_endpoints.as_ref().filter(|e| !e.is_empty()) {
            config.rpc_endpoints.clone_from(endpoints);
        }
        if let Some(token) = self.source_token_address {
            config.source_token_address = token;
        }
        if let Some(token) = self.bridge_token_address {
            config.bridge_token_address = token;
        }
        if let Some(decimals) = self.source_token_decimals {
            config.source_token_decimals = decimals;
        }
        if let Some(decimals) = self.bridge_token_decimals {
            config.bridge_token_decimals = decimals;
        }
        if self.explorer_url.is_some() {
            config.explorer_url.clone_from(&self.explorer_url);
        }
        Ok(config)
    }
}

impl CliConfig {
    /// Loads configuration from `path`, expanding `$VAR` / `${VAR}` from the
    /// process environment and applying the `REWARDPAY_*` overrides.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_owned(),
                source,
            })?
        } else {
            String::new()
        };
        Self::parse(&content, |name| std::env::var(name).ok())
    }

    /// Parses `content` with variables resolved through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the expanded text is not a valid configuration.
    pub fn parse(
        content: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content, &lookup);
        let mut config: Self = toml::from_str(&expanded)?;

        if let Some(key) = lookup("REWARDPAY_PRIVATE_KEY") {
            config.private_key = Some(key);
        }
        if let Some(url) = lookup("REWARDPAY_BRIDGE_URL") {
            config.bridge.url = Some(url);
        }
        if let Some(api_key) = lookup("REWARDPAY_BRIDGE_API_KEY") {
            config.bridge.api_key = Some(api_key);
        }
        Ok(config)
    }

    /// Builds the chain registry from the `[chains]` entries.
    ///
    /// # Errors
    ///
    /// Returns an error if a key is not a chain ID or an entry is incomplete.
    pub fn chain_registry(&self) -> Result<ChainRegistry, ConfigError> {
        let mut registry = ChainRegistry::default();
        for (key, entry) in &self.chains {
            let chain_id = key
                .trim()
                .parse::<ChainId>()
                .map_err(|_| ConfigError::InvalidChainKey(key.clone()))?;
            if registry.insert(entry.resolve(chain_id)?).is_some() {
                return Err(ConfigError::DuplicateChain(chain_id));
            }
        }
        Ok(registry)
    }

    /// The private key, unless missing or left unexpanded.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingPrivateKey`] if no usable key is set.
    pub fn private_key(&self) -> Result<&str, ConfigError> {
        self.private_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !key.starts_with('$'))
            .ok_or(ConfigError::MissingPrivateKey)
    }

    /// The bridge service base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingBridgeUrl`] if it is not set.
    pub fn bridge_url(&self) -> Result<&str, ConfigError> {
        self.bridge
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingBridgeUrl)
    }

    /// The bridge API key, unless missing or left unexpanded.
    #[must_use]
    pub fn bridge_api_key(&self) -> Option<&str> {
        self.bridge
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty() && !key.starts_with('$'))
    }

    /// Tunables of the payment flow.
    #[must_use]
    pub fn payment_config(&self) -> RewardPaymentConfig {
        RewardPaymentConfig {
            retry: RetryPolicy {
                base_delay: Duration::from_secs(self.retry.base_delay_secs),
                max_attempts: self.retry.max_attempts.max(1),
            },
            swap_settle_delay: Duration::from_secs(self.swap_settle_delay_secs),
            bridge_token_symbol: self.bridge_token_symbol.clone(),
        }
    }

    /// Settings of every chain client.
    #[must_use]
    pub const fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            confirmations: self.confirmations,
            receipt_timeout: Duration::from_secs(self.receipt_timeout_secs),
        }
    }
}

/// Expands `$VAR` and `${VAR}` patterns through `lookup`.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.next_if_eq(&'{').is_some();
        let mut name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        let complete = !name.is_empty() && (closed || !braced);
        match lookup(&name).filter(|_| complete) {
            Some(value) => result.push_str(&value),
            None => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}
