//! In-memory chain, wallet and bridge doubles for unit tests.
//!
//! All doubles created from one [`Journal`] append to it, so tests can
//! assert the global order of calls across chain and bridge.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, B256, TxHash, U256, address};

use crate::bridge::{
    BridgeExecuteOutcome, BridgeExecuteParams, BridgeExecutor, BridgeStep, BridgeStepObserver,
};
use crate::chain::{ChainClient, ChainConfig, ChainId, ContractCall, WalletSession};
use crate::error::{BridgeError, ChainError};

pub(crate) const OWNER: Address = address!("00000000000000000000000000000000000000f1");

/// Shared, ordered record of calls.
pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Default)]
struct ChainState {
    balance: U256,
    allowance: U256,
    sent: Vec<ContractCall>,
    send_failures: HashMap<&'static str, ChainError>,
    read_failure: Option<ChainError>,
}

#[derive(Debug, Clone)]
pub(crate) struct MockChainClient {
    chain_id: ChainId,
    state: Arc<Mutex<ChainState>>,
    journal: Journal,
}

impl MockChainClient {
    pub(crate) fn new(chain_id: ChainId) -> Self {
        Self::with_journal(chain_id, Journal::default())
    }

    pub(crate) fn with_journal(chain_id: ChainId, journal: Journal) -> Self {
        Self {
            chain_id,
            state: Arc::default(),
            journal,
        }
    }

    pub(crate) fn with_balance(self, balance: U256) -> Self {
        self.state.lock().unwrap().balance = balance;
        self
    }

    pub(crate) fn with_allowance(self, allowance: U256) -> Self {
        self.state.lock().unwrap().allowance = allowance;
        self
    }

    pub(crate) fn fail_send(self, label: &'static str, error: ChainError) -> Self {
        self.state
            .lock()
            .unwrap()
            .send_failures
            .insert(label, error);
        self
    }

    pub(crate) fn fail_reads(self, error: ChainError) -> Self {
        self.state.lock().unwrap().read_failure = Some(error);
        self
    }

    pub(crate) fn sent(&self) -> Vec<ContractCall> {
        self.state.lock().unwrap().sent.clone()
    }

    pub(crate) fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    /// Hash returned for the `index`-th successful send.
    pub(crate) fn hash_of(&self, index: usize) -> TxHash {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&self.chain_id.to_be_bytes());
        bytes[24..].copy_from_slice(&(index as u64 + 1).to_be_bytes());
        B256::from(bytes)
    }

    fn record(&self, entry: impl Into<String>) {
        self.journal.lock().unwrap().push(entry.into());
    }

    fn read_failure(&self) -> Option<ChainError> {
        self.state.lock().unwrap().read_failure.clone()
    }
}

impl ChainClient for MockChainClient {
    fn owner(&self) -> Address {
        OWNER
    }

    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn balance_of(&self, _token: Address, _owner: Address) -> Result<U256, ChainError> {
        self.record("balance_of");
        match self.read_failure() {
            Some(e) => Err(e),
            None => Ok(self.state.lock().unwrap().balance),
        }
    }

    async fn allowance(
        &self,
        _token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, ChainError> {
        self.record("allowance");
        match self.read_failure() {
            Some(e) => Err(e),
            None => Ok(self.state.lock().unwrap().allowance),
        }
    }

    async fn send(&self, call: ContractCall) -> Result<TxHash, ChainError> {
        self.record(format!("send:{}", call.label));
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.send_failures.get(call.label) {
            return Err(e.clone());
        }
        state.sent.push(call);
        Ok(self.hash_of(state.sent.len() - 1))
    }
}

#[derive(Debug)]
pub(crate) struct MockWallet {
    account: Option<Address>,
    active: Mutex<ChainId>,
    client: MockChainClient,
    connect_failure: Option<ChainError>,
    journal: Journal,
}

impl MockWallet {
    /// A connected wallet whose clients share state with `client`.
    pub(crate) fn new(active: ChainId, client: MockChainClient) -> Self {
        let journal = client.journal.clone();
        Self {
            account: Some(OWNER),
            active: Mutex::new(active),
            client,
            connect_failure: None,
            journal,
        }
    }

    pub(crate) fn disconnected(mut self) -> Self {
        self.account = None;
        self
    }

    pub(crate) fn fail_connect(mut self, error: ChainError) -> Self {
        self.connect_failure = Some(error);
        self
    }

    pub(crate) fn active(&self) -> ChainId {
        *self.active.lock().unwrap()
    }
}

impl WalletSession for MockWallet {
    type Client = MockChainClient;

    fn account(&self) -> Option<Address> {
        self.account
    }

    async fn active_chain(&self) -> Result<Option<ChainId>, ChainError> {
        Ok(Some(self.active()))
    }

    async fn switch_chain(&self, chain: &ChainConfig) -> Result<(), ChainError> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("switch_chain:{}", chain.chain_id));
        *self.active.lock().unwrap() = chain.chain_id;
        Ok(())
    }

    async fn connect(&self, chain: &ChainConfig) -> Result<MockChainClient, ChainError> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("connect:{}", chain.chain_id));
        if let Some(e) = &self.connect_failure {
            return Err(e.clone());
        }
        Ok(MockChainClient {
            chain_id: chain.chain_id,
            state: Arc::clone(&self.client.state),
            journal: self.journal.clone(),
        })
    }
}

#[derive(Debug)]
pub(crate) struct MockBridge {
    script: Mutex<VecDeque<Result<BridgeExecuteOutcome, BridgeError>>>,
    steps: Vec<BridgeStep>,
    calls: Mutex<Vec<BridgeExecuteParams>>,
    journal: Journal,
}

impl MockBridge {
    pub(crate) fn new(journal: Journal) -> Self {
        Self {
            script: Mutex::default(),
            steps: Vec::new(),
            calls: Mutex::default(),
            journal,
        }
    }

    /// Queues the result of the next call. Unscripted calls succeed.
    pub(crate) fn then(self, result: Result<BridgeExecuteOutcome, BridgeError>) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    /// Steps reported through the observer on every call.
    pub(crate) fn with_steps(mut self, names: &[&str]) -> Self {
        self.steps = names
            .iter()
            .map(|name| BridgeStep {
                name: (*name).to_owned(),
                transaction_hash: None,
                explorer_url: None,
            })
            .collect();
        self
    }

    pub(crate) fn calls(&self) -> Vec<BridgeExecuteParams> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn success() -> BridgeExecuteOutcome {
        BridgeExecuteOutcome {
            success: true,
            execute_transaction_hash: Some(B256::repeat_byte(0xee)),
            execute_explorer_url: Some("https://dest.example/tx/ee".to_owned()),
            bridge_transaction_hash: Some(B256::repeat_byte(0xbb)),
            bridge_explorer_url: Some("https://bridge.example/intent/1".to_owned()),
            bridge_skipped: false,
        }
    }
}

impl BridgeExecutor for MockBridge {
    async fn bridge_and_execute(
        &self,
        params: &BridgeExecuteParams,
        observer: &dyn BridgeStepObserver,
    ) -> Result<BridgeExecuteOutcome, BridgeError> {
        self.journal.lock().unwrap().push("bridge".to_owned());
        self.calls.lock().unwrap().push(params.clone());
        let next = self.script.lock().unwrap().pop_front();
        let result = next.unwrap_or_else(|| Ok(Self::success()));
        if result.is_ok() {
            observer.expected_steps(&self.steps);
            for step in &self.steps {
                observer.step_completed(step);
            }
        }
        result
    }
}
