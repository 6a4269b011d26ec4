//! In-memory capability fakes for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use num_bigint::BigUint;
use tokio::sync::mpsc;

use crate::abi::tests::{encode_string, encode_uint};
use crate::capability::{
    BatchReader, CallOutcome, EventSource, NotificationKind, Notifier, ReceiptWaiter, TransferWriter,
};
use crate::erc20::{transfer_topic, ContractCall};
use crate::error::CapabilityError;
use crate::types::address::{Address, TxHash};
use crate::types::log::{LogFilter, RawLog, Receipt};

/// Results for `{totalSupply: 1000000, decimals: 18, name: "Demo", symbol: "DMO"}`.
pub(crate) fn demo_token_results(balance: Option<BigUint>) -> Vec<CallOutcome> {
    let mut decimals = vec![0u8; 32];
    decimals[31] = 18;
    let mut results = vec![
        Ok(encode_uint(&BigUint::from(1_000_000u64))),
        Ok(decimals),
        Ok(encode_string("Demo")),
        Ok(encode_string("DMO")),
    ];
    if let Some(balance) = balance {
        results.push(Ok(encode_uint(&balance)));
    }
    results
}

/// A raw `Transfer` log emitted by `token`.
pub(crate) fn transfer_log(token: Address, from: Address, to: Address, value: BigUint, tx: u8) -> RawLog {
    let word = |addr: Address| {
        let mut w = [0u8; 32];
        w[12..].copy_from_slice(addr.as_bytes());
        w
    };
    RawLog {
        address: token,
        topics: vec![transfer_topic(), word(from), word(to)],
        data: encode_uint(&value),
        transaction_hash: TxHash([tx; 32]),
        block_number: Some(100 + tx as u64),
    }
}

enum BatchResponse {
    Results(Vec<CallOutcome>),
    Fail(CapabilityError),
}

#[derive(Default)]
pub(crate) struct FakeBatchReader {
    responses: Mutex<HashMap<Address, BatchResponse>>,
    requests: Mutex<Vec<Vec<ContractCall>>>,
}

impl FakeBatchReader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer reads against `token` with `results`, truncated to the number
    /// of calls in the request.
    pub(crate) fn respond(&self, token: Address, results: Vec<CallOutcome>) {
        self.responses
            .lock()
            .unwrap()
            .insert(token, BatchResponse::Results(results));
    }

    pub(crate) fn fail(&self, token: Address, error: CapabilityError) {
        self.responses
            .lock()
            .unwrap()
            .insert(token, BatchResponse::Fail(error));
    }

    pub(crate) fn requests(&self) -> Vec<Vec<ContractCall>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchReader for FakeBatchReader {
    async fn read_batch(&self, calls: &[ContractCall]) -> Result<Vec<CallOutcome>, CapabilityError> {
        self.requests.lock().unwrap().push(calls.to_vec());
        let target = calls.first().map(|c| c.target);
        let responses = self.responses.lock().unwrap();
        match target.and_then(|t| responses.get(&t)) {
            Some(BatchResponse::Results(results)) => {
                Ok(results.iter().take(calls.len()).cloned().collect())
            }
            Some(BatchResponse::Fail(e)) => Err(e.clone()),
            None => Err(CapabilityError::new("no contract at address")),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeWriter {
    responses: Mutex<VecDeque<Result<TxHash, CapabilityError>>>,
    submitted: Mutex<Vec<ContractCall>>,
    hanging: AtomicBool,
}

impl FakeWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn accept(&self, hash: TxHash) {
        self.responses.lock().unwrap().push_back(Ok(hash));
    }

    pub(crate) fn reject(&self, reason: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(CapabilityError::new(reason)));
    }

    /// While set, `submit` never resolves, like a wallet prompt left open.
    pub(crate) fn hang(&self, hanging: bool) {
        self.hanging.store(hanging, Ordering::SeqCst);
    }

    pub(crate) fn submitted(&self) -> Vec<ContractCall> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferWriter for FakeWriter {
    async fn submit(&self, call: ContractCall) -> Result<TxHash, CapabilityError> {
        self.submitted.lock().unwrap().push(call);
        if self.hanging.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CapabilityError::new("User rejected the request.")))
    }
}

#[derive(Clone)]
pub(crate) enum ReceiptBehavior {
    Mined { success: bool },
    Fail(String),
    Never,
}

#[derive(Default)]
pub(crate) struct FakeReceipts {
    behaviors: Mutex<HashMap<TxHash, ReceiptBehavior>>,
}

impl FakeReceipts {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, hash: TxHash, behavior: ReceiptBehavior) {
        self.behaviors.lock().unwrap().insert(hash, behavior);
    }
}

#[async_trait]
impl ReceiptWaiter for FakeReceipts {
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt, CapabilityError> {
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&hash)
            .cloned()
            .unwrap_or(ReceiptBehavior::Never);
        match behavior {
            ReceiptBehavior::Mined { success } => Ok(Receipt {
                transaction_hash: hash,
                block_number: 1,
                success,
            }),
            ReceiptBehavior::Fail(reason) => Err(CapabilityError::new(reason)),
            ReceiptBehavior::Never => std::future::pending().await,
        }
    }
}

/// Event source that delivers every emitted log to every live
/// subscription, leaving filtering to the subscriber.
#[derive(Default)]
pub(crate) struct FakeEventSource {
    subscribers: Mutex<Vec<(LogFilter, mpsc::Sender<RawLog>)>>,
}

impl FakeEventSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn emit(&self, log: RawLog) {
        for (_, tx) in self.subscribers.lock().unwrap().iter() {
            if !tx.is_closed() {
                let _ = tx.try_send(log.clone());
            }
        }
    }

    /// Subscriptions whose receiving end is still held.
    pub(crate) fn active(&self) -> Vec<LogFilter> {
        self.subscribers
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, tx)| !tx.is_closed())
            .map(|(filter, _)| filter.clone())
            .collect()
    }

    /// Drop every sender, as a node client does when its connection dies.
    pub(crate) fn close_all(&self) {
        self.subscribers.lock().unwrap().clear();
    }

    pub(crate) fn total_subscriptions(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

#[async_trait]
impl EventSource for FakeEventSource {
    async fn subscribe(&self, filter: LogFilter) -> Result<mpsc::Receiver<RawLog>, CapabilityError> {
        let (tx, rx) = mpsc::channel(64);
        self.subscribers.lock().unwrap().push((filter, tx));
        Ok(rx)
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    seen: Mutex<Vec<(NotificationKind, String)>>,
}

impl RecordingNotifier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn seen(&self) -> Vec<(NotificationKind, String)> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn last(&self) -> Option<(NotificationKind, String)> {
        self.seen.lock().unwrap().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        self.seen.lock().unwrap().push((kind, message.to_string()));
    }
}
