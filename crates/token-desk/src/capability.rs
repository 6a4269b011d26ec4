//! Capabilities the session consumes from its host: a node client, a
//! wallet, and a notification surface.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::erc20::ContractCall;
use crate::error::CapabilityError;
use crate::types::address::{Address, TxHash};
use crate::types::log::{LogFilter, RawLog, Receipt};

/// Per-call result of a batched read: raw return data or an error message.
pub type CallOutcome = Result<Vec<u8>, String>;

/// Executes several read-only calls in one round trip (multicall).
///
/// Results must come back in the same order as `calls`.
#[async_trait]
pub trait BatchReader: Send + Sync {
    async fn read_batch(&self, calls: &[ContractCall]) -> Result<Vec<CallOutcome>, CapabilityError>;
}

/// Signs and broadcasts a contract call from the connected account.
#[async_trait]
pub trait TransferWriter: Send + Sync {
    async fn submit(&self, call: ContractCall) -> Result<TxHash, CapabilityError>;
}

/// Resolves once a transaction is mined.
#[async_trait]
pub trait ReceiptWaiter: Send + Sync {
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt, CapabilityError>;
}

/// Live log subscriptions.
///
/// The returned receiver yields matching logs for as long as it is held.
/// Dropping it ends the subscription.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn subscribe(&self, filter: LogFilter) -> Result<mpsc::Receiver<RawLog>, CapabilityError>;
}

/// Connected account and active network, as published by the wallet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalletState {
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Pending,
}

/// Fire-and-forget user notifications (toasts).
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);
}

/// Notifier that only writes to the log.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Error => tracing::warn!(?kind, "{message}"),
            NotificationKind::Success | NotificationKind::Pending => {
                tracing::info!(?kind, "{message}")
            }
        }
    }
}
