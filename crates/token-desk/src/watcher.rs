use std::sync::Arc;

use num_bigint::BigUint;
use time::OffsetDateTime;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::abi;
use crate::amount::from_base_units;
use crate::capability::EventSource;
use crate::erc20::transfer_topic;
use crate::error::{DecodeError, SubscribeError};
use crate::history::{Direction, EntryStatus, TransactionLogEntry};
use crate::types::address::Address;
use crate::types::log::{LogFilter, RawLog};

/// Precision assumed for event amounts before metadata has loaded.
pub const FALLBACK_DECIMALS: u8 = 18;

/// A live `Transfer` subscription for one contract.
///
/// Dropping it releases the underlying channel, which ends delivery.
#[derive(Debug)]
pub struct Subscription {
    contract: Address,
    self_address: Option<Address>,
    logs: mpsc::Receiver<RawLog>,
}

impl Subscription {
    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn self_address(&self) -> Option<Address> {
        self.self_address
    }
}

/// Watches `Transfer` events for the active contract and projects them into
/// history entries. Holds at most one subscription at a time.
pub struct EventWatcher {
    source: Arc<dyn EventSource>,
    fallback_decimals: u8,
    active: Option<Subscription>,
}

impl EventWatcher {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self::with_fallback_decimals(source, FALLBACK_DECIMALS)
    }

    pub fn with_fallback_decimals(source: Arc<dyn EventSource>, fallback_decimals: u8) -> Self {
        Self {
            source,
            fallback_decimals,
            active: None,
        }
    }

    /// Subscribe to transfers on `contract`, classifying them relative to
    /// `self_address`. Any previous subscription is torn down first.
    pub async fn subscribe(
        &mut self,
        contract: Address,
        self_address: Option<Address>,
    ) -> Result<(), SubscribeError> {
        self.unsubscribe();

        let filter = LogFilter {
            address: contract,
            topic0: transfer_topic(),
        };
        let logs = self.source.subscribe(filter).await?;
        info!(%contract, "subscribed to Transfer events");

        self.active = Some(Subscription {
            contract,
            self_address,
            logs,
        });
        Ok(())
    }

    pub fn unsubscribe(&mut self) {
        if let Some(sub) = self.active.take() {
            debug!(contract = %sub.contract, "tearing down Transfer subscription");
        }
    }

    /// Reclassify transfers on the live subscription relative to
    /// `self_address`, without resubscribing. Returns `false` when there is
    /// no subscription to update.
    pub fn set_self_address(&mut self, self_address: Option<Address>) -> bool {
        match self.active.as_mut() {
            Some(sub) => {
                debug!(contract = %sub.contract, ?self_address, "updating Transfer classification");
                sub.self_address = self_address;
                true
            }
            None => false,
        }
    }

    pub fn active(&self) -> Option<&Subscription> {
        self.active.as_ref()
    }

    /// Wait for the next transfer on the active subscription.
    ///
    /// Returns `None` when there is no subscription or the source closed it.
    pub async fn next_entry(&mut self, decimals: Option<u8>) -> Option<TransactionLogEntry> {
        let decimals = decimals.unwrap_or(self.fallback_decimals);
        loop {
            let sub = self.active.as_mut()?;
            let Some(log) = sub.logs.recv().await else {
                debug!(contract = %sub.contract, "Transfer stream ended");
                self.active = None;
                return None;
            };
            if let Some(entry) = accept(sub, &log, decimals) {
                return Some(entry);
            }
        }
    }

    /// Take the next already-delivered transfer, if any, without waiting.
    pub fn try_next_entry(&mut self, decimals: Option<u8>) -> Option<TransactionLogEntry> {
        let decimals = decimals.unwrap_or(self.fallback_decimals);
        loop {
            let sub = self.active.as_mut()?;
            match sub.logs.try_recv() {
                Ok(log) => {
                    if let Some(entry) = accept(sub, &log, decimals) {
                        return Some(entry);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    debug!(contract = %sub.contract, "Transfer stream ended");
                    self.active = None;
                    return None;
                }
            }
        }
    }
}

/// Apply the subscription's filter and project the log, logging anything
/// that has to be skipped.
fn accept(sub: &Subscription, log: &RawLog, decimals: u8) -> Option<TransactionLogEntry> {
    if log.address != sub.contract || log.topics.first() != Some(&transfer_topic()) {
        debug!(emitter = %log.address, "ignoring unrelated log");
        return None;
    }
    match project(log, sub.self_address, decimals) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!(tx = %log.transaction_hash, error = %e, "skipping undecodable Transfer log");
            None
        }
    }
}

/// Project a raw `Transfer` log into a history entry.
///
/// The transfer is outgoing iff `from` is `self_address`; the counterparty
/// is the other side.
pub fn project(
    log: &RawLog,
    self_address: Option<Address>,
    decimals: u8,
) -> Result<TransactionLogEntry, DecodeError> {
    if log.topics.len() != 3 {
        return Err(DecodeError::InvalidEncoding(format!(
            "Transfer log has {} topics, expected 3",
            log.topics.len()
        )));
    }
    let from = Address::from_word(&log.topics[1]);
    let to = Address::from_word(&log.topics[2]);
    let value: BigUint = abi::decode_uint(&log.data, 256)?;

    let (direction, counterparty) = if Some(from) == self_address {
        (Direction::Outgoing, to)
    } else {
        (Direction::Incoming, from)
    };

    Ok(TransactionLogEntry {
        hash: log.transaction_hash,
        direction,
        amount: from_base_units(&value, decimals),
        value,
        decimals,
        counterparty,
        timestamp: OffsetDateTime::now_utc(),
        status: EntryStatus::Confirmed,
        block_number: log.block_number,
    })
}
