use std::collections::VecDeque;

use num_bigint::BigUint;
use serde::Serialize;
use time::OffsetDateTime;

use crate::types::address::{Address, TxHash};

/// Number of entries kept by default.
pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryStatus {
    Pending,
    Confirmed,
    Failed,
}

/// One observed transfer, projected for display. Never edited once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionLogEntry {
    pub hash: TxHash,
    pub direction: Direction,
    /// `value` rendered at `decimals` precision.
    pub amount: String,
    pub value: BigUint,
    /// Precision used for `amount`; the fallback when metadata was missing.
    pub decimals: u8,
    pub counterparty: Address,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub status: EntryStatus,
    pub block_number: Option<u64>,
}

impl TransactionLogEntry {
    /// Wall-clock time of observation as `HH:MM:SS`.
    pub fn time_of_day(&self) -> String {
        let format = time::macros::format_description!("[hour]:[minute]:[second]");
        self.timestamp
            .format(format)
            .unwrap_or_else(|_| self.timestamp.unix_timestamp().to_string())
    }
}

/// Bounded, newest-first list of observed transfers.
#[derive(Debug, Clone)]
pub struct TransactionHistory {
    entries: VecDeque<TransactionLogEntry>,
    capacity: usize,
}

impl TransactionHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A capacity of 0 is treated as 1; `Config` rejects 0 up front.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend `entry`, evicting the oldest one when full.
    pub fn push(&mut self, entry: TransactionLogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &TransactionLogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&TransactionLogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TransactionHistory {
    fn default() -> Self {
        Self::new()
    }
}
