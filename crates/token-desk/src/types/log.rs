use super::address::{Address, TxHash};

/// Filter handed to the event capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topic0: [u8; 32],
}

/// A raw log entry as delivered by the node client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Mined transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    /// `false` when the transaction was included but reverted.
    pub success: bool,
}
