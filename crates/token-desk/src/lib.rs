pub mod abi;
pub mod amount;
pub mod capability;
pub mod config;
pub mod erc20;
pub mod error;
pub mod history;
pub mod reader;
pub mod session;
pub mod transfer;
pub mod types;
pub mod watcher;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use amount::{from_base_units, to_base_units};
pub use capability::{
    BatchReader, EventSource, NotificationKind, Notifier, ReceiptWaiter, TracingNotifier, TransferWriter,
    WalletState,
};
pub use config::Config;
pub use error::{Error, ErrorKind};
pub use history::{Direction, EntryStatus, TransactionHistory, TransactionLogEntry};
pub use reader::TokenInfoReader;
pub use session::{Capabilities, ContractView, LookupOutcome, LookupTicket, Session};
pub use transfer::{TransferOrchestrator, TransferRequest, TransferState};
pub use types::address::{is_valid_address, Address, TxHash};
pub use types::token::{Balance, TokenInfo, TokenMetadata};
