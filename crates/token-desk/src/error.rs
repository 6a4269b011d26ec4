use thiserror::Error;

use crate::types::address::TxHash;

/// Unified error type for the token session.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("read error: {0}")]
    Read(#[from] ReadError),

    #[error("submit error: {0}")]
    Submit(#[from] SubmitError),

    #[error("confirmation error: {0}")]
    Confirmation(#[from] ConfirmationError),

    #[error("subscribe error: {0}")]
    Subscribe(#[from] SubscribeError),
}

/// Discriminant of [`Error`], for callers that route errors to different
/// parts of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Read,
    Submit,
    Confirmation,
    Subscribe,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Read(_) => ErrorKind::Read,
            Error::Submit(_) => ErrorKind::Submit,
            Error::Confirmation(_) => ErrorKind::Confirmation,
            Error::Subscribe(_) => ErrorKind::Subscribe,
        }
    }
}

/// Failure reported by an external capability (node client, wallet).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CapabilityError(pub String);

impl CapabilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address is required")]
    Empty,

    #[error("invalid address format: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is required")]
    Empty,

    #[error("amount is not a decimal number: {0}")]
    Malformed(String),

    #[error("amount must be a positive number")]
    NotPositive,

    #[error("amount has more than {max_decimals} fractional digits")]
    TooPrecise { max_decimals: u8 },

    #[error("amount does not fit in uint256")]
    Overflow,
}

/// Per-field validation results for the transfer form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub recipient: Option<AddressError>,
    pub amount: Option<AmountError>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.recipient.is_none() && self.amount.is_none()
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = [
            self.recipient.as_ref().map(|e| format!("recipient: {e}")),
            self.amount.as_ref().map(|e| format!("amount: {e}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        f.write_str(&parts.join("; "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("contract address: {0}")]
    ContractAddress(AddressError),

    #[error("token decimals not loaded")]
    DecimalsUnavailable,

    #[error("please first fetch token info by entering the contract address")]
    NoContract,

    #[error("please connect your wallet first")]
    WalletNotConnected,

    #[error("{0}")]
    Fields(FieldErrors),
}

/// Errors from the batched metadata/balance read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("batch read failed: {0}")]
    Transport(#[from] CapabilityError),

    #[error("{function}() failed: {reason}")]
    Field { function: String, reason: String },

    #[error("batch returned {actual} results, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("a transfer is already in flight")]
    InFlight,

    #[error("{0}")]
    Invalid(#[from] ValidationError),

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("could not encode transfer: {0}")]
    Encode(#[from] DecodeError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmationError {
    #[error("no transaction is pending")]
    NothingPending,

    #[error("transaction {hash} still pending after timeout")]
    TimedOut { hash: TxHash },

    #[error("transaction {hash} reverted")]
    Reverted { hash: TxHash },

    #[error("waiting for {hash} failed: {reason}")]
    Failed { hash: TxHash, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("event subscription failed: {0}")]
    Capability(#[from] CapabilityError),
}

/// Errors during ABI encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid function signature: {0}")]
    InvalidSignature(String),

    #[error("data too short: expected at least {expected} bytes, got {actual}")]
    DataTooShort { expected: usize, actual: usize },

    #[error("invalid ABI encoding: {0}")]
    InvalidEncoding(String),

    #[error("value out of range for {0}")]
    OutOfRange(String),
}
