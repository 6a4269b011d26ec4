use num_bigint::BigUint;
use serde::Serialize;

use crate::amount::from_base_units;
use crate::types::address::Address;

/// Token metadata read from the contract.
///
/// Replaced as a whole whenever a new contract address is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMetadata {
    pub total_supply: BigUint,
    pub decimals: u8,
    pub name: String,
    pub symbol: String,
}

impl TokenMetadata {
    /// Total supply rendered with the token's own precision.
    pub fn display_total_supply(&self) -> String {
        from_base_units(&self.total_supply, self.decimals)
    }
}

/// Balance of `owner` on the token at `token`, in base units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub token: Address,
    pub owner: Address,
    pub value: BigUint,
}

/// Result of one batched read: metadata, plus the balance when one was
/// requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub metadata: TokenMetadata,
    pub balance: Option<Balance>,
}
