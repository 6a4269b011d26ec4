use std::sync::Arc;

use tracing::debug;

use crate::abi::{self, Token};
use crate::capability::{BatchReader, CallOutcome};
use crate::erc20::{ContractCall, Erc20Function};
use crate::error::{DecodeError, ReadError};
use crate::types::address::Address;
use crate::types::token::{Balance, TokenInfo, TokenMetadata};

/// Fixed read order; results are addressed by position.
const METADATA_FIELDS: [Erc20Function; 4] = [
    Erc20Function::TotalSupply,
    Erc20Function::Decimals,
    Erc20Function::Name,
    Erc20Function::Symbol,
];

/// Reads token metadata, and optionally a balance, in one batched call.
///
/// Holds no state besides the capability handle, so clones can run
/// fetches concurrently.
#[derive(Clone)]
pub struct TokenInfoReader {
    batch: Arc<dyn BatchReader>,
}

impl TokenInfoReader {
    pub fn new(batch: Arc<dyn BatchReader>) -> Self {
        Self { batch }
    }

    /// Fetch metadata for `token`, plus `balanceOf(owner)` when an owner is
    /// given. Any failed field fails the whole fetch.
    pub async fn fetch(&self, token: Address, owner: Option<Address>) -> Result<TokenInfo, ReadError> {
        let calls = build_calls(token, owner)?;
        debug!(%token, calls = calls.len(), "dispatching batched read");

        let results = self.batch.read_batch(&calls).await?;
        if results.len() != calls.len() {
            return Err(ReadError::ShapeMismatch {
                expected: calls.len(),
                actual: results.len(),
            });
        }

        let metadata = TokenMetadata {
            total_supply: field(&results, 0, |d| abi::decode_uint(d, 256))?,
            decimals: field(&results, 1, abi::decode_u8)?,
            name: field(&results, 2, abi::decode_string)?,
            symbol: field(&results, 3, abi::decode_string)?,
        };

        let balance = match owner {
            Some(owner) => Some(Balance {
                token,
                owner,
                value: field(&results, 4, |d| abi::decode_uint(d, 256))?,
            }),
            None => None,
        };

        Ok(TokenInfo { metadata, balance })
    }
}

fn build_calls(token: Address, owner: Option<Address>) -> Result<Vec<ContractCall>, ReadError> {
    let mut calls = METADATA_FIELDS
        .iter()
        .map(|f| ContractCall::new(token, *f, &[]))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| encode_failure(Erc20Function::TotalSupply, e))?;

    if let Some(owner) = owner {
        let call = ContractCall::new(token, Erc20Function::BalanceOf, &[Token::Address(owner)])
            .map_err(|e| encode_failure(Erc20Function::BalanceOf, e))?;
        calls.push(call);
    }
    Ok(calls)
}

fn encode_failure(function: Erc20Function, e: DecodeError) -> ReadError {
    ReadError::Field {
        function: function.name().to_string(),
        reason: e.to_string(),
    }
}

/// Decode the result at `index`, turning per-call and decode errors into a
/// `ReadError` naming the function.
fn field<T>(
    results: &[CallOutcome],
    index: usize,
    decode: impl Fn(&[u8]) -> Result<T, DecodeError>,
) -> Result<T, ReadError> {
    let function = match index {
        0..=3 => METADATA_FIELDS[index],
        _ => Erc20Function::BalanceOf,
    };
    let fail = |reason: String| ReadError::Field {
        function: function.name().to_string(),
        reason,
    };

    match results.get(index) {
        Some(Ok(data)) => decode(data).map_err(|e| fail(e.to_string())),
        Some(Err(reason)) => Err(fail(reason.clone())),
        None => Err(fail("missing result".to_string())),
    }
}
