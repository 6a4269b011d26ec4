//! The ERC-20 interface shape the session talks to.

use num_bigint::BigUint;

use crate::abi::{self, Token};
use crate::error::DecodeError;
use crate::types::address::Address;

/// Functions of the token contract used by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Erc20Function {
    TotalSupply,
    Decimals,
    Name,
    Symbol,
    BalanceOf,
    Transfer,
}

impl Erc20Function {
    pub fn signature(self) -> &'static str {
        match self {
            Erc20Function::TotalSupply => "totalSupply()",
            Erc20Function::Decimals => "decimals()",
            Erc20Function::Name => "name()",
            Erc20Function::Symbol => "symbol()",
            Erc20Function::BalanceOf => "balanceOf(address)",
            Erc20Function::Transfer => "transfer(address,uint256)",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Erc20Function::TotalSupply => "totalSupply",
            Erc20Function::Decimals => "decimals",
            Erc20Function::Name => "name",
            Erc20Function::Symbol => "symbol",
            Erc20Function::BalanceOf => "balanceOf",
            Erc20Function::Transfer => "transfer",
        }
    }

    /// ABI-encode a call to this function.
    pub fn encode(self, args: &[Token]) -> Result<Vec<u8>, DecodeError> {
        let sig = abi::parse_signature(self.signature())?;
        abi::encode_call(&sig, args)
    }
}

impl std::fmt::Display for Erc20Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of a batched read or a write submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub target: Address,
    pub function: Erc20Function,
    pub calldata: Vec<u8>,
}

impl ContractCall {
    pub fn new(target: Address, function: Erc20Function, args: &[Token]) -> Result<Self, DecodeError> {
        Ok(Self {
            target,
            function,
            calldata: function.encode(args)?,
        })
    }

    pub fn transfer(token: Address, recipient: Address, amount: BigUint) -> Result<Self, DecodeError> {
        Self::new(
            token,
            Erc20Function::Transfer,
            &[Token::Address(recipient), Token::Uint(amount)],
        )
    }
}

/// Topic 0 of `Transfer(address indexed from, address indexed to, uint256 value)`.
pub fn transfer_topic() -> [u8; 32] {
    abi::event_topic(abi::TRANSFER_EVENT)
}
