use num_bigint::BigUint;
use tiny_keccak::{Hasher, Keccak};

use crate::error::DecodeError;
use crate::types::address::Address;

const WORD: usize = 32;

/// Canonical signature of the ERC-20 `Transfer` event.
pub const TRANSFER_EVENT: &str = "Transfer(address,address,uint256)";

/// Parsed function signature.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<ParamType>,
    pub canonical: String,
    pub selector: [u8; 4],
}

/// The static ABI types this crate encodes and decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Uint(usize),
}

/// A value to encode as a call argument.
#[derive(Debug, Clone)]
pub enum Token {
    Address(Address),
    Uint(BigUint),
}

impl Token {
    fn param_type(&self) -> ParamType {
        match self {
            Token::Address(_) => ParamType::Address,
            Token::Uint(_) => ParamType::Uint(256),
        }
    }
}

/// Parse a function signature string into a `FunctionSignature`.
///
/// Example: `"transfer(address,uint256)"` → name="transfer", params=[Address, Uint(256)]
pub fn parse_signature(sig: &str) -> Result<FunctionSignature, DecodeError> {
    let sig = sig.trim();
    let open = sig
        .find('(')
        .ok_or_else(|| DecodeError::InvalidSignature(format!("missing '(' in: {sig}")))?;

    if !sig.ends_with(')') {
        return Err(DecodeError::InvalidSignature(format!(
            "missing ')' in: {sig}"
        )));
    }

    let name = sig[..open].to_string();
    if name.is_empty() {
        return Err(DecodeError::InvalidSignature(
            "empty function name".to_string(),
        ));
    }

    let params_str = &sig[open + 1..sig.len() - 1];
    let params = if params_str.trim().is_empty() {
        vec![]
    } else {
        params_str
            .split(',')
            .map(parse_param_type)
            .collect::<Result<Vec<_>, _>>()?
    };

    let canonical = format!("{}({})", name, canonical_params(&params));
    let selector = selector_from_signature(&canonical);

    Ok(FunctionSignature {
        name,
        params,
        canonical,
        selector,
    })
}

fn parse_param_type(s: &str) -> Result<ParamType, DecodeError> {
    let s = s.trim();
    match s {
        "address" => Ok(ParamType::Address),
        _ if s.starts_with("uint") => {
            let bits = if s == "uint" {
                256
            } else {
                s[4..].parse::<usize>().map_err(|_| {
                    DecodeError::InvalidSignature(format!("invalid uint width: {s}"))
                })?
            };
            if bits == 0 || bits > 256 || bits % 8 != 0 {
                return Err(DecodeError::InvalidSignature(format!(
                    "invalid uint width: {s}"
                )));
            }
            Ok(ParamType::Uint(bits))
        }
        _ => Err(DecodeError::InvalidSignature(format!("unsupported type: {s}"))),
    }
}

fn canonical_params(params: &[ParamType]) -> String {
    params
        .iter()
        .map(|p| match p {
            ParamType::Address => "address".to_string(),
            ParamType::Uint(bits) => format!("uint{bits}"),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Keccak-256 of a byte string.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    hash
}

/// Compute the 4-byte selector from a canonical function signature.
pub fn selector_from_signature(canonical: &str) -> [u8; 4] {
    let hash = keccak256(canonical.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Topic 0 of an event, i.e. the full keccak hash of its signature.
pub fn event_topic(canonical: &str) -> [u8; 32] {
    keccak256(canonical.as_bytes())
}

/// Encode a call: selector followed by one head word per static argument.
pub fn encode_call(sig: &FunctionSignature, args: &[Token]) -> Result<Vec<u8>, DecodeError> {
    if args.len() != sig.params.len() {
        return Err(DecodeError::InvalidEncoding(format!(
            "{} takes {} arguments, got {}",
            sig.name,
            sig.params.len(),
            args.len()
        )));
    }

    let mut calldata = Vec::with_capacity(4 + WORD * args.len());
    calldata.extend_from_slice(&sig.selector);
    for (param, arg) in sig.params.iter().zip(args) {
        if arg.param_type() != *param {
            return Err(DecodeError::InvalidEncoding(format!(
                "argument {arg:?} does not match {param:?}"
            )));
        }
        calldata.extend_from_slice(&encode_word(arg)?);
    }
    Ok(calldata)
}

fn encode_word(token: &Token) -> Result<[u8; 32], DecodeError> {
    let mut word = [0u8; 32];
    match token {
        Token::Address(addr) => word[12..].copy_from_slice(addr.as_bytes()),
        Token::Uint(value) => {
            let bytes = value.to_bytes_be();
            if bytes.len() > WORD {
                return Err(DecodeError::OutOfRange("uint256".to_string()));
            }
            word[WORD - bytes.len()..].copy_from_slice(&bytes);
        }
    }
    Ok(word)
}

/// Decode a single `uintN` return value, checking it fits in `bits`.
pub fn decode_uint(data: &[u8], bits: usize) -> Result<BigUint, DecodeError> {
    let word = read_word(data, 0)?;
    let value = BigUint::from_bytes_be(&word);
    if value.bits() > bits as u64 {
        return Err(DecodeError::OutOfRange(format!("uint{bits}")));
    }
    Ok(value)
}

/// Decode a `uint8` return value.
pub fn decode_u8(data: &[u8]) -> Result<u8, DecodeError> {
    let word = read_word(data, 0)?;
    if word[..31].iter().any(|&b| b != 0) {
        return Err(DecodeError::OutOfRange("uint8".to_string()));
    }
    Ok(word[31])
}

/// Decode a single dynamic `string` return value.
pub fn decode_string(data: &[u8]) -> Result<String, DecodeError> {
    let offset = read_u256_as_usize(data, 0)?;
    let len = read_u256_as_usize(data, offset)?;
    let start = offset + WORD;
    ensure_bytes(data, start, len)?;
    let s = std::str::from_utf8(&data[start..start + len])
        .map_err(|e| DecodeError::InvalidEncoding(format!("invalid UTF-8: {e}")))?;
    Ok(s.to_string())
}

/// Read the 32-byte word at `offset`.
pub fn read_word(data: &[u8], offset: usize) -> Result<[u8; 32], DecodeError> {
    ensure_bytes(data, offset, WORD)?;
    let mut word = [0u8; 32];
    word.copy_from_slice(&data[offset..offset + WORD]);
    Ok(word)
}

fn read_u256_as_usize(data: &[u8], offset: usize) -> Result<usize, DecodeError> {
    let word = read_word(data, offset)?;
    // Check that high bytes are zero (offset should fit in usize)
    for &b in &word[..24] {
        if b != 0 {
            return Err(DecodeError::InvalidEncoding(
                "offset too large for usize".to_string(),
            ));
        }
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[24..32]);
    usize::try_from(u64::from_be_bytes(bytes))
        .map_err(|_| DecodeError::InvalidEncoding("offset too large for usize".to_string()))
}

fn ensure_bytes(data: &[u8], offset: usize, len: usize) -> Result<(), DecodeError> {
    match offset.checked_add(len) {
        Some(end) if end <= data.len() => Ok(()),
        _ => Err(DecodeError::DataTooShort {
            expected: offset.saturating_add(len),
            actual: data.len(),
        }),
    }
}
