//! Conversion between human decimal amounts and integer base units.
//!
//! Everything here is integer arithmetic on [`BigUint`]. Token amounts
//! routinely exceed what an `f64` can represent exactly.

use num_bigint::BigUint;

use crate::error::AmountError;

/// Largest magnitude that fits in a uint256 word, in bytes.
const UINT256_BYTES: usize = 32;

/// Parse a positive decimal string into base units at `decimals` precision.
///
/// Accepts `"1"`, `"1.5"`, `".5"` and `"5."`. Surrounding whitespace is
/// ignored. Signs, exponents and more fractional digits than `decimals`
/// are rejected rather than rounded.
pub fn to_base_units(input: &str, decimals: u8) -> Result<BigUint, AmountError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(AmountError::Empty);
    }
    if s.starts_with('-') {
        return Err(AmountError::NotPositive);
    }

    let (integer_part, fraction_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };

    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (integer_part.is_empty() && fraction_part.is_empty())
        || !all_digits(integer_part)
        || !all_digits(fraction_part)
    {
        return Err(AmountError::Malformed(s.to_string()));
    }

    let fraction_part = fraction_part.trim_end_matches('0');
    if fraction_part.len() > decimals as usize {
        return Err(AmountError::TooPrecise {
            max_decimals: decimals,
        });
    }

    let mut digits = String::with_capacity(integer_part.len() + decimals as usize);
    digits.push_str(integer_part);
    digits.push_str(fraction_part);
    digits.extend(std::iter::repeat_n('0', decimals as usize - fraction_part.len()));

    let value = BigUint::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| AmountError::Malformed(s.to_string()))?;

    if value == BigUint::default() {
        return Err(AmountError::NotPositive);
    }
    if value.to_bytes_be().len() > UINT256_BYTES {
        return Err(AmountError::Overflow);
    }
    Ok(value)
}

/// Render base units as a decimal string with `decimals` fractional
/// digits, trimming trailing zeros.
pub fn from_base_units(amount: &BigUint, decimals: u8) -> String {
    let s = amount.to_string();
    let decimals = decimals as usize;

    if decimals == 0 {
        return s;
    }

    let (integer_part, decimal_part) = if s.len() <= decimals {
        let mut padded = String::with_capacity(decimals);
        padded.extend(std::iter::repeat_n('0', decimals - s.len()));
        padded.push_str(&s);
        ("0".to_string(), padded)
    } else {
        let (i, d) = s.split_at(s.len() - decimals);
        (i.to_string(), d.to_string())
    };

    let trimmed = decimal_part.trim_end_matches('0');
    if trimmed.is_empty() {
        integer_part
    } else {
        format!("{integer_part}.{trimmed}")
    }
}
