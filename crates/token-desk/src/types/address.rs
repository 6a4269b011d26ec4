use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tiny_keccak::{Hasher, Keccak};

use crate::error::AddressError;

/// Whether `s` is a well-formed account or contract address:
/// `0x` followed by exactly 40 hex digits, in any case.
pub fn is_valid_address(s: &str) -> bool {
    s.len() == 42
        && s.starts_with("0x")
        && s[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// A 20-byte account or contract address.
///
/// Equality is byte equality, so two textual forms that differ only in
/// case compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Parse a `0x`-prefixed address, accepting any mix of case.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        if s.trim().is_empty() {
            return Err(AddressError::Empty);
        }
        if !is_valid_address(s) {
            return Err(AddressError::Malformed(s.to_string()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(&s[2..], &mut bytes)
            .map_err(|_| AddressError::Malformed(s.to_string()))?;
        Ok(Self(bytes))
    }

    /// Build an address from the low 20 bytes of an ABI word or log topic.
    pub fn from_word(word: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..32]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lower-case `0x` form.
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// EIP-55 mixed-case checksum encoding.
    pub fn to_checksum(&self) -> String {
        let hex_addr = hex::encode(self.0);
        let mut hasher = Keccak::v256();
        hasher.update(hex_addr.as_bytes());
        let mut hash = [0u8; 32];
        hasher.finalize(&mut hash);

        let mut result = String::with_capacity(42);
        result.push_str("0x");
        for (i, c) in hex_addr.chars().enumerate() {
            let hash_nibble = if i % 2 == 0 {
                (hash[i / 2] >> 4) & 0x0f
            } else {
                hash[i / 2] & 0x0f
            };
            if hash_nibble >= 8 {
                result.push(c.to_ascii_uppercase());
            } else {
                result.push(c);
            }
        }
        result
    }

    /// Abbreviated form for history rows, e.g. `0x5aAe…eAed`.
    pub fn short(&self) -> String {
        let full = self.to_checksum();
        format!("{}…{}", &full[..6], &full[38..])
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_lower_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A 32-byte transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.strip_prefix("0x")?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_address() {
        assert!(is_valid_address("0x1111111111111111111111111111111111111111"));
        assert!(is_valid_address("0xdAC17F958D2ee523a2206206994597C13D831ec7"));
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("0x"));
        assert!(!is_valid_address("1111111111111111111111111111111111111111"));
        assert!(!is_valid_address("0X1111111111111111111111111111111111111111"));
        assert!(!is_valid_address("0x111111111111111111111111111111111111111"));
        assert!(!is_valid_address("0x11111111111111111111111111111111111111111"));
        assert!(!is_valid_address("0xg111111111111111111111111111111111111111"));
        assert!(!is_valid_address("0x0x11111111111111111111111111111111111111"));
    }

    #[test]
    fn test_validity_matches_shape_rule() {
        let samples = [
            "0xabcdefABCDEF0123456789abcdefABCDEF012345",
            "0xabcdefABCDEF0123456789abcdefABCDEF01234z",
            "0xabcdefABCDEF0123456789abcdefABCDEF01234",
            " 0xabcdefABCDEF0123456789abcdefABCDEF01234",
            "0x ",
            "0x€bcdefABCDEF0123456789abcdefABCDEF01234",
        ];
        for s in samples {
            let expected = s.len() == 42
                && s.starts_with("0x")
                && s[2..].chars().all(|c| c.is_ascii_hexdigit());
            assert_eq!(is_valid_address(s), expected, "{s}");
        }
    }

    #[test]
    fn test_equality_ignores_case() {
        let lower: Address = "0xdac17f958d2ee523a2206206994597c13d831ec7".parse().unwrap();
        let upper: Address = "0xDAC17F958D2EE523A2206206994597C13D831EC7".parse().unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Address::parse("  "), Err(AddressError::Empty));
        assert!(matches!(
            Address::parse("0x1234"),
            Err(AddressError::Malformed(_))
        ));
    }

    #[test]
    fn test_eip55_checksum() {
        let addr: Address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
        assert_eq!(addr.to_checksum(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert_eq!(addr.to_string(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert_eq!(addr.short(), "0x5aAe…eAed");
    }

    #[test]
    fn test_from_word() {
        let mut word = [0u8; 32];
        word[31] = 1;
        let addr = Address::from_word(&word);
        assert_eq!(addr.to_lower_hex(), "0x0000000000000000000000000000000000000001");
    }

    #[test]
    fn test_serde_roundtrip() {
        let addr: Address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_tx_hash_display() {
        let hash = TxHash([0xab; 32]);
        let s = hash.to_string();
        assert_eq!(s.len(), 66);
        assert_eq!(TxHash::parse(&s), Some(hash));
        assert_eq!(TxHash::parse("0x12"), None);
    }
}
