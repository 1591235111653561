//! Account identifiers and 256-bit hashes
//!
//! Both types use their raw textual form on the wire: an account is
//! `"<workchain>:<64 hex chars>"`, a hash is 64 hex chars. Parsing is
//! always fallible so malformed input surfaces as a [`ParseError`].

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// A 256-bit value, used for transaction hashes and account addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bits256(pub [u8; 32]);

impl Bits256 {
    pub const ZERO: Bits256 = Bits256([0u8; 32]);

    /// A zero hash marks a placeholder node that has not been resolved yet.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Bits256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Bits256 {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| ParseError::new("hash", s, e.to_string()))?;
        Ok(Bits256(bytes))
    }
}

impl Serialize for Bits256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Bits256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Identifies an on-chain account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId {
    pub workchain: i32,
    pub address: Bits256,
}

impl AccountId {
    pub fn new(workchain: i32, address: [u8; 32]) -> Self {
        Self {
            workchain,
            address: Bits256(address),
        }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workchain, self.address)
    }
}

impl FromStr for AccountId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (workchain, address) = s
            .split_once(':')
            .ok_or_else(|| ParseError::new("account id", s, "missing workchain separator"))?;
        let workchain = workchain
            .parse::<i32>()
            .map_err(|e| ParseError::new("account id", s, format!("invalid workchain: {e}")))?;
        let address = address
            .parse::<Bits256>()
            .map_err(|e| ParseError::new("account id", s, e.reason))?;
        Ok(Self { workchain, address })
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_display_and_parse() {
        let account = AccountId::new(-1, [0xab; 32]);
        let raw = account.to_string();
        assert_eq!(raw, format!("-1:{}", "ab".repeat(32)));
        assert_eq!(raw.parse::<AccountId>().unwrap(), account);
    }

    #[test]
    fn test_account_id_rejects_malformed() {
        assert!("".parse::<AccountId>().is_err());
        assert!("0".parse::<AccountId>().is_err());
        assert!("x:00".parse::<AccountId>().is_err());
        assert!(format!("0:{}", "zz".repeat(32)).parse::<AccountId>().is_err());
        assert!(format!("0:{}", "00".repeat(31)).parse::<AccountId>().is_err());

        let err = "garbage".parse::<AccountId>().unwrap_err();
        assert_eq!(err.kind, "account id");
        assert_eq!(err.input, "garbage");
    }

    #[test]
    fn test_zero_hash() {
        assert!(Bits256::ZERO.is_zero());
        assert!(Bits256::default().is_zero());
        assert!(!Bits256([1; 32]).is_zero());
    }
}
