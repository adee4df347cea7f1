//! 20-byte account addresses and deterministic address derivation
//!
//! Every record in the state store lives at an address that any node can
//! recompute from stable inputs. Derivation hashes a domain label followed by
//! length-prefixed parts, so `("bond", a || b)` and `("bond", a, b)` never
//! collide.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Length of an address in bytes
pub const ADDRESS_LEN: usize = 20;

/// Account / entity address
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Derive an address from a domain label and ordered parts
    ///
    /// address = sha256(len(label) || label || len(p0) || p0 || ...)[..20]
    pub fn derive(label: &str, parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((label.len() as u32).to_le_bytes());
        hasher.update(label.as_bytes());
        for part in parts {
            hasher.update((part.len() as u32).to_le_bytes());
            hasher.update(part);
        }
        let digest = hasher.finalize();

        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(out)
    }

    /// Derive a sub-address of this address (e.g. a delegatee's reward pool)
    pub fn derive_child(&self, label: &str) -> Self {
        Self::derive(label, &[&self.0])
    }

    /// Parse from hex, with or without `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, AddressParseError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| AddressParseError::InvalidHex)?;
        if bytes.len() != ADDRESS_LEN {
            return Err(AddressParseError::InvalidLength(bytes.len()));
        }
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    #[error("address is not valid hex")]
    InvalidHex,

    #[error("address must be {ADDRESS_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

impl TryFrom<&[u8]> for Address {
    type Error = AddressParseError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AddressParseError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // short form keeps logs readable
        write!(f, "Address(0x{}..)", hex::encode(&self.0[..4]))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        let a = Address::new([1u8; 20]);
        let b = Address::new([2u8; 20]);

        let x = Address::derive("bond", &[a.as_bytes(), b.as_bytes()]);
        let y = Address::derive("bond", &[a.as_bytes(), b.as_bytes()]);
        assert_eq!(x, y);

        // order and label matter
        assert_ne!(x, Address::derive("bond", &[b.as_bytes(), a.as_bytes()]));
        assert_ne!(x, Address::derive("unbond", &[a.as_bytes(), b.as_bytes()]));
    }

    #[test]
    fn test_length_prefix_prevents_collisions() {
        let joined = Address::derive("x", &[b"abcd"]);
        let split = Address::derive("x", &[b"ab", b"cd"]);
        assert_ne!(joined, split);
    }

    #[test]
    fn test_hex_parse() {
        let a = Address::new([0xab; 20]);
        assert_eq!(Address::from_hex(&a.to_hex()).unwrap(), a);
        assert_eq!(
            Address::from_hex("0xabcd"),
            Err(AddressParseError::InvalidLength(2))
        );
        assert_eq!(Address::from_hex("zz"), Err(AddressParseError::InvalidHex));
    }
}
