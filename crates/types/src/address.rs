use crate::{Result, TypesError, H160};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 20-byte account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address(H160);

impl Address {
    pub const ZERO: Address = Address(H160::zero());

    pub fn zero() -> Self {
        Self::ZERO
    }

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(H160::from(bytes))
    }

    /// Builds an address from an arbitrary byte slice: longer input keeps the
    /// leading 20 bytes, shorter input is left-aligned and zero-padded.
    pub fn from_slice_truncated(slice: &[u8]) -> Self {
        let mut bytes = [0u8; 20];
        let len = std::cmp::min(slice.len(), 20);
        bytes[..len].copy_from_slice(&slice[..len]);
        Address(H160::from(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn to_bytes(&self) -> [u8; 20] {
        self.0.to_fixed_bytes()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| TypesError::InvalidHex(s.to_string()))?;
        if bytes.len() != 20 {
            return Err(TypesError::InvalidLength {
                expected: 20,
                actual: bytes.len(),
            });
        }
        let mut array = [0u8; 20];
        array.copy_from_slice(&bytes);
        Ok(Address::from_bytes(array))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl From<H160> for Address {
    fn from(hash: H160) -> Self {
        Address(hash)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_from_str() {
        let addr = Address::from_str("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(addr.to_bytes()[0], 0x5a);
        assert_eq!(addr.to_bytes()[19], 0xed);
    }

    #[test]
    fn test_address_from_str_bad_length() {
        assert!(Address::from_str("0x1234").is_err());
    }

    #[test]
    fn test_from_slice_truncated() {
        let long = [0x11u8; 25];
        assert_eq!(Address::from_slice_truncated(&long).to_bytes(), [0x11; 20]);

        let short = [0x22u8; 3];
        let addr = Address::from_slice_truncated(&short);
        assert_eq!(addr.to_bytes()[..3], [0x22; 3]);
        assert_eq!(addr.to_bytes()[3..], [0; 17]);
    }

    #[test]
    fn test_zero_address() {
        assert_eq!(
            Address::ZERO.to_string(),
            "0x0000000000000000000000000000000000000000"
        );
    }
}
