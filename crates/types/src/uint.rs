use crate::Address;
use primitive_types::{U256 as PrimitiveU256, U512 as PrimitiveU512};

pub type U256 = PrimitiveU256;
pub type U512 = PrimitiveU512;

/// Conversions between 256-bit words and their byte/address encodings.
pub trait WordExt: Sized {
    /// Interprets a big-endian byte slice as a word. Slices shorter than 32
    /// bytes are left-padded with zeros; longer slices keep the leading 32
    /// bytes.
    fn from_be_slice(bytes: &[u8]) -> Self;

    fn to_be_bytes(&self) -> [u8; 32];

    /// The low 20 bytes of the word, as an account address.
    fn to_address(&self) -> Address;

    fn from_address(addr: Address) -> Self;
}

impl WordExt for U256 {
    fn from_be_slice(bytes: &[u8]) -> Self {
        let bytes = if bytes.len() > 32 { &bytes[..32] } else { bytes };
        let mut array = [0u8; 32];
        array[32 - bytes.len()..].copy_from_slice(bytes);
        U256::from_big_endian(&array)
    }

    fn to_be_bytes(&self) -> [u8; 32] {
        let mut array = [0u8; 32];
        self.to_big_endian(&mut array);
        array
    }

    fn to_address(&self) -> Address {
        let bytes = self.to_be_bytes();
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&bytes[12..]);
        Address::from_bytes(addr)
    }

    fn from_address(addr: Address) -> Self {
        let mut array = [0u8; 32];
        array[12..].copy_from_slice(addr.as_bytes());
        U256::from_big_endian(&array)
    }
}
