use helios_types::{Address, Bytes, H256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A log record emitted by the LOG0..LOG4 opcodes. `removed` marks records
/// that belonged to a chain segment that was later reorganized away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
    pub removed: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("truncated log record")]
pub struct LogDecodeError;

impl Log {
    pub fn new(address: Address, topics: Vec<H256>, data: Vec<u8>) -> Self {
        Log {
            address,
            topics,
            data: data.into(),
            removed: false,
        }
    }

    /// Binary wire form: address, topic count as a single byte, the topics,
    /// the data behind a little-endian u32 length, and the removed flag.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(20 + 1 + self.topics.len() * 32 + 4 + self.data.len() + 1);
        out.extend_from_slice(self.address.as_bytes());
        out.push(self.topics.len() as u8);
        for topic in &self.topics {
            out.extend_from_slice(topic.as_bytes());
        }
        out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.data);
        out.push(self.removed as u8);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, LogDecodeError> {
        let mut cursor = Cursor { bytes, pos: 0 };
        let address = Address::from_bytes(cursor.take_array::<20>()?);
        let count = cursor.take_array::<1>()?[0] as usize;
        let mut topics = Vec::with_capacity(count);
        for _ in 0..count {
            topics.push(H256::from(cursor.take_array::<32>()?));
        }
        let len = u32::from_le_bytes(cursor.take_array::<4>()?) as usize;
        let data = cursor.take(len)?.to_vec();
        let removed = cursor.take_array::<1>()?[0] != 0;
        Ok(Log {
            address,
            topics,
            data: data.into(),
            removed,
        })
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], LogDecodeError> {
        let end = self.pos.checked_add(n).ok_or(LogDecodeError)?;
        if end > self.bytes.len() {
            return Err(LogDecodeError);
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], LogDecodeError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let log = Log::new(
            Address::from_bytes([0xaa; 20]),
            vec![H256::from([1u8; 32]), H256::from([2u8; 32])],
            vec![0xde, 0xad, 0xbe, 0xef],
        );
        let encoded = log.encode();
        assert_eq!(Log::decode(&encoded).unwrap(), log);
    }

    #[test]
    fn test_decode_truncated() {
        let log = Log::new(Address::from_bytes([0xaa; 20]), vec![], vec![1, 2, 3]);
        let encoded = log.encode();
        assert!(Log::decode(&encoded[..encoded.len() - 1]).is_err());
    }

    #[test]
    fn test_json_hex_encodes_data() {
        let log = Log::new(Address::from_bytes([0x11; 20]), vec![], vec![0xab, 0xcd]);
        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains("\"0xabcd\""));
        let back: Log = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
    }
}
