use helios_types::{Amount, H256};
use std::collections::HashMap;

/// One account: a balance, a monotonically increasing sequence, and a
/// key-to-bytes data map. Contract code and its metadata are ordinary data
/// entries under the reserved keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub balance: Amount,
    pub seq: u64,
    pub data: HashMap<H256, Vec<u8>>,
}

impl Account {
    pub fn data(&self, key: &H256) -> &[u8] {
        self.data.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}
