use helios_types::{Address, Amount, Bytes};
use serde::{Deserialize, Serialize};

/// Deploys a new contract. The deployment code is `code ++ params`; the
/// contract address is derived from the sender and the transaction sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateContract {
    pub seq: u64,
    pub from: Address,
    pub code: Bytes,
    pub params: Bytes,
}

/// Invokes a method on a deployed contract. The call input is
/// `method ++ params`; `amount` is transferred to the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContract {
    pub seq: u64,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
    pub method: Bytes,
    pub params: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_contract_json_round_trip() {
        let tx = CallContract {
            seq: 3,
            from: Address::from_bytes([0xaa; 20]),
            to: Address::from_bytes([0xbb; 20]),
            amount: Amount::from_u64(7),
            method: Bytes::from(vec![0x01, 0x02]),
            params: Bytes::from(vec![0x03]),
        };
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("\"0x0102\""));
        let back: CallContract = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn test_create_contract_json_round_trip() {
        let tx = CreateContract {
            seq: 1,
            from: Address::from_bytes([0xaa; 20]),
            code: Bytes::from(vec![0x60, 0x00]),
            params: Bytes::new(),
        };
        let json = serde_json::to_string(&tx).unwrap();
        let back: CreateContract = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }
}
