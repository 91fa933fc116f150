use crate::opcodes::Opcode;
use helios_types::{Address, Amount, H256, U256};

/// The per-invocation execution frame: who called, which account the code
/// runs as, the code itself and the value carried by the call.
///
/// `code_address` is the account the code was loaded from when it differs
/// from the executing account (CALLCODE and DELEGATECALL); it is also the
/// key for precompile dispatch.
#[derive(Debug, Clone)]
pub struct Contract {
    caller_address: Address,
    self_address: Address,
    code: Vec<u8>,
    code_hash: H256,
    code_address: Option<Address>,
    pub(crate) input: Vec<u8>,
    value: Amount,
    jumpdests: Option<Vec<u8>>,
}

impl Contract {
    pub fn new(caller: Address, self_address: Address, value: Amount) -> Self {
        Contract {
            caller_address: caller,
            self_address,
            code: Vec::new(),
            code_hash: H256::zero(),
            code_address: None,
            input: Vec::new(),
            value,
            jumpdests: None,
        }
    }

    pub fn set_call_code(&mut self, addr: Option<Address>, hash: H256, code: Vec<u8>) {
        self.code = code;
        self.code_hash = hash;
        self.code_address = addr;
        self.jumpdests = None;
    }

    /// Re-labels the frame with the parent's caller and value, so the loaded
    /// code executes entirely in the parent's context.
    pub fn as_delegate(mut self, parent: &Contract) -> Self {
        self.caller_address = parent.caller_address;
        self.value = parent.value;
        self
    }

    pub fn caller(&self) -> Address {
        self.caller_address
    }

    pub fn address(&self) -> Address {
        self.self_address
    }

    pub fn value(&self) -> Amount {
        self.value
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn code_hash(&self) -> H256 {
        self.code_hash
    }

    pub fn code_address(&self) -> Option<Address> {
        self.code_address
    }

    pub fn input(&self) -> &[u8] {
        &self.input
    }

    /// The opcode byte at `pc`; positions past the end of code read as STOP.
    pub fn get_op(&self, pc: u64) -> u8 {
        self.code
            .get(pc as usize)
            .copied()
            .unwrap_or(Opcode::STOP as u8)
    }

    /// Whether `dest` is a JUMPDEST outside any PUSH immediate. The analysis
    /// runs once per frame on first use.
    pub fn valid_jumpdest(&mut self, dest: U256) -> bool {
        if dest >= U256::from(self.code.len() as u64) {
            return false;
        }
        let pos = dest.low_u64() as usize;
        if self.code[pos] != Opcode::JUMPDEST as u8 {
            return false;
        }
        let bitmap = self
            .jumpdests
            .get_or_insert_with(|| analyse_jumpdests(&self.code));
        bitmap[pos / 8] & (1 << (pos % 8)) != 0
    }
}

/// Scans the code once, marking JUMPDEST positions and skipping the
/// immediate data bytes of PUSH1..PUSH32.
fn analyse_jumpdests(code: &[u8]) -> Vec<u8> {
    let mut bitmap = vec![0u8; (code.len() + 7) / 8];
    let mut i = 0;
    while i < code.len() {
        let op = code[i];
        if op == Opcode::JUMPDEST as u8 {
            bitmap[i / 8] |= 1 << (i % 8);
        } else if (Opcode::PUSH1 as u8..=Opcode::PUSH32 as u8).contains(&op) {
            i += (op - Opcode::PUSH1 as u8) as usize + 1;
        }
        i += 1;
    }
    bitmap
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_code(code: Vec<u8>) -> Contract {
        let mut contract = Contract::new(Address::zero(), Address::zero(), Amount::zero());
        contract.set_call_code(None, H256::zero(), code);
        contract
    }

    #[test]
    fn test_get_op_past_end_is_stop() {
        let contract = frame_with_code(vec![0x01]);
        assert_eq!(contract.get_op(0), 0x01);
        assert_eq!(contract.get_op(1), Opcode::STOP as u8);
        assert_eq!(contract.get_op(u64::MAX), Opcode::STOP as u8);
    }

    #[test]
    fn test_jumpdest_found() {
        // PUSH1 0x03 JUMP JUMPDEST
        let mut contract = frame_with_code(vec![0x60, 0x03, 0x56, 0x5b]);
        assert!(contract.valid_jumpdest(U256::from(3)));
        assert!(!contract.valid_jumpdest(U256::from(2)));
        assert!(!contract.valid_jumpdest(U256::from(4)));
    }

    #[test]
    fn test_jumpdest_inside_push_immediate() {
        // PUSH2 0x5b5b STOP JUMPDEST
        let mut contract = frame_with_code(vec![0x61, 0x5b, 0x5b, 0x00, 0x5b]);
        assert!(!contract.valid_jumpdest(U256::from(1)));
        assert!(!contract.valid_jumpdest(U256::from(2)));
        assert!(contract.valid_jumpdest(U256::from(4)));
    }

    #[test]
    fn test_delegate_relabeling() {
        let parent = Contract::new(
            Address::from_bytes([1; 20]),
            Address::from_bytes([2; 20]),
            Amount::from_u64(99),
        );
        let child = Contract::new(parent.address(), parent.address(), Amount::zero())
            .as_delegate(&parent);
        assert_eq!(child.caller(), Address::from_bytes([1; 20]));
        assert_eq!(child.address(), Address::from_bytes([2; 20]));
        assert_eq!(child.value(), Amount::from_u64(99));
    }
}
