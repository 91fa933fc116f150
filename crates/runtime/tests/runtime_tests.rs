use helios_evm::log::Log;
use helios_evm::{StateDB, StateError, VmError};
use helios_runtime::{contract_address, BlockEnv, CallContract, CreateContract, RuntimeError, TxProcessor};
use helios_state::{Account, JournaledState};
use helios_types::{Address, Amount, Bytes, H256, U256, WordExt};
use std::collections::HashSet;

fn addr(last: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = last;
    Address::from_bytes(bytes)
}

const SENDER: u8 = 0xAA;

fn funded_state(balance: u64) -> JournaledState {
    let mut state = JournaledState::new();
    state.insert_account(
        addr(SENDER),
        Account {
            balance: Amount::from_u64(balance),
            ..Account::default()
        },
    );
    state
}

fn processor() -> TxProcessor {
    TxProcessor::new(BlockEnv {
        number: U256::from(100),
        time: U256::from(1_700_000_000u64),
        ..BlockEnv::default()
    })
}

/// Init code for a contract whose runtime returns the 32-byte word 9:
/// PUSH1 5 PUSH1 4 ADD PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN.
fn adder_init_code() -> Bytes {
    Bytes::from(vec![
        0x60, 0x05, 0x60, 0x04, 0x01, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3,
    ])
}

fn create_tx(seq: u64) -> CreateContract {
    CreateContract {
        seq,
        from: addr(SENDER),
        code: adder_init_code(),
        params: Bytes::new(),
    }
}

#[test]
fn test_create_then_call() {
    let mut state = funded_state(100);
    let processor = processor();

    let tx = create_tx(1);
    let deployed = processor
        .execute_create(&mut state, &Amount::from_u64(10), &tx)
        .unwrap();
    assert_eq!(deployed, U256::from(9).to_be_bytes());

    let contract = contract_address(&tx);
    assert!(state.exist(contract));
    assert_eq!(state.get_code(contract), deployed);
    assert_eq!(state.get_seq(addr(SENDER)), 1);
    assert_eq!(state.get_balance(addr(SENDER)), Amount::from_u64(90));

    let call = CallContract {
        seq: 2,
        from: addr(SENDER),
        to: contract,
        amount: Amount::zero(),
        method: Bytes::new(),
        params: Bytes::new(),
    };
    let output = processor
        .execute_call(&mut state, &Amount::from_u64(10), &call)
        .unwrap();
    assert_eq!(output, U256::from(9).to_be_bytes());
    assert_eq!(state.get_seq(addr(SENDER)), 2);
    assert_eq!(state.get_balance(addr(SENDER)), Amount::from_u64(80));
    assert_eq!(state.open_snapshots(), 0);
}

#[test]
fn test_sequence_validation() {
    let mut state = funded_state(100);
    let processor = processor();

    // Stale and skipped sequences are both rejected, and nothing persists.
    for seq in [0, 2, 5] {
        let result = processor.execute_create(&mut state, &Amount::zero(), &create_tx(seq));
        assert_eq!(result, Err(RuntimeError::InvalidSequence));
    }
    assert_eq!(state.get_seq(addr(SENDER)), 0);
    assert_eq!(state.get_balance(addr(SENDER)), Amount::from_u64(100));
}

#[test]
fn test_fee_exceeding_balance() {
    let mut state = funded_state(5);
    let result = processor().execute_create(&mut state, &Amount::from_u64(10), &create_tx(1));
    assert_eq!(result, Err(RuntimeError::InsufficientBalance));
    // The seq bump inside the failed transaction was rolled back.
    assert_eq!(state.get_seq(addr(SENDER)), 0);
}

#[test]
fn test_create_collision_with_existing_address() {
    let mut state = funded_state(100);
    let tx = create_tx(1);
    state.insert_account(contract_address(&tx), Account::default());

    let result = processor().execute_create(&mut state, &Amount::zero(), &tx);
    assert_eq!(result, Err(RuntimeError::ExistAddress));
}

#[test]
fn test_allowed_creators() {
    let mut state = funded_state(100);
    let processor = processor().with_allowed_creators(HashSet::from([addr(0xBB)]));

    let result = processor.execute_create(&mut state, &Amount::zero(), &create_tx(1));
    assert_eq!(result, Err(RuntimeError::NotAllowed));
}

#[test]
fn test_call_to_missing_contract() {
    let mut state = funded_state(100);
    let call = CallContract {
        seq: 1,
        from: addr(SENDER),
        to: addr(0xC0),
        amount: Amount::zero(),
        method: Bytes::new(),
        params: Bytes::new(),
    };
    let result = processor().execute_call(&mut state, &Amount::zero(), &call);
    assert_eq!(result, Err(RuntimeError::Vm(VmError::ContractNotFound)));
    assert_eq!(state.get_seq(addr(SENDER)), 0);
}

#[test]
fn test_call_transfers_amount() {
    let mut state = funded_state(100);
    let processor = processor();

    // Deploy a contract that just stops.
    let tx = CreateContract {
        seq: 1,
        from: addr(SENDER),
        // MSTORE8(0, 0) then RETURN(0, 1): the deployed runtime is a lone STOP.
        code: Bytes::from(vec![0x60, 0x00, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xf3]),
        params: Bytes::new(),
    };
    processor
        .execute_create(&mut state, &Amount::zero(), &tx)
        .unwrap();
    let contract = contract_address(&tx);

    let call = CallContract {
        seq: 2,
        from: addr(SENDER),
        to: contract,
        amount: Amount::from_u64(30),
        method: Bytes::new(),
        params: Bytes::new(),
    };
    processor
        .execute_call(&mut state, &Amount::zero(), &call)
        .unwrap();
    assert_eq!(state.get_balance(contract), Amount::from_u64(30));
    assert_eq!(state.get_balance(addr(SENDER)), Amount::from_u64(70));
}

#[test]
fn test_revert_payload_surfaces_and_rolls_back() {
    let mut state = funded_state(100);
    let processor = processor();

    // Runtime: PUSH1 42 PUSH1 0 MSTORE PUSH1 32 PUSH1 0 REVERT. The init
    // code below copies that runtime out of its own tail.
    let runtime = [0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xfd];
    // CODECOPY(0, 12, len) then RETURN(0, len); init prefix is 12 bytes.
    let mut init = vec![
        0x60, runtime.len() as u8, // PUSH1 len
        0x60, 0x0c, // PUSH1 12
        0x60, 0x00, // PUSH1 0
        0x39, // CODECOPY
        0x60, runtime.len() as u8, // PUSH1 len
        0x60, 0x00, // PUSH1 0
        0xf3, // RETURN
    ];
    init.extend_from_slice(&runtime);

    let tx = CreateContract {
        seq: 1,
        from: addr(SENDER),
        code: Bytes::from(init),
        params: Bytes::new(),
    };
    processor
        .execute_create(&mut state, &Amount::zero(), &tx)
        .unwrap();
    let contract = contract_address(&tx);
    assert_eq!(state.get_code(contract), runtime);

    let call = CallContract {
        seq: 2,
        from: addr(SENDER),
        to: contract,
        amount: Amount::zero(),
        method: Bytes::new(),
        params: Bytes::new(),
    };
    let result = processor.execute_call(&mut state, &Amount::zero(), &call);
    assert_eq!(
        result,
        Err(RuntimeError::Vm(VmError::ExecutionReverted(
            U256::from(42).to_be_bytes().to_vec()
        )))
    );
    // The failed transaction left no trace, including its seq bump.
    assert_eq!(state.get_seq(addr(SENDER)), 1);
}

// ---------------------------------------------------------------------------
// Panic containment

/// Delegates to a journaled state but panics on storage writes, standing in
/// for a backend with an internal invariant failure.
struct PanickyState {
    inner: JournaledState,
}

impl StateDB for PanickyState {
    fn create_account(&mut self, addr: Address) -> Result<(), StateError> {
        self.inner.create_account(addr)
    }
    fn sub_balance(&mut self, addr: Address, value: &Amount) -> Result<(), StateError> {
        self.inner.sub_balance(addr, value)
    }
    fn add_balance(&mut self, addr: Address, value: &Amount) -> Result<(), StateError> {
        self.inner.add_balance(addr, value)
    }
    fn get_balance(&self, addr: Address) -> Amount {
        self.inner.get_balance(addr)
    }
    fn get_seq(&self, addr: Address) -> u64 {
        self.inner.get_seq(addr)
    }
    fn add_seq(&mut self, addr: Address) -> Result<(), StateError> {
        self.inner.add_seq(addr)
    }
    fn get_code_hash(&self, addr: Address) -> H256 {
        self.inner.get_code_hash(addr)
    }
    fn get_code(&self, addr: Address) -> Vec<u8> {
        self.inner.get_code(addr)
    }
    fn set_code(&mut self, addr: Address, code: Vec<u8>) -> Result<(), StateError> {
        self.inner.set_code(addr, code)
    }
    fn get_code_size(&self, addr: Address) -> usize {
        self.inner.get_code_size(addr)
    }
    fn get_state(&self, addr: Address, key: H256) -> H256 {
        self.inner.get_state(addr, key)
    }
    fn set_state(&mut self, _addr: Address, _key: H256, _value: H256) -> Result<(), StateError> {
        panic!("storage backend failure");
    }
    fn suicide(&mut self, addr: Address) -> Result<bool, StateError> {
        self.inner.suicide(addr)
    }
    fn has_suicided(&self, addr: Address) -> bool {
        self.inner.has_suicided(addr)
    }
    fn exist(&self, addr: Address) -> bool {
        self.inner.exist(addr)
    }
    fn empty(&self, addr: Address) -> bool {
        self.inner.empty(addr)
    }
    fn snapshot(&mut self) -> usize {
        self.inner.snapshot()
    }
    fn revert_to_snapshot(&mut self, n: usize) {
        self.inner.revert_to_snapshot(n)
    }
    fn commit_snapshot(&mut self, n: usize) {
        self.inner.commit_snapshot(n)
    }
    fn add_log(&mut self, log: Log) {
        self.inner.add_log(log)
    }
}

#[test]
fn test_panic_maps_to_error_and_reverts() {
    let mut state = PanickyState {
        inner: funded_state(100),
    };

    // Init code that stores before returning: PUSH1 1 PUSH1 1 SSTORE STOP.
    let tx = CreateContract {
        seq: 1,
        from: addr(SENDER),
        code: Bytes::from(vec![0x60, 0x01, 0x60, 0x01, 0x55, 0x00]),
        params: Bytes::new(),
    };
    let result = processor().execute_create(&mut state, &Amount::from_u64(10), &tx);
    assert_eq!(result, Err(RuntimeError::VirtualMachinePanic));

    // The outer snapshot rolled back the seq bump and the fee debit.
    assert_eq!(state.inner.get_seq(addr(SENDER)), 0);
    assert_eq!(state.inner.get_balance(addr(SENDER)), Amount::from_u64(100));
    assert_eq!(state.inner.open_snapshots(), 0);
}
