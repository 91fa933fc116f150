use crate::contract::Contract;
use crate::error::{VmError, VmResult};
use crate::interpreter::Config;
use crate::jump_table::JumpTable;
use crate::params::{CALL_CREATE_DEPTH, MAX_CODE_SIZE};
use crate::precompiles;
use crate::statedb::{StateDB, StateError};
use helios_types::{Address, Amount, H256, U256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Returns whether the account holds enough balance to transfer `value`.
pub type CanTransferFn = fn(&dyn StateDB, Address, &Amount) -> bool;

/// Moves `value` between two accounts.
pub type TransferFn = fn(&mut dyn StateDB, Address, Address, &Amount) -> Result<(), StateError>;

/// Returns the hash of the n-th block; used by the BLOCKHASH opcode.
pub type GetHashFn = Arc<dyn Fn(u64) -> H256>;

/// Auxiliary blockchain information supplied by the host. Immutable for the
/// duration of a top-level call.
#[derive(Clone)]
pub struct Context {
    pub can_transfer: CanTransferFn,
    pub transfer: TransferFn,
    pub get_hash: GetHashFn,

    pub origin: Address,

    pub coinbase: Address,
    pub block_number: U256,
    pub time: U256,
    pub difficulty: U256,
}

/// A handle that cancels a running machine. May be used concurrently and
/// triggered multiple times.
#[derive(Clone)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// The virtual machine. It owns a dispatch table frozen at construction,
/// runs contracts against the given state, and is discarded after a single
/// top-level call; it is not thread safe and must never be reused.
///
/// Any error returned from the entry points has already reverted the state
/// changes of the failed frame.
pub struct Evm<'a> {
    pub context: Context,
    pub state: &'a mut dyn StateDB,
    pub(crate) config: Config,
    pub(crate) depth: usize,
    pub(crate) abort: Arc<AtomicBool>,
    pub(crate) table: JumpTable,
    pub(crate) return_data: Vec<u8>,
    pub(crate) read_only: bool,
}

/// Derives the address of a contract created by `creator` at sequence `seq`.
pub fn create_address(creator: Address, seq: u64) -> Address {
    let hash = helios_crypto::keccak256_concat(&[creator.as_bytes(), &seq.to_be_bytes()]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}

impl<'a> Evm<'a> {
    pub fn new(context: Context, state: &'a mut dyn StateDB, config: Config) -> Self {
        let table = JumpTable::for_fork(config.fork);
        Evm {
            context,
            state,
            config,
            depth: 0,
            abort: Arc::new(AtomicBool::new(false)),
            table,
            return_data: Vec::new(),
            read_only: false,
        }
    }

    /// A cancellation handle for this machine; the interpreter checks it
    /// before every opcode dispatch.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(self.abort.clone())
    }

    pub fn tracer(&self) -> Option<&dyn crate::tracer::Tracer> {
        self.config.tracer.as_deref()
    }

    pub fn into_tracer(self) -> Option<Box<dyn crate::tracer::Tracer>> {
        self.config.tracer
    }

    /// Runs the contract, dispatching to a precompile when the frame's code
    /// address maps to one.
    fn run(&mut self, contract: &mut Contract, input: &[u8]) -> VmResult<Vec<u8>> {
        if let Some(code_addr) = contract.code_address() {
            if let Some(precompile) = precompiles::byzantium_precompile(&code_addr) {
                return precompile.run(input);
            }
        }
        self.run_interpreter(contract, input)
    }

    /// Executes the contract at `addr` with the given input, transferring
    /// `value` from the caller first. State changes are committed on success
    /// and reverted on any error.
    pub fn call(
        &mut self,
        caller: Address,
        addr: Address,
        input: &[u8],
        value: Amount,
    ) -> VmResult<Vec<u8>> {
        if self.config.no_recursion && self.depth > 0 {
            return Ok(Vec::new());
        }
        if self.depth > CALL_CREATE_DEPTH {
            return Err(VmError::Depth);
        }
        if !(self.context.can_transfer)(&*self.state, caller, &value) {
            return Err(VmError::InsufficientBalance);
        }

        let snapshot = self.state.snapshot();
        let result = self.call_inner(caller, addr, input, value);
        self.close_snapshot(snapshot, &result);
        result
    }

    fn call_inner(
        &mut self,
        caller: Address,
        addr: Address,
        input: &[u8],
        value: Amount,
    ) -> VmResult<Vec<u8>> {
        if !self.state.exist(addr) {
            return Err(VmError::ContractNotFound);
        }
        (self.context.transfer)(&mut *self.state, caller, addr, &value)?;
        let code = self.state.get_code(addr);
        if code.is_empty() {
            return Err(VmError::InvalidContract);
        }

        let mut contract = Contract::new(caller, addr, value);
        contract.set_call_code(Some(addr), self.state.get_code_hash(addr), code);

        let start = Instant::now();
        let top_level = self.config.debug && self.depth == 0;
        if top_level {
            if let Some(tracer) = self.config.tracer.as_mut() {
                tracer.capture_start(caller, addr, false, input, &contract.value());
            }
        }

        let result = self.run(&mut contract, input);

        if top_level {
            if let Some(tracer) = self.config.tracer.as_mut() {
                tracer.capture_end(
                    result.as_deref().unwrap_or(&[]),
                    start.elapsed(),
                    result.as_ref().err(),
                );
            }
        }
        result
    }

    /// Executes the code stored at `addr` in the caller's own context: the
    /// frame's self address stays the caller, so all state effects land on
    /// the calling account.
    pub fn call_code(
        &mut self,
        caller: Address,
        addr: Address,
        input: &[u8],
        value: Amount,
    ) -> VmResult<Vec<u8>> {
        if self.config.no_recursion && self.depth > 0 {
            return Ok(Vec::new());
        }
        if self.depth > CALL_CREATE_DEPTH {
            return Err(VmError::Depth);
        }
        if !(self.context.can_transfer)(&*self.state, caller, &value) {
            return Err(VmError::InsufficientBalance);
        }

        let snapshot = self.state.snapshot();
        let mut contract = Contract::new(caller, caller, value);
        contract.set_call_code(
            Some(addr),
            self.state.get_code_hash(addr),
            self.state.get_code(addr),
        );
        let result = self.run(&mut contract, input);
        self.close_snapshot(snapshot, &result);
        result
    }

    /// Like `call_code`, but additionally inherits the caller's caller and
    /// value, as if the loaded code were part of the calling contract.
    pub fn delegate_call(
        &mut self,
        parent: &Contract,
        addr: Address,
        input: &[u8],
    ) -> VmResult<Vec<u8>> {
        if self.config.no_recursion && self.depth > 0 {
            return Ok(Vec::new());
        }
        if self.depth > CALL_CREATE_DEPTH {
            return Err(VmError::Depth);
        }

        let snapshot = self.state.snapshot();
        let mut contract =
            Contract::new(parent.address(), parent.address(), Amount::zero()).as_delegate(parent);
        contract.set_call_code(
            Some(addr),
            self.state.get_code_hash(addr),
            self.state.get_code(addr),
        );
        let result = self.run(&mut contract, input);
        self.close_snapshot(snapshot, &result);
        result
    }

    /// Executes the contract at `addr` while disallowing every state
    /// modification; offending opcodes fail with `WriteProtection`.
    pub fn static_call(
        &mut self,
        caller: Address,
        addr: Address,
        input: &[u8],
    ) -> VmResult<Vec<u8>> {
        if self.config.no_recursion && self.depth > 0 {
            return Ok(Vec::new());
        }
        if self.depth > CALL_CREATE_DEPTH {
            return Err(VmError::Depth);
        }

        // The read-only flag stays set for all child frames.
        let was_read_only = self.read_only;
        self.read_only = true;

        let snapshot = self.state.snapshot();
        let mut contract = Contract::new(caller, addr, Amount::zero());
        contract.set_call_code(
            Some(addr),
            self.state.get_code_hash(addr),
            self.state.get_code(addr),
        );
        let result = self.run(&mut contract, input);
        self.close_snapshot(snapshot, &result);

        self.read_only = was_read_only;
        result
    }

    /// Creates a new contract at `contract_addr`, running `code` as the
    /// deployment code and installing its returned bytes as the contract
    /// body.
    pub fn create(
        &mut self,
        caller: Address,
        contract_addr: Address,
        code: Vec<u8>,
        value: Amount,
    ) -> VmResult<Vec<u8>> {
        if self.depth > CALL_CREATE_DEPTH {
            return Err(VmError::Depth);
        }
        if !(self.context.can_transfer)(&*self.state, caller, &value) {
            return Err(VmError::InsufficientBalance);
        }
        if self.state.exist(contract_addr) {
            return Err(VmError::ContractExists);
        }
        let contract_hash = self.state.get_code_hash(contract_addr);
        let empty_code_hash = helios_crypto::keccak256(&[]);
        if self.state.get_seq(contract_addr) != 0
            || (contract_hash != H256::zero() && contract_hash != empty_code_hash)
        {
            tracing::debug!(
                seq = self.state.get_seq(contract_addr),
                hash = %contract_hash,
                "contract address collision"
            );
            return Err(VmError::ContractAddressCollision);
        }
        if self.config.no_recursion && self.depth > 0 {
            return Ok(Vec::new());
        }

        let snapshot = self.state.snapshot();
        let result = self.create_inner(caller, contract_addr, code, value);
        self.close_snapshot(snapshot, &result);
        result
    }

    fn create_inner(
        &mut self,
        caller: Address,
        contract_addr: Address,
        code: Vec<u8>,
        value: Amount,
    ) -> VmResult<Vec<u8>> {
        self.state.create_account(contract_addr)?;
        self.state.add_seq(contract_addr)?;
        (self.context.transfer)(&mut *self.state, caller, contract_addr, &value)?;

        let code_hash = helios_crypto::keccak256(&code);
        let mut contract = Contract::new(caller, contract_addr, value);
        contract.set_call_code(Some(contract_addr), code_hash, code);

        let start = Instant::now();
        let top_level = self.config.debug && self.depth == 0;
        if top_level {
            if let Some(tracer) = self.config.tracer.as_mut() {
                tracer.capture_start(caller, contract_addr, true, contract.code(), &value);
            }
        }

        let mut result = self.run(&mut contract, &[]);

        if let Ok(ret) = &result {
            if ret.len() > MAX_CODE_SIZE {
                result = Err(VmError::MaxCodeSizeExceeded);
            } else if let Err(err) = self.state.set_code(contract_addr, ret.clone()) {
                result = Err(err.into());
            }
        }

        if top_level {
            if let Some(tracer) = self.config.tracer.as_mut() {
                tracer.capture_end(
                    result.as_deref().unwrap_or(&[]),
                    start.elapsed(),
                    result.as_ref().err(),
                );
            }
        }
        result
    }

    fn close_snapshot<T>(&mut self, snapshot: usize, result: &VmResult<T>) {
        match result {
            Ok(_) => self.state.commit_snapshot(snapshot),
            Err(_) => self.state.revert_to_snapshot(snapshot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_address_is_deterministic() {
        let creator = Address::from_bytes([7; 20]);
        assert_eq!(create_address(creator, 1), create_address(creator, 1));
        assert_ne!(create_address(creator, 1), create_address(creator, 2));
        assert_ne!(
            create_address(creator, 1),
            create_address(Address::from_bytes([8; 20]), 1)
        );
    }
}
