use crate::envelope::{CallContract, CreateContract};
use crate::{can_transfer, transfer, RuntimeError};
use helios_evm::{create_address, Config, Context, Evm, GetHashFn, LogConfig, StateDB, StructLogger};
use helios_types::{Address, Amount, H256, U256};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Block-level inputs to every execution in the block.
#[derive(Debug, Clone)]
pub struct BlockEnv {
    pub coinbase: Address,
    pub number: U256,
    pub time: U256,
    pub difficulty: U256,
}

impl Default for BlockEnv {
    fn default() -> Self {
        BlockEnv {
            coinbase: Address::zero(),
            number: U256::zero(),
            time: U256::zero(),
            difficulty: U256::zero(),
        }
    }
}

/// The address a `CreateContract` envelope deploys to.
pub fn contract_address(tx: &CreateContract) -> Address {
    create_address(tx.from, tx.seq)
}

/// Executes contract transactions against a state backend. Each execution
/// validates the sender sequence, debits the fee, runs the machine under an
/// outer snapshot, and contains any panic escaping the run.
pub struct TxProcessor {
    block: BlockEnv,
    get_hash: GetHashFn,
    allowed_creators: Option<HashSet<Address>>,
}

impl TxProcessor {
    pub fn new(block: BlockEnv) -> Self {
        TxProcessor {
            block,
            get_hash: Arc::new(|_| H256::zero()),
            allowed_creators: None,
        }
    }

    /// Supplies the block-hash source for the BLOCKHASH opcode.
    pub fn with_hash_source(mut self, get_hash: GetHashFn) -> Self {
        self.get_hash = get_hash;
        self
    }

    /// Restricts contract creation to the given senders.
    pub fn with_allowed_creators(mut self, creators: HashSet<Address>) -> Self {
        self.allowed_creators = Some(creators);
        self
    }

    fn context(&self, origin: Address) -> Context {
        Context {
            can_transfer,
            transfer,
            get_hash: self.get_hash.clone(),
            origin,
            coinbase: self.block.coinbase,
            block_number: self.block.number,
            time: self.block.time,
            difficulty: self.block.difficulty,
        }
    }

    fn config() -> Config {
        Config {
            tracer: Some(Box::new(StructLogger::new(LogConfig::default()))),
            ..Config::default()
        }
    }

    /// Deploys the contract described by `tx`, returning the deployed code.
    pub fn execute_create<S: StateDB>(
        &self,
        state: &mut S,
        fee: &Amount,
        tx: &CreateContract,
    ) -> Result<Vec<u8>, RuntimeError> {
        let snapshot = state.snapshot();
        let result =
            catch_unwind(AssertUnwindSafe(|| self.create_in_snapshot(&mut *state, fee, tx)));
        let result = result.unwrap_or_else(|_| {
            tracing::warn!(from = %tx.from, seq = tx.seq, "panic during contract creation");
            Err(RuntimeError::VirtualMachinePanic)
        });
        match &result {
            Ok(_) => state.commit_snapshot(snapshot),
            Err(_) => state.revert_to_snapshot(snapshot),
        }
        result
    }

    fn create_in_snapshot<S: StateDB>(
        &self,
        state: &mut S,
        fee: &Amount,
        tx: &CreateContract,
    ) -> Result<Vec<u8>, RuntimeError> {
        if let Some(allowed) = &self.allowed_creators {
            if !allowed.contains(&tx.from) {
                return Err(RuntimeError::NotAllowed);
            }
        }
        if tx.seq != state.get_seq(tx.from) + 1 {
            return Err(RuntimeError::InvalidSequence);
        }
        state.add_seq(tx.from)?;

        if state.get_balance(tx.from).less(fee) {
            return Err(RuntimeError::InsufficientBalance);
        }
        state.sub_balance(tx.from, fee)?;

        let contract_addr = contract_address(tx);
        if state.exist(contract_addr) {
            return Err(RuntimeError::ExistAddress);
        }

        let mut init_code = tx.code.to_vec();
        init_code.extend_from_slice(&tx.params);

        let mut evm = Evm::new(self.context(tx.from), state, Self::config());
        Ok(evm.create(tx.from, contract_addr, init_code, Amount::zero())?)
    }

    /// Invokes a contract method, returning the call output.
    pub fn execute_call<S: StateDB>(
        &self,
        state: &mut S,
        fee: &Amount,
        tx: &CallContract,
    ) -> Result<Vec<u8>, RuntimeError> {
        let snapshot = state.snapshot();
        let result =
            catch_unwind(AssertUnwindSafe(|| self.call_in_snapshot(&mut *state, fee, tx)));
        let result = result.unwrap_or_else(|_| {
            tracing::warn!(from = %tx.from, to = %tx.to, seq = tx.seq, "panic during contract call");
            Err(RuntimeError::VirtualMachinePanic)
        });
        match &result {
            Ok(_) => state.commit_snapshot(snapshot),
            Err(_) => state.revert_to_snapshot(snapshot),
        }
        result
    }

    fn call_in_snapshot<S: StateDB>(
        &self,
        state: &mut S,
        fee: &Amount,
        tx: &CallContract,
    ) -> Result<Vec<u8>, RuntimeError> {
        if tx.seq != state.get_seq(tx.from) + 1 {
            return Err(RuntimeError::InvalidSequence);
        }
        state.add_seq(tx.from)?;

        if state.get_balance(tx.from).less(fee) {
            return Err(RuntimeError::InsufficientBalance);
        }
        state.sub_balance(tx.from, fee)?;

        let mut input = tx.method.to_vec();
        input.extend_from_slice(&tx.params);

        let mut evm = Evm::new(self.context(tx.from), state, Self::config());
        Ok(evm.call(tx.from, tx.to, &input, tx.amount)?)
    }
}
