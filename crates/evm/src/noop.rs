use crate::log::Log;
use crate::statedb::{StateDB, StateError};
use helios_types::{Address, Amount, H256};

/// A transfer predicate that always allows.
pub fn noop_can_transfer(_db: &dyn StateDB, _from: Address, _value: &Amount) -> bool {
    true
}

/// A transfer that moves nothing.
pub fn noop_transfer(
    _db: &mut dyn StateDB,
    _from: Address,
    _to: Address,
    _value: &Amount,
) -> Result<(), StateError> {
    Ok(())
}

/// A state backend that stores nothing and answers every query with the
/// empty value. Useful for dry runs and static analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStateDB;

impl StateDB for NoopStateDB {
    fn create_account(&mut self, _addr: Address) -> Result<(), StateError> {
        Ok(())
    }

    fn sub_balance(&mut self, _addr: Address, _value: &Amount) -> Result<(), StateError> {
        Ok(())
    }

    fn add_balance(&mut self, _addr: Address, _value: &Amount) -> Result<(), StateError> {
        Ok(())
    }

    fn get_balance(&self, _addr: Address) -> Amount {
        Amount::zero()
    }

    fn get_seq(&self, _addr: Address) -> u64 {
        0
    }

    fn add_seq(&mut self, _addr: Address) -> Result<(), StateError> {
        Ok(())
    }

    fn get_code_hash(&self, _addr: Address) -> H256 {
        H256::zero()
    }

    fn get_code(&self, _addr: Address) -> Vec<u8> {
        Vec::new()
    }

    fn set_code(&mut self, _addr: Address, _code: Vec<u8>) -> Result<(), StateError> {
        Ok(())
    }

    fn get_code_size(&self, _addr: Address) -> usize {
        0
    }

    fn get_state(&self, _addr: Address, _key: H256) -> H256 {
        H256::zero()
    }

    fn set_state(&mut self, _addr: Address, _key: H256, _value: H256) -> Result<(), StateError> {
        Ok(())
    }

    fn suicide(&mut self, _addr: Address) -> Result<bool, StateError> {
        Ok(false)
    }

    fn has_suicided(&self, _addr: Address) -> bool {
        false
    }

    fn exist(&self, _addr: Address) -> bool {
        false
    }

    fn empty(&self, _addr: Address) -> bool {
        true
    }

    fn snapshot(&mut self) -> usize {
        0
    }

    fn revert_to_snapshot(&mut self, _n: usize) {}

    fn commit_snapshot(&mut self, _n: usize) {}

    fn add_log(&mut self, _log: Log) {}
}
