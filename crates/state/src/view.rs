use crate::journal::JournaledState;
use helios_evm::log::Log;
use helios_evm::statedb::{StateDB, StateError};
use helios_types::{Address, Amount, H256};

/// A read-only adapter over an account state, for executing queries outside
/// of a transaction. Every mutator fails with `NotAllowed`; snapshots are
/// no-ops because nothing can change.
pub struct ViewState<'a> {
    inner: &'a JournaledState,
}

impl<'a> ViewState<'a> {
    pub fn new(inner: &'a JournaledState) -> Self {
        ViewState { inner }
    }
}

impl StateDB for ViewState<'_> {
    fn create_account(&mut self, _addr: Address) -> Result<(), StateError> {
        Err(StateError::NotAllowed)
    }

    fn sub_balance(&mut self, _addr: Address, _value: &Amount) -> Result<(), StateError> {
        Err(StateError::NotAllowed)
    }

    fn add_balance(&mut self, _addr: Address, _value: &Amount) -> Result<(), StateError> {
        Err(StateError::NotAllowed)
    }

    fn get_balance(&self, addr: Address) -> Amount {
        self.inner.get_balance(addr)
    }

    fn get_seq(&self, addr: Address) -> u64 {
        self.inner.get_seq(addr)
    }

    fn add_seq(&mut self, _addr: Address) -> Result<(), StateError> {
        Err(StateError::NotAllowed)
    }

    fn get_code_hash(&self, addr: Address) -> H256 {
        self.inner.get_code_hash(addr)
    }

    fn get_code(&self, addr: Address) -> Vec<u8> {
        self.inner.get_code(addr)
    }

    fn set_code(&mut self, _addr: Address, _code: Vec<u8>) -> Result<(), StateError> {
        Err(StateError::NotAllowed)
    }

    fn get_code_size(&self, addr: Address) -> usize {
        self.inner.get_code_size(addr)
    }

    fn get_state(&self, addr: Address, key: H256) -> H256 {
        self.inner.get_state(addr, key)
    }

    fn set_state(&mut self, _addr: Address, _key: H256, _value: H256) -> Result<(), StateError> {
        Err(StateError::NotAllowed)
    }

    fn suicide(&mut self, _addr: Address) -> Result<bool, StateError> {
        Err(StateError::NotAllowed)
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
        0
    }

    fn revert_to_snapshot(&mut self, _n: usize) {}

    fn commit_snapshot(&mut self, _n: usize) {}

    fn add_log(&mut self, log: Log) {
        // Query execution records nothing; surface the event for operators.
        tracing::debug!(address = %log.address, topics = log.topics.len(), "log from read-only execution");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;

    fn addr(last: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = last;
        Address::from_bytes(bytes)
    }

    #[test]
    fn test_mutators_rejected_uniformly() {
        let mut state = JournaledState::new();
        state.insert_account(addr(1), Account {
            balance: Amount::from_u64(5),
            ..Account::default()
        });

        let mut view = ViewState::new(&state);
        assert_eq!(view.create_account(addr(2)), Err(StateError::NotAllowed));
        assert_eq!(
            view.sub_balance(addr(1), &Amount::from_u64(1)),
            Err(StateError::NotAllowed)
        );
        assert_eq!(
            view.add_balance(addr(1), &Amount::from_u64(1)),
            Err(StateError::NotAllowed)
        );
        assert_eq!(view.add_seq(addr(1)), Err(StateError::NotAllowed));
        assert_eq!(view.set_code(addr(1), vec![0]), Err(StateError::NotAllowed));
        assert_eq!(
            view.set_state(addr(1), H256::zero(), H256::zero()),
            Err(StateError::NotAllowed)
        );
        assert_eq!(view.suicide(addr(1)), Err(StateError::NotAllowed));
    }

    #[test]
    fn test_reads_pass_through() {
        let mut state = JournaledState::new();
        state.insert_account(addr(1), Account {
            balance: Amount::from_u64(5),
            ..Account::default()
        });
        state.set_code(addr(1), vec![0x60, 0x00]).unwrap();

        let mut view = ViewState::new(&state);
        assert_eq!(view.get_balance(addr(1)), Amount::from_u64(5));
        assert_eq!(view.get_code(addr(1)), vec![0x60, 0x00]);
        assert!(view.exist(addr(1)));
        assert!(!view.exist(addr(2)));

        // Snapshots are inert.
        assert_eq!(view.snapshot(), 0);
        view.revert_to_snapshot(0);
        view.commit_snapshot(0);
    }
}
