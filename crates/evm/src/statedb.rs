use crate::log::Log;
use helios_types::{Address, Amount, H256};
use thiserror::Error;

/// Errors surfaced by a state backend. The machine treats any of these as a
/// fatal execution error for the current frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("operation not allowed on a read-only state")]
    NotAllowed,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("account does not exist")]
    AccountNotFound,

    #[error("account already exists")]
    AccountExists,

    #[error("write to reserved storage key {0:?}")]
    ReservedKey(H256),
}

/// Full state access as consumed by the virtual machine: account lifecycle,
/// balance arithmetic, code, per-contract storage, the dead flag, stacked
/// snapshots and the log sink.
///
/// Snapshots nest in stack order. `revert_to_snapshot` of a token undoes every
/// change recorded since that snapshot was taken, including changes under
/// inner snapshots that were committed in the meantime; tokens that were
/// already closed are ignored.
pub trait StateDB {
    fn create_account(&mut self, addr: Address) -> Result<(), StateError>;

    fn sub_balance(&mut self, addr: Address, value: &Amount) -> Result<(), StateError>;
    fn add_balance(&mut self, addr: Address, value: &Amount) -> Result<(), StateError>;
    fn get_balance(&self, addr: Address) -> Amount;

    fn get_seq(&self, addr: Address) -> u64;
    fn add_seq(&mut self, addr: Address) -> Result<(), StateError>;

    fn get_code_hash(&self, addr: Address) -> H256;
    fn get_code(&self, addr: Address) -> Vec<u8>;
    fn set_code(&mut self, addr: Address, code: Vec<u8>) -> Result<(), StateError>;
    fn get_code_size(&self, addr: Address) -> usize;

    fn get_state(&self, addr: Address, key: H256) -> H256;
    fn set_state(&mut self, addr: Address, key: H256, value: H256) -> Result<(), StateError>;

    fn suicide(&mut self, addr: Address) -> Result<bool, StateError>;
    fn has_suicided(&self, addr: Address) -> bool;

    /// Reports whether the given account exists in state. Notably this also
    /// returns true for suicided accounts.
    fn exist(&self, addr: Address) -> bool;
    /// An account is empty when its sequence, balance and code size are all
    /// zero.
    fn empty(&self, addr: Address) -> bool;

    fn snapshot(&mut self) -> usize;
    fn revert_to_snapshot(&mut self, n: usize);
    fn commit_snapshot(&mut self, n: usize);

    fn add_log(&mut self, log: Log);
}
