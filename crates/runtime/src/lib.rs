//! The host transaction boundary around the contract machine: envelope
//! shapes, sequence and fee handling, and the crash-safe wrapper that turns
//! any panic escaping the machine into an error while rolling back the outer
//! snapshot.

pub mod envelope;
pub mod processor;

pub use envelope::{CallContract, CreateContract};
pub use processor::{contract_address, BlockEnv, TxProcessor};

use helios_evm::{StateDB, StateError, VmError};
use helios_types::{Address, Amount};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("invalid sequence")]
    InvalidSequence,

    #[error("exist address")]
    ExistAddress,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("not allowed")]
    NotAllowed,

    #[error("virtual machine panic")]
    VirtualMachinePanic,

    #[error(transparent)]
    Vm(#[from] VmError),

    #[error("state error: {0}")]
    State(#[from] StateError),
}

/// Returns whether the account holds enough balance to transfer `value`.
pub fn can_transfer(db: &dyn StateDB, addr: Address, value: &Amount) -> bool {
    !db.get_balance(addr).less(value)
}

/// Subtracts `value` from the sender and adds it to the recipient.
pub fn transfer(
    db: &mut dyn StateDB,
    sender: Address,
    recipient: Address,
    value: &Amount,
) -> Result<(), StateError> {
    if !value.is_zero() {
        db.sub_balance(sender, value)?;
        db.add_balance(recipient, value)?;
    }
    Ok(())
}
