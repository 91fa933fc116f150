use crate::statedb::StateError;
use thiserror::Error;

pub type VmResult<T> = Result<T, VmError>;

/// Errors raised by the virtual machine. Every error halts the current frame,
/// reverts its snapshot and propagates to the caller unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("max call depth exceeded")]
    Depth,

    #[error("insufficient balance for transfer")]
    InsufficientBalance,

    #[error("contract does not exist")]
    ContractNotFound,

    #[error("contract has no code")]
    InvalidContract,

    #[error("contract already exists")]
    ContractExists,

    #[error("contract address collision")]
    ContractAddressCollision,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("stack overflow")]
    StackOverflow,

    #[error("invalid opcode {0:#04x}")]
    InvalidOpcode(u8),

    #[error("invalid jump destination")]
    InvalidJump,

    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,

    #[error("write protection")]
    WriteProtection,

    #[error("max code size exceeded")]
    MaxCodeSizeExceeded,

    #[error("uint64 overflow in memory size")]
    UintOverflow,

    #[error("execution aborted")]
    Aborted,

    /// The REVERT opcode; carries the caller-visible revert payload.
    #[error("execution reverted")]
    ExecutionReverted(Vec<u8>),

    #[error("state error: {0}")]
    State(#[from] StateError),
}
