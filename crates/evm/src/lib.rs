//! A deterministic, stack-based contract virtual machine over 256-bit words.
//!
//! The machine interprets standard contract bytecode through the
//! Constantinople instruction layer, routes every observable side effect
//! through a pluggable [`StateDB`] backend, and isolates nested invocations
//! with stacked state snapshots. Gas is not metered on this chain; execution
//! is bounded only by the stack, memory and call-depth limits.

pub mod contract;
pub mod error;
pub mod evm;
mod instructions;
pub mod interpreter;
mod jump_table;
pub mod log;
pub mod memory;
pub mod noop;
pub mod opcodes;
pub mod params;
pub mod precompiles;
pub mod stack;
pub mod statedb;
pub mod tracer;


pub use contract::Contract;
pub use error::{VmError, VmResult};
pub use evm::{create_address, AbortHandle, CanTransferFn, Context, Evm, GetHashFn, TransferFn};
pub use interpreter::Config;
pub use jump_table::Fork;
pub use log::Log;
pub use opcodes::Opcode;
pub use statedb::{StateDB, StateError};
pub use tracer::{LogConfig, StructLog, StructLogger, Tracer};
