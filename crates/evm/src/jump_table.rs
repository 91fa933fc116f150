use crate::contract::Contract;
use crate::error::{VmError, VmResult};
use crate::evm::Evm;
use crate::instructions::*;
use crate::memory::Memory;
use crate::opcodes::Opcode;
use crate::stack::Stack;
use helios_types::U256;

/// Executes one opcode. A non-empty byte return feeds RETURN/REVERT payloads
/// and sub-call outputs back to the interpreter loop.
pub(crate) type ExecutionFn = fn(
    pc: &mut u64,
    evm: &mut Evm<'_>,
    contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> VmResult<Option<Vec<u8>>>;

/// Computes the memory size an operation needs, from its stack arguments.
pub(crate) type MemorySizeFn = fn(&Stack) -> VmResult<U256>;

/// One slot of the instruction table.
#[derive(Clone, Copy)]
pub(crate) struct Operation {
    pub execute: ExecutionFn,
    /// Words consumed from the stack.
    pub pops: usize,
    /// Words left on the stack in their place.
    pub pushes: usize,
    pub memory_size: Option<MemorySizeFn>,
    /// Halts further execution of the frame.
    pub halts: bool,
    /// The executor manages the program counter itself.
    pub jumps: bool,
    /// Modifies state; rejected inside a static call.
    pub writes: bool,
    /// A known opcode of the active instruction set.
    pub valid: bool,
    /// Reverts the frame's state changes (implicitly halts).
    pub reverts: bool,
    /// Sets the frame's return-data buffer from the executor's result.
    pub returns: bool,
}

impl Operation {
    const INVALID: Operation = Operation {
        execute: op_stop,
        pops: 0,
        pushes: 0,
        memory_size: None,
        halts: false,
        jumps: false,
        writes: false,
        valid: false,
        reverts: false,
        returns: false,
    };

    const fn new(execute: ExecutionFn, pops: usize, pushes: usize) -> Operation {
        Operation {
            execute,
            pops,
            pushes,
            memory_size: None,
            halts: false,
            jumps: false,
            writes: false,
            valid: true,
            reverts: false,
            returns: false,
        }
    }
}

/// The instruction-set layers. Each layer extends the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fork {
    Frontier,
    Homestead,
    Byzantium,
    #[default]
    Constantinople,
}

/// The 256-entry dispatch table, frozen at machine construction.
#[derive(Clone)]
pub(crate) struct JumpTable([Operation; 256]);

impl JumpTable {
    pub fn get(&self, byte: u8) -> Operation {
        self.0[byte as usize]
    }

    fn set(&mut self, op: Opcode, operation: Operation) {
        self.0[op as usize] = operation;
    }

    pub fn for_fork(fork: Fork) -> Self {
        match fork {
            Fork::Frontier => Self::frontier(),
            Fork::Homestead => Self::homestead(),
            Fork::Byzantium => Self::byzantium(),
            Fork::Constantinople => Self::constantinople(),
        }
    }

    /// The Constantinople layer adds the bitwise shift instructions.
    fn constantinople() -> Self {
        let mut table = Self::byzantium();
        table.set(Opcode::SHL, Operation::new(op_shl, 2, 1));
        table.set(Opcode::SHR, Operation::new(op_shr, 2, 1));
        table.set(Opcode::SAR, Operation::new(op_sar, 2, 1));
        table
    }

    /// The Byzantium layer adds static calls, return-data access and REVERT.
    fn byzantium() -> Self {
        let mut table = Self::homestead();
        table.set(
            Opcode::STATICCALL,
            Operation {
                memory_size: Some(memory_static_call),
                returns: true,
                ..Operation::new(op_static_call, 6, 1)
            },
        );
        table.set(
            Opcode::RETURNDATASIZE,
            Operation::new(op_return_data_size, 0, 1),
        );
        table.set(
            Opcode::RETURNDATACOPY,
            Operation {
                memory_size: Some(memory_return_data_copy),
                ..Operation::new(op_return_data_copy, 3, 0)
            },
        );
        table.set(
            Opcode::REVERT,
            Operation {
                memory_size: Some(memory_revert),
                reverts: true,
                returns: true,
                ..Operation::new(op_revert, 2, 0)
            },
        );
        table
    }

    /// The Homestead layer adds DELEGATECALL.
    fn homestead() -> Self {
        let mut table = Self::frontier();
        table.set(
            Opcode::DELEGATECALL,
            Operation {
                memory_size: Some(memory_delegate_call),
                returns: true,
                ..Operation::new(op_delegate_call, 6, 1)
            },
        );
        table
    }

    fn frontier() -> Self {
        let mut table = JumpTable([Operation::INVALID; 256]);

        table.set(
            Opcode::STOP,
            Operation {
                halts: true,
                ..Operation::new(op_stop, 0, 0)
            },
        );
        table.set(Opcode::ADD, Operation::new(op_add, 2, 1));
        table.set(Opcode::MUL, Operation::new(op_mul, 2, 1));
        table.set(Opcode::SUB, Operation::new(op_sub, 2, 1));
        table.set(Opcode::DIV, Operation::new(op_div, 2, 1));
        table.set(Opcode::SDIV, Operation::new(op_sdiv, 2, 1));
        table.set(Opcode::MOD, Operation::new(op_mod, 2, 1));
        table.set(Opcode::SMOD, Operation::new(op_smod, 2, 1));
        table.set(Opcode::ADDMOD, Operation::new(op_addmod, 3, 1));
        table.set(Opcode::MULMOD, Operation::new(op_mulmod, 3, 1));
        table.set(Opcode::EXP, Operation::new(op_exp, 2, 1));
        table.set(Opcode::SIGNEXTEND, Operation::new(op_sign_extend, 2, 1));

        table.set(Opcode::LT, Operation::new(op_lt, 2, 1));
        table.set(Opcode::GT, Operation::new(op_gt, 2, 1));
        table.set(Opcode::SLT, Operation::new(op_slt, 2, 1));
        table.set(Opcode::SGT, Operation::new(op_sgt, 2, 1));
        table.set(Opcode::EQ, Operation::new(op_eq, 2, 1));
        table.set(Opcode::ISZERO, Operation::new(op_iszero, 1, 1));
        table.set(Opcode::AND, Operation::new(op_and, 2, 1));
        table.set(Opcode::OR, Operation::new(op_or, 2, 1));
        table.set(Opcode::XOR, Operation::new(op_xor, 2, 1));
        table.set(Opcode::NOT, Operation::new(op_not, 1, 1));
        table.set(Opcode::BYTE, Operation::new(op_byte, 2, 1));

        table.set(
            Opcode::SHA3,
            Operation {
                memory_size: Some(memory_sha3),
                ..Operation::new(op_sha3, 2, 1)
            },
        );

        table.set(Opcode::ADDRESS, Operation::new(op_address, 0, 1));
        table.set(Opcode::BALANCE, Operation::new(op_balance, 1, 1));
        table.set(Opcode::ORIGIN, Operation::new(op_origin, 0, 1));
        table.set(Opcode::CALLER, Operation::new(op_caller, 0, 1));
        table.set(Opcode::CALLVALUE, Operation::new(op_call_value, 0, 1));
        table.set(Opcode::CALLDATALOAD, Operation::new(op_call_data_load, 1, 1));
        table.set(Opcode::CALLDATASIZE, Operation::new(op_call_data_size, 0, 1));
        table.set(
            Opcode::CALLDATACOPY,
            Operation {
                memory_size: Some(memory_call_data_copy),
                ..Operation::new(op_call_data_copy, 3, 0)
            },
        );
        table.set(Opcode::CODESIZE, Operation::new(op_code_size, 0, 1));
        table.set(
            Opcode::CODECOPY,
            Operation {
                memory_size: Some(memory_code_copy),
                ..Operation::new(op_code_copy, 3, 0)
            },
        );
        table.set(Opcode::GASPRICE, Operation::new(op_gasprice, 0, 1));
        table.set(Opcode::EXTCODESIZE, Operation::new(op_ext_code_size, 1, 1));
        table.set(
            Opcode::EXTCODECOPY,
            Operation {
                memory_size: Some(memory_ext_code_copy),
                ..Operation::new(op_ext_code_copy, 4, 0)
            },
        );

        table.set(Opcode::BLOCKHASH, Operation::new(op_blockhash, 1, 1));
        table.set(Opcode::COINBASE, Operation::new(op_coinbase, 0, 1));
        table.set(Opcode::TIMESTAMP, Operation::new(op_timestamp, 0, 1));
        table.set(Opcode::NUMBER, Operation::new(op_number, 0, 1));
        table.set(Opcode::DIFFICULTY, Operation::new(op_difficulty, 0, 1));
        table.set(Opcode::GASLIMIT, Operation::new(op_gas_limit, 0, 1));

        table.set(Opcode::POP, Operation::new(op_pop, 1, 0));
        table.set(
            Opcode::MLOAD,
            Operation {
                memory_size: Some(memory_mload),
                ..Operation::new(op_mload, 1, 1)
            },
        );
        table.set(
            Opcode::MSTORE,
            Operation {
                memory_size: Some(memory_mstore),
                ..Operation::new(op_mstore, 2, 0)
            },
        );
        table.set(
            Opcode::MSTORE8,
            Operation {
                memory_size: Some(memory_mstore8),
                ..Operation::new(op_mstore8, 2, 0)
            },
        );
        table.set(Opcode::SLOAD, Operation::new(op_sload, 1, 1));
        table.set(
            Opcode::SSTORE,
            Operation {
                writes: true,
                ..Operation::new(op_sstore, 2, 0)
            },
        );
        table.set(
            Opcode::JUMP,
            Operation {
                jumps: true,
                ..Operation::new(op_jump, 1, 0)
            },
        );
        table.set(
            Opcode::JUMPI,
            Operation {
                jumps: true,
                ..Operation::new(op_jumpi, 2, 0)
            },
        );
        table.set(Opcode::PC, Operation::new(op_pc, 0, 1));
        table.set(Opcode::MSIZE, Operation::new(op_msize, 0, 1));
        table.set(Opcode::GAS, Operation::new(op_gas, 0, 1));
        table.set(Opcode::JUMPDEST, Operation::new(op_jumpdest, 0, 0));

        table.set(Opcode::PUSH1, Operation::new(op_push::<1>, 0, 1));
        table.set(Opcode::PUSH2, Operation::new(op_push::<2>, 0, 1));
        table.set(Opcode::PUSH3, Operation::new(op_push::<3>, 0, 1));
        table.set(Opcode::PUSH4, Operation::new(op_push::<4>, 0, 1));
        table.set(Opcode::PUSH5, Operation::new(op_push::<5>, 0, 1));
        table.set(Opcode::PUSH6, Operation::new(op_push::<6>, 0, 1));
        table.set(Opcode::PUSH7, Operation::new(op_push::<7>, 0, 1));
        table.set(Opcode::PUSH8, Operation::new(op_push::<8>, 0, 1));
        table.set(Opcode::PUSH9, Operation::new(op_push::<9>, 0, 1));
        table.set(Opcode::PUSH10, Operation::new(op_push::<10>, 0, 1));
        table.set(Opcode::PUSH11, Operation::new(op_push::<11>, 0, 1));
        table.set(Opcode::PUSH12, Operation::new(op_push::<12>, 0, 1));
        table.set(Opcode::PUSH13, Operation::new(op_push::<13>, 0, 1));
        table.set(Opcode::PUSH14, Operation::new(op_push::<14>, 0, 1));
        table.set(Opcode::PUSH15, Operation::new(op_push::<15>, 0, 1));
        table.set(Opcode::PUSH16, Operation::new(op_push::<16>, 0, 1));
        table.set(Opcode::PUSH17, Operation::new(op_push::<17>, 0, 1));
        table.set(Opcode::PUSH18, Operation::new(op_push::<18>, 0, 1));
        table.set(Opcode::PUSH19, Operation::new(op_push::<19>, 0, 1));
        table.set(Opcode::PUSH20, Operation::new(op_push::<20>, 0, 1));
        table.set(Opcode::PUSH21, Operation::new(op_push::<21>, 0, 1));
        table.set(Opcode::PUSH22, Operation::new(op_push::<22>, 0, 1));
        table.set(Opcode::PUSH23, Operation::new(op_push::<23>, 0, 1));
        table.set(Opcode::PUSH24, Operation::new(op_push::<24>, 0, 1));
        table.set(Opcode::PUSH25, Operation::new(op_push::<25>, 0, 1));
        table.set(Opcode::PUSH26, Operation::new(op_push::<26>, 0, 1));
        table.set(Opcode::PUSH27, Operation::new(op_push::<27>, 0, 1));
        table.set(Opcode::PUSH28, Operation::new(op_push::<28>, 0, 1));
        table.set(Opcode::PUSH29, Operation::new(op_push::<29>, 0, 1));
        table.set(Opcode::PUSH30, Operation::new(op_push::<30>, 0, 1));
        table.set(Opcode::PUSH31, Operation::new(op_push::<31>, 0, 1));
        table.set(Opcode::PUSH32, Operation::new(op_push::<32>, 0, 1));

        table.set(Opcode::DUP1, Operation::new(op_dup::<1>, 1, 2));
        table.set(Opcode::DUP2, Operation::new(op_dup::<2>, 2, 3));
        table.set(Opcode::DUP3, Operation::new(op_dup::<3>, 3, 4));
        table.set(Opcode::DUP4, Operation::new(op_dup::<4>, 4, 5));
        table.set(Opcode::DUP5, Operation::new(op_dup::<5>, 5, 6));
        table.set(Opcode::DUP6, Operation::new(op_dup::<6>, 6, 7));
        table.set(Opcode::DUP7, Operation::new(op_dup::<7>, 7, 8));
        table.set(Opcode::DUP8, Operation::new(op_dup::<8>, 8, 9));
        table.set(Opcode::DUP9, Operation::new(op_dup::<9>, 9, 10));
        table.set(Opcode::DUP10, Operation::new(op_dup::<10>, 10, 11));
        table.set(Opcode::DUP11, Operation::new(op_dup::<11>, 11, 12));
        table.set(Opcode::DUP12, Operation::new(op_dup::<12>, 12, 13));
        table.set(Opcode::DUP13, Operation::new(op_dup::<13>, 13, 14));
        table.set(Opcode::DUP14, Operation::new(op_dup::<14>, 14, 15));
        table.set(Opcode::DUP15, Operation::new(op_dup::<15>, 15, 16));
        table.set(Opcode::DUP16, Operation::new(op_dup::<16>, 16, 17));

        table.set(Opcode::SWAP1, Operation::new(op_swap::<1>, 2, 2));
        table.set(Opcode::SWAP2, Operation::new(op_swap::<2>, 3, 3));
        table.set(Opcode::SWAP3, Operation::new(op_swap::<3>, 4, 4));
        table.set(Opcode::SWAP4, Operation::new(op_swap::<4>, 5, 5));
        table.set(Opcode::SWAP5, Operation::new(op_swap::<5>, 6, 6));
        table.set(Opcode::SWAP6, Operation::new(op_swap::<6>, 7, 7));
        table.set(Opcode::SWAP7, Operation::new(op_swap::<7>, 8, 8));
        table.set(Opcode::SWAP8, Operation::new(op_swap::<8>, 9, 9));
        table.set(Opcode::SWAP9, Operation::new(op_swap::<9>, 10, 10));
        table.set(Opcode::SWAP10, Operation::new(op_swap::<10>, 11, 11));
        table.set(Opcode::SWAP11, Operation::new(op_swap::<11>, 12, 12));
        table.set(Opcode::SWAP12, Operation::new(op_swap::<12>, 13, 13));
        table.set(Opcode::SWAP13, Operation::new(op_swap::<13>, 14, 14));
        table.set(Opcode::SWAP14, Operation::new(op_swap::<14>, 15, 15));
        table.set(Opcode::SWAP15, Operation::new(op_swap::<15>, 16, 16));
        table.set(Opcode::SWAP16, Operation::new(op_swap::<16>, 17, 17));

        table.set(
            Opcode::LOG0,
            Operation {
                memory_size: Some(memory_log),
                writes: true,
                ..Operation::new(op_log::<0>, 2, 0)
            },
        );
        table.set(
            Opcode::LOG1,
            Operation {
                memory_size: Some(memory_log),
                writes: true,
                ..Operation::new(op_log::<1>, 3, 0)
            },
        );
        table.set(
            Opcode::LOG2,
            Operation {
                memory_size: Some(memory_log),
                writes: true,
                ..Operation::new(op_log::<2>, 4, 0)
            },
        );
        table.set(
            Opcode::LOG3,
            Operation {
                memory_size: Some(memory_log),
                writes: true,
                ..Operation::new(op_log::<3>, 5, 0)
            },
        );
        table.set(
            Opcode::LOG4,
            Operation {
                memory_size: Some(memory_log),
                writes: true,
                ..Operation::new(op_log::<4>, 6, 0)
            },
        );

        table.set(
            Opcode::CREATE,
            Operation {
                memory_size: Some(memory_create),
                writes: true,
                returns: true,
                ..Operation::new(op_create, 3, 1)
            },
        );
        table.set(
            Opcode::CALL,
            Operation {
                memory_size: Some(memory_call),
                returns: true,
                ..Operation::new(op_call, 7, 1)
            },
        );
        table.set(
            Opcode::CALLCODE,
            Operation {
                memory_size: Some(memory_call),
                returns: true,
                ..Operation::new(op_call_code, 7, 1)
            },
        );
        table.set(
            Opcode::RETURN,
            Operation {
                memory_size: Some(memory_return),
                halts: true,
                ..Operation::new(op_return, 2, 0)
            },
        );
        table.set(
            Opcode::SELFDESTRUCT,
            Operation {
                halts: true,
                writes: true,
                ..Operation::new(op_selfdestruct, 1, 0)
            },
        );

        table
    }
}

// ---------------------------------------------------------------------------
// Memory size functions

fn calc_mem_size(offset: U256, length: U256) -> VmResult<U256> {
    if length.is_zero() {
        return Ok(U256::zero());
    }
    offset.checked_add(length).ok_or(VmError::UintOverflow)
}

fn memory_sha3(stack: &Stack) -> VmResult<U256> {
    calc_mem_size(stack.peek(0)?, stack.peek(1)?)
}

fn memory_call_data_copy(stack: &Stack) -> VmResult<U256> {
    calc_mem_size(stack.peek(0)?, stack.peek(2)?)
}

fn memory_return_data_copy(stack: &Stack) -> VmResult<U256> {
    calc_mem_size(stack.peek(0)?, stack.peek(2)?)
}

fn memory_code_copy(stack: &Stack) -> VmResult<U256> {
    calc_mem_size(stack.peek(0)?, stack.peek(2)?)
}

fn memory_ext_code_copy(stack: &Stack) -> VmResult<U256> {
    calc_mem_size(stack.peek(1)?, stack.peek(3)?)
}

fn memory_mload(stack: &Stack) -> VmResult<U256> {
    calc_mem_size(stack.peek(0)?, U256::from(32))
}

fn memory_mstore(stack: &Stack) -> VmResult<U256> {
    calc_mem_size(stack.peek(0)?, U256::from(32))
}

fn memory_mstore8(stack: &Stack) -> VmResult<U256> {
    calc_mem_size(stack.peek(0)?, U256::one())
}

fn memory_create(stack: &Stack) -> VmResult<U256> {
    calc_mem_size(stack.peek(1)?, stack.peek(2)?)
}

fn memory_call(stack: &Stack) -> VmResult<U256> {
    let out = calc_mem_size(stack.peek(5)?, stack.peek(6)?)?;
    let input = calc_mem_size(stack.peek(3)?, stack.peek(4)?)?;
    Ok(out.max(input))
}

fn memory_delegate_call(stack: &Stack) -> VmResult<U256> {
    let out = calc_mem_size(stack.peek(4)?, stack.peek(5)?)?;
    let input = calc_mem_size(stack.peek(2)?, stack.peek(3)?)?;
    Ok(out.max(input))
}

fn memory_static_call(stack: &Stack) -> VmResult<U256> {
    memory_delegate_call(stack)
}

fn memory_return(stack: &Stack) -> VmResult<U256> {
    calc_mem_size(stack.peek(0)?, stack.peek(1)?)
}

fn memory_revert(stack: &Stack) -> VmResult<U256> {
    calc_mem_size(stack.peek(0)?, stack.peek(1)?)
}

fn memory_log(stack: &Stack) -> VmResult<U256> {
    calc_mem_size(stack.peek(0)?, stack.peek(1)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layering() {
        let frontier = JumpTable::frontier();
        assert!(!frontier.get(Opcode::DELEGATECALL as u8).valid);
        assert!(!frontier.get(Opcode::REVERT as u8).valid);
        assert!(!frontier.get(Opcode::SHL as u8).valid);

        let homestead = JumpTable::homestead();
        assert!(homestead.get(Opcode::DELEGATECALL as u8).valid);
        assert!(!homestead.get(Opcode::STATICCALL as u8).valid);

        let byzantium = JumpTable::byzantium();
        assert!(byzantium.get(Opcode::STATICCALL as u8).valid);
        assert!(byzantium.get(Opcode::REVERT as u8).valid);
        assert!(!byzantium.get(Opcode::SAR as u8).valid);

        let constantinople = JumpTable::constantinople();
        assert!(constantinople.get(Opcode::SHL as u8).valid);
        assert!(constantinople.get(Opcode::SAR as u8).valid);
    }

    #[test]
    fn test_flags() {
        let table = JumpTable::constantinople();
        assert!(table.get(Opcode::STOP as u8).halts);
        assert!(table.get(Opcode::SSTORE as u8).writes);
        assert!(table.get(Opcode::JUMP as u8).jumps);
        assert!(table.get(Opcode::REVERT as u8).reverts);
        assert!(table.get(Opcode::CALL as u8).returns);
        assert!(!table.get(0xfe).valid);
    }

    #[test]
    fn test_memory_size_overflow() {
        let mut stack = Stack::new();
        stack.push(U256::one()).unwrap();
        stack.push(U256::MAX).unwrap();
        // MLOAD offset at the top of the stack is U256::MAX
        assert_eq!(memory_mload(&stack), Err(VmError::UintOverflow));
    }
}
