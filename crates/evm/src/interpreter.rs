use crate::contract::Contract;
use crate::error::{VmError, VmResult};
use crate::evm::Evm;
use crate::jump_table::Fork;
use crate::memory::Memory;
use crate::opcodes::Opcode;
use crate::params::STACK_LIMIT;
use crate::stack::Stack;
use crate::tracer::Tracer;
use std::sync::atomic::Ordering;

/// Per-machine configuration.
#[derive(Default)]
pub struct Config {
    /// Enables the tracer callbacks on top-level entries.
    pub debug: bool,
    pub tracer: Option<Box<dyn Tracer>>,
    /// Early-returns from sub-calls when depth > 0; used for static analysis.
    pub no_recursion: bool,
    /// Instruction-set layer to freeze into the dispatch table.
    pub fork: Fork,
}

impl Evm<'_> {
    /// Runs the frame's bytecode to completion. The returned bytes are the
    /// frame's output (RETURN payload, or empty for STOP). REVERT surfaces
    /// as `VmError::ExecutionReverted` carrying the revert payload.
    pub(crate) fn run_interpreter(
        &mut self,
        contract: &mut Contract,
        input: &[u8],
    ) -> VmResult<Vec<u8>> {
        self.depth += 1;
        let result = self.run_loop(contract, input);
        self.depth -= 1;
        result
    }

    fn run_loop(&mut self, contract: &mut Contract, input: &[u8]) -> VmResult<Vec<u8>> {
        contract.input = input.to_vec();
        self.return_data.clear();

        let mut pc: u64 = 0;
        let mut stack = Stack::new();
        let mut memory = Memory::new();

        loop {
            if self.abort.load(Ordering::SeqCst) {
                return Err(VmError::Aborted);
            }

            let op = contract.get_op(pc);
            let operation = self.table.get(op);
            if !operation.valid {
                return Err(VmError::InvalidOpcode(op));
            }

            if self.read_only && operation.writes {
                return Err(VmError::WriteProtection);
            }

            stack.require(operation.pops)?;
            if stack.len() - operation.pops + operation.pushes > STACK_LIMIT {
                return Err(VmError::StackOverflow);
            }

            // A value-bearing CALL mutates balances even though the opcode
            // itself is not flagged as writing.
            if self.read_only && op == Opcode::CALL as u8 && !stack.peek(2)?.is_zero() {
                return Err(VmError::WriteProtection);
            }

            if let Some(memory_size) = operation.memory_size {
                let size = word_size_in_bytes(memory_size(&stack)?)?;
                memory.resize(size as usize);
            }

            if self.config.debug {
                let depth = self.depth;
                if let Some(tracer) = self.config.tracer.as_mut() {
                    tracer.capture_state(pc, op, depth, &stack, &memory, &self.return_data);
                }
            }

            let result = (operation.execute)(&mut pc, self, contract, &mut memory, &mut stack);
            let res = match result {
                Ok(res) => res,
                Err(err) => {
                    if self.config.debug {
                        let depth = self.depth;
                        if let Some(tracer) = self.config.tracer.as_mut() {
                            tracer.capture_fault(pc, op, depth, &err);
                        }
                    }
                    return Err(err);
                }
            };

            if operation.returns {
                self.return_data = res.clone().unwrap_or_default();
            }

            if operation.reverts {
                return Err(VmError::ExecutionReverted(res.unwrap_or_default()));
            }
            if operation.halts {
                return Ok(res.unwrap_or_default());
            }
            if !operation.jumps {
                pc += 1;
            }
        }
    }
}

/// Rounds a memory size up to a 32-byte word boundary, rejecting sizes that
/// do not fit in 64 bits.
fn word_size_in_bytes(size: helios_types::U256) -> VmResult<u64> {
    if size > helios_types::U256::from(u64::MAX) {
        return Err(VmError::UintOverflow);
    }
    let bytes = (size.low_u64() as u128 + 31) / 32 * 32;
    if bytes > u64::MAX as u128 {
        return Err(VmError::UintOverflow);
    }
    Ok(bytes as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_size_rounding() {
        assert_eq!(word_size_in_bytes(0u64.into()).unwrap(), 0);
        assert_eq!(word_size_in_bytes(1u64.into()).unwrap(), 32);
        assert_eq!(word_size_in_bytes(32u64.into()).unwrap(), 32);
        assert_eq!(word_size_in_bytes(33u64.into()).unwrap(), 64);
    }

    #[test]
    fn test_word_size_overflow() {
        let too_big = helios_types::U256::from(u64::MAX) + helios_types::U256::one();
        assert_eq!(word_size_in_bytes(too_big), Err(VmError::UintOverflow));
        // Fits in 64 bits, but the word rounding does not.
        assert_eq!(
            word_size_in_bytes(u64::MAX.into()),
            Err(VmError::UintOverflow)
        );
    }
}
