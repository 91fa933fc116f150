use crate::contract::Contract;
use crate::error::{VmError, VmResult};
use crate::evm::{create_address, Evm};
use crate::log::Log;
use crate::memory::Memory;
use crate::stack::Stack;
use helios_types::{Amount, H256, U256, WordExt};

pub(crate) type InstructionResult = VmResult<Option<Vec<u8>>>;

// ---------------------------------------------------------------------------
// Arithmetic helpers

fn is_negative(value: U256) -> bool {
    value.bit(255)
}

fn twos_complement(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

/// Converts a word to a usize. Callers ensure the word fits: the value was
/// either bounds-checked against the data length or covered by the
/// operation's memory-size computation.
fn word_to_usize(value: U256) -> usize {
    value.low_u64() as usize
}

/// Copies `size` bytes from `data` starting at `offset`, zero-padded past the
/// end of `data`.
fn get_data(data: &[u8], offset: U256, size: usize) -> Vec<u8> {
    let len = data.len();
    let start = if offset > U256::from(len as u64) {
        len
    } else {
        word_to_usize(offset)
    };
    let end = start.saturating_add(size).min(len);
    let mut out = data[start..end].to_vec();
    out.resize(size, 0);
    out
}

// ---------------------------------------------------------------------------
// Stop and arithmetic operations

pub(crate) fn op_stop(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    _stack: &mut Stack,
) -> InstructionResult {
    Ok(None)
}

pub(crate) fn op_add(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(a.overflowing_add(b).0)?;
    Ok(None)
}

pub(crate) fn op_mul(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(a.overflowing_mul(b).0)?;
    Ok(None)
}

pub(crate) fn op_sub(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(a.overflowing_sub(b).0)?;
    Ok(None)
}

pub(crate) fn op_div(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(if b.is_zero() { U256::zero() } else { a / b })?;
    Ok(None)
}

pub(crate) fn op_sdiv(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    if b.is_zero() {
        stack.push(U256::zero())?;
        return Ok(None);
    }
    let a_negative = is_negative(a);
    let b_negative = is_negative(b);
    let a_abs = if a_negative { twos_complement(a) } else { a };
    let b_abs = if b_negative { twos_complement(b) } else { b };
    let quotient = a_abs / b_abs;
    stack.push(if a_negative != b_negative {
        twos_complement(quotient)
    } else {
        quotient
    })?;
    Ok(None)
}

pub(crate) fn op_mod(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(if b.is_zero() { U256::zero() } else { a % b })?;
    Ok(None)
}

pub(crate) fn op_smod(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    if b.is_zero() {
        stack.push(U256::zero())?;
        return Ok(None);
    }
    let a_negative = is_negative(a);
    let a_abs = if a_negative { twos_complement(a) } else { a };
    let b_abs = if is_negative(b) { twos_complement(b) } else { b };
    let remainder = a_abs % b_abs;
    stack.push(if a_negative && !remainder.is_zero() {
        twos_complement(remainder)
    } else {
        remainder
    })?;
    Ok(None)
}

pub(crate) fn op_addmod(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    let n = stack.pop()?;
    stack.push(if n.is_zero() {
        U256::zero()
    } else {
        let sum = helios_types::U512::from(a) + helios_types::U512::from(b);
        let rem = sum % helios_types::U512::from(n);
        rem.try_into().unwrap_or_else(|_| U256::zero())
    })?;
    Ok(None)
}

pub(crate) fn op_mulmod(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    let n = stack.pop()?;
    stack.push(if n.is_zero() {
        U256::zero()
    } else {
        let product = a.full_mul(b);
        let rem = product % helios_types::U512::from(n);
        rem.try_into().unwrap_or_else(|_| U256::zero())
    })?;
    Ok(None)
}

pub(crate) fn op_exp(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let base = stack.pop()?;
    let exponent = stack.pop()?;
    stack.push(base.overflowing_pow(exponent).0)?;
    Ok(None)
}

pub(crate) fn op_sign_extend(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let back = stack.pop()?;
    let num = stack.pop()?;
    if back >= U256::from(31) {
        stack.push(num)?;
        return Ok(None);
    }
    let bit_index = word_to_usize(back) * 8 + 7;
    let mask = (U256::one() << (bit_index + 1)) - U256::one();
    stack.push(if num.bit(bit_index) {
        num | !mask
    } else {
        num & mask
    })?;
    Ok(None)
}

// ---------------------------------------------------------------------------
// Comparison and bitwise operations

pub(crate) fn op_lt(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(bool_word(a < b))?;
    Ok(None)
}

pub(crate) fn op_gt(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(bool_word(a > b))?;
    Ok(None)
}

pub(crate) fn op_slt(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(bool_word(signed_lt(a, b)))?;
    Ok(None)
}

pub(crate) fn op_sgt(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(bool_word(signed_lt(b, a)))?;
    Ok(None)
}

fn signed_lt(a: U256, b: U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

fn bool_word(condition: bool) -> U256 {
    if condition {
        U256::one()
    } else {
        U256::zero()
    }
}

pub(crate) fn op_eq(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(bool_word(a == b))?;
    Ok(None)
}

pub(crate) fn op_iszero(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    stack.push(bool_word(a.is_zero()))?;
    Ok(None)
}

pub(crate) fn op_and(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(a & b)?;
    Ok(None)
}

pub(crate) fn op_or(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(a | b)?;
    Ok(None)
}

pub(crate) fn op_xor(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(a ^ b)?;
    Ok(None)
}

pub(crate) fn op_not(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let a = stack.pop()?;
    stack.push(!a)?;
    Ok(None)
}

pub(crate) fn op_byte(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let index = stack.pop()?;
    let value = stack.pop()?;
    stack.push(if index < U256::from(32) {
        U256::from(value.byte(31 - word_to_usize(index)))
    } else {
        U256::zero()
    })?;
    Ok(None)
}

pub(crate) fn op_shl(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let shift = stack.pop()?;
    let value = stack.pop()?;
    stack.push(if shift >= U256::from(256) {
        U256::zero()
    } else {
        value << word_to_usize(shift)
    })?;
    Ok(None)
}

pub(crate) fn op_shr(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let shift = stack.pop()?;
    let value = stack.pop()?;
    stack.push(if shift >= U256::from(256) {
        U256::zero()
    } else {
        value >> word_to_usize(shift)
    })?;
    Ok(None)
}

pub(crate) fn op_sar(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let shift = stack.pop()?;
    let value = stack.pop()?;
    let result = if shift >= U256::from(256) {
        if is_negative(value) {
            U256::MAX
        } else {
            U256::zero()
        }
    } else {
        let shift = word_to_usize(shift);
        if is_negative(value) && shift > 0 {
            (value >> shift) | (U256::MAX << (256 - shift))
        } else {
            value >> shift
        }
    };
    stack.push(result)?;
    Ok(None)
}

// ---------------------------------------------------------------------------
// SHA3

pub(crate) fn op_sha3(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let offset = stack.pop()?;
    let size = stack.pop()?;
    let data = memory.get(word_to_usize(offset), word_to_usize(size));
    let hash = helios_crypto::keccak256(&data);
    stack.push(U256::from_be_slice(hash.as_bytes()))?;
    Ok(None)
}

// ---------------------------------------------------------------------------
// Environmental information

pub(crate) fn op_address(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(U256::from_address(contract.address()))?;
    Ok(None)
}

pub(crate) fn op_balance(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let addr = stack.pop()?.to_address();
    stack.push(evm.state.get_balance(addr).raw())?;
    Ok(None)
}

pub(crate) fn op_origin(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(U256::from_address(evm.context.origin))?;
    Ok(None)
}

pub(crate) fn op_caller(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(U256::from_address(contract.caller()))?;
    Ok(None)
}

pub(crate) fn op_call_value(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(contract.value().raw())?;
    Ok(None)
}

pub(crate) fn op_call_data_load(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let offset = stack.pop()?;
    let word = get_data(contract.input(), offset, 32);
    stack.push(U256::from_be_slice(&word))?;
    Ok(None)
}

pub(crate) fn op_call_data_size(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(U256::from(contract.input().len()))?;
    Ok(None)
}

pub(crate) fn op_call_data_copy(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let mem_offset = stack.pop()?;
    let data_offset = stack.pop()?;
    let size = stack.pop()?;
    let data = get_data(contract.input(), data_offset, word_to_usize(size));
    memory.set(word_to_usize(mem_offset), &data);
    Ok(None)
}

pub(crate) fn op_code_size(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(U256::from(contract.code().len()))?;
    Ok(None)
}

pub(crate) fn op_code_copy(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let mem_offset = stack.pop()?;
    let code_offset = stack.pop()?;
    let size = stack.pop()?;
    let code = get_data(contract.code(), code_offset, word_to_usize(size));
    memory.set(word_to_usize(mem_offset), &code);
    Ok(None)
}

pub(crate) fn op_ext_code_size(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let addr = stack.pop()?.to_address();
    stack.push(U256::from(evm.state.get_code_size(addr)))?;
    Ok(None)
}

pub(crate) fn op_ext_code_copy(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    _contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let addr = stack.pop()?.to_address();
    let mem_offset = stack.pop()?;
    let code_offset = stack.pop()?;
    let size = stack.pop()?;
    let code = get_data(&evm.state.get_code(addr), code_offset, word_to_usize(size));
    memory.set(word_to_usize(mem_offset), &code);
    Ok(None)
}

pub(crate) fn op_return_data_size(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(U256::from(evm.return_data.len()))?;
    Ok(None)
}

pub(crate) fn op_return_data_copy(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    _contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let mem_offset = stack.pop()?;
    let data_offset = stack.pop()?;
    let size = stack.pop()?;
    let end = data_offset
        .checked_add(size)
        .ok_or(VmError::ReturnDataOutOfBounds)?;
    if end > U256::from(evm.return_data.len() as u64) {
        return Err(VmError::ReturnDataOutOfBounds);
    }
    let data = evm.return_data[word_to_usize(data_offset)..word_to_usize(end)].to_vec();
    memory.set(word_to_usize(mem_offset), &data);
    Ok(None)
}

// ---------------------------------------------------------------------------
// Block information

pub(crate) fn op_blockhash(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let num = stack.pop()?;
    let block_number = evm.context.block_number;
    let hash = if num < block_number && block_number - num <= U256::from(256) {
        (evm.context.get_hash)(num.low_u64())
    } else {
        H256::zero()
    };
    stack.push(U256::from_be_slice(hash.as_bytes()))?;
    Ok(None)
}

pub(crate) fn op_coinbase(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(U256::from_address(evm.context.coinbase))?;
    Ok(None)
}

pub(crate) fn op_timestamp(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(evm.context.time)?;
    Ok(None)
}

pub(crate) fn op_number(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(evm.context.block_number)?;
    Ok(None)
}

pub(crate) fn op_difficulty(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(evm.context.difficulty)?;
    Ok(None)
}

// Gas is not metered on this chain; the gas-observing opcodes push fixed
// constants.

pub(crate) fn op_gasprice(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(U256::zero())?;
    Ok(None)
}

pub(crate) fn op_gas_limit(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(U256::from(300000))?;
    Ok(None)
}

pub(crate) fn op_gas(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(U256::from(300000))?;
    Ok(None)
}

// ---------------------------------------------------------------------------
// Stack, memory, storage and flow operations

pub(crate) fn op_pop(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.pop()?;
    Ok(None)
}

pub(crate) fn op_mload(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let offset = stack.pop()?;
    stack.push(memory.get_word(word_to_usize(offset)))?;
    Ok(None)
}

pub(crate) fn op_mstore(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let offset = stack.pop()?;
    let value = stack.pop()?;
    memory.set_word(word_to_usize(offset), value);
    Ok(None)
}

pub(crate) fn op_mstore8(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let offset = stack.pop()?;
    let value = stack.pop()?;
    memory.set_byte(word_to_usize(offset), value.byte(0));
    Ok(None)
}

pub(crate) fn op_sload(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let key = stack.pop()?;
    let value = evm
        .state
        .get_state(contract.address(), H256::from(key.to_be_bytes()));
    stack.push(U256::from_be_slice(value.as_bytes()))?;
    Ok(None)
}

pub(crate) fn op_sstore(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let key = stack.pop()?;
    let value = stack.pop()?;
    evm.state.set_state(
        contract.address(),
        H256::from(key.to_be_bytes()),
        H256::from(value.to_be_bytes()),
    )?;
    Ok(None)
}

pub(crate) fn op_jump(
    pc: &mut u64,
    _evm: &mut Evm<'_>,
    contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let dest = stack.pop()?;
    if !contract.valid_jumpdest(dest) {
        return Err(VmError::InvalidJump);
    }
    *pc = dest.low_u64();
    Ok(None)
}

pub(crate) fn op_jumpi(
    pc: &mut u64,
    _evm: &mut Evm<'_>,
    contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let dest = stack.pop()?;
    let cond = stack.pop()?;
    if !cond.is_zero() {
        if !contract.valid_jumpdest(dest) {
            return Err(VmError::InvalidJump);
        }
        *pc = dest.low_u64();
    } else {
        *pc += 1;
    }
    Ok(None)
}

pub(crate) fn op_pc(
    pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(U256::from(*pc))?;
    Ok(None)
}

pub(crate) fn op_msize(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.push(U256::from(memory.len()))?;
    Ok(None)
}

pub(crate) fn op_jumpdest(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    _stack: &mut Stack,
) -> InstructionResult {
    Ok(None)
}

// ---------------------------------------------------------------------------
// Push, duplication and exchange operations

pub(crate) fn op_push<const N: usize>(
    pc: &mut u64,
    _evm: &mut Evm<'_>,
    contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let code = contract.code();
    let start = (*pc as usize).saturating_add(1).min(code.len());
    let end = start.saturating_add(N).min(code.len());
    // Immediates truncated by the end of code are zero-padded on the right.
    let mut bytes = [0u8; 32];
    bytes[..end - start].copy_from_slice(&code[start..end]);
    let mut word = [0u8; 32];
    word[32 - N..].copy_from_slice(&bytes[..N]);
    stack.push(U256::from_big_endian(&word))?;
    *pc += N as u64;
    Ok(None)
}

pub(crate) fn op_dup<const N: usize>(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.dup(N)?;
    Ok(None)
}

pub(crate) fn op_swap<const N: usize>(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    stack.swap(N)?;
    Ok(None)
}

// ---------------------------------------------------------------------------
// Logging operations

pub(crate) fn op_log<const N: usize>(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let offset = stack.pop()?;
    let size = stack.pop()?;
    let mut topics = Vec::with_capacity(N);
    for _ in 0..N {
        topics.push(H256::from(stack.pop()?.to_be_bytes()));
    }
    let data = memory.get(word_to_usize(offset), word_to_usize(size));
    evm.state
        .add_log(Log::new(contract.address(), topics, data));
    Ok(None)
}

// ---------------------------------------------------------------------------
// System operations

pub(crate) fn op_create(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let value = stack.pop()?;
    let offset = stack.pop()?;
    let size = stack.pop()?;
    let init_code = memory.get(word_to_usize(offset), word_to_usize(size));

    let seq = evm.state.get_seq(contract.address());
    let new_addr = create_address(contract.address(), seq);

    match evm.create(contract.address(), new_addr, init_code, Amount::new(value)) {
        Ok(_) => {
            stack.push(U256::from_address(new_addr))?;
            Ok(None)
        }
        Err(VmError::ExecutionReverted(payload)) => {
            stack.push(U256::zero())?;
            Ok(Some(payload))
        }
        Err(_) => {
            stack.push(U256::zero())?;
            Ok(None)
        }
    }
}

pub(crate) fn op_call(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let _gas = stack.pop()?;
    let to = stack.pop()?.to_address();
    let value = stack.pop()?;
    let in_offset = stack.pop()?;
    let in_size = stack.pop()?;
    let ret_offset = stack.pop()?;
    let ret_size = stack.pop()?;

    let args = memory.get(word_to_usize(in_offset), word_to_usize(in_size));
    let result = evm.call(contract.address(), to, &args, Amount::new(value));
    finish_call(stack, memory, ret_offset, ret_size, result)
}

pub(crate) fn op_call_code(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let _gas = stack.pop()?;
    let to = stack.pop()?.to_address();
    let value = stack.pop()?;
    let in_offset = stack.pop()?;
    let in_size = stack.pop()?;
    let ret_offset = stack.pop()?;
    let ret_size = stack.pop()?;

    let args = memory.get(word_to_usize(in_offset), word_to_usize(in_size));
    let result = evm.call_code(contract.address(), to, &args, Amount::new(value));
    finish_call(stack, memory, ret_offset, ret_size, result)
}

pub(crate) fn op_delegate_call(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let _gas = stack.pop()?;
    let to = stack.pop()?.to_address();
    let in_offset = stack.pop()?;
    let in_size = stack.pop()?;
    let ret_offset = stack.pop()?;
    let ret_size = stack.pop()?;

    let args = memory.get(word_to_usize(in_offset), word_to_usize(in_size));
    let result = evm.delegate_call(contract, to, &args);
    finish_call(stack, memory, ret_offset, ret_size, result)
}

pub(crate) fn op_static_call(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let _gas = stack.pop()?;
    let to = stack.pop()?.to_address();
    let in_offset = stack.pop()?;
    let in_size = stack.pop()?;
    let ret_offset = stack.pop()?;
    let ret_size = stack.pop()?;

    let args = memory.get(word_to_usize(in_offset), word_to_usize(in_size));
    let result = evm.static_call(contract.address(), to, &args);
    finish_call(stack, memory, ret_offset, ret_size, result)
}

/// Shared completion of the call-family opcodes: push the success flag,
/// copy the output into the return region, and surface the sub-call output
/// for the frame's return-data buffer. Sub-call errors are swallowed here;
/// their state effects were already reverted by the facade.
fn finish_call(
    stack: &mut Stack,
    memory: &mut Memory,
    ret_offset: U256,
    ret_size: U256,
    result: VmResult<Vec<u8>>,
) -> InstructionResult {
    match result {
        Ok(ret) => {
            stack.push(U256::one())?;
            copy_call_output(memory, ret_offset, ret_size, &ret);
            Ok(Some(ret))
        }
        Err(VmError::ExecutionReverted(payload)) => {
            stack.push(U256::zero())?;
            copy_call_output(memory, ret_offset, ret_size, &payload);
            Ok(Some(payload))
        }
        Err(_) => {
            stack.push(U256::zero())?;
            Ok(Some(Vec::new()))
        }
    }
}

fn copy_call_output(memory: &mut Memory, ret_offset: U256, ret_size: U256, output: &[u8]) {
    let n = word_to_usize(ret_size).min(output.len());
    memory.set(word_to_usize(ret_offset), &output[..n]);
}

pub(crate) fn op_return(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let offset = stack.pop()?;
    let size = stack.pop()?;
    Ok(Some(memory.get(word_to_usize(offset), word_to_usize(size))))
}

pub(crate) fn op_revert(
    _pc: &mut u64,
    _evm: &mut Evm<'_>,
    _contract: &mut Contract,
    memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let offset = stack.pop()?;
    let size = stack.pop()?;
    Ok(Some(memory.get(word_to_usize(offset), word_to_usize(size))))
}

pub(crate) fn op_selfdestruct(
    _pc: &mut u64,
    evm: &mut Evm<'_>,
    contract: &mut Contract,
    _memory: &mut Memory,
    stack: &mut Stack,
) -> InstructionResult {
    let beneficiary = stack.pop()?.to_address();
    let balance = evm.state.get_balance(contract.address());
    evm.state.add_balance(beneficiary, &balance)?;
    evm.state.suicide(contract.address())?;
    Ok(None)
}
