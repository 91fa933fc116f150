/// Maximum depth of the call/create stack.
pub const CALL_CREATE_DEPTH: usize = 1024;

/// Maximum size of the operand stack.
pub const STACK_LIMIT: usize = 1024;

/// Maximum bytecode size to permit for a contract.
pub const MAX_CODE_SIZE: usize = 24576;
