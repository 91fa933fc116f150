use crate::error::VmError;
use crate::memory::Memory;
use crate::opcodes::Opcode;
use crate::stack::Stack;
use helios_types::{Address, Amount, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Filters for the payload handed to a tracer on each step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    #[serde(default)]
    pub disable_memory: bool,
    #[serde(default)]
    pub disable_stack: bool,
    #[serde(default)]
    pub debug: bool,
}

/// Hooks invoked by the interpreter when tracing is enabled.
pub trait Tracer {
    fn capture_start(
        &mut self,
        caller: Address,
        to: Address,
        create: bool,
        input: &[u8],
        value: &Amount,
    );

    fn capture_state(
        &mut self,
        pc: u64,
        op: u8,
        depth: usize,
        stack: &Stack,
        memory: &Memory,
        return_data: &[u8],
    );

    fn capture_fault(&mut self, pc: u64, op: u8, depth: usize, err: &VmError);

    fn capture_end(&mut self, output: &[u8], elapsed: Duration, err: Option<&VmError>);
}

/// One interpreter step as recorded by the structured logger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructLog {
    pub pc: u64,
    pub op: String,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<U256>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A tracer that accumulates a structured step log of the whole execution.
#[derive(Default)]
pub struct StructLogger {
    config: LogConfig,
    logs: Vec<StructLog>,
    output: Bytes,
    error: Option<String>,
}

impl StructLogger {
    pub fn new(config: LogConfig) -> Self {
        StructLogger {
            config,
            logs: Vec::new(),
            output: Bytes::new(),
            error: None,
        }
    }

    pub fn logs(&self) -> &[StructLog] {
        &self.logs
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn into_logs(self) -> Vec<StructLog> {
        self.logs
    }
}

impl Tracer for StructLogger {
    fn capture_start(
        &mut self,
        caller: Address,
        to: Address,
        create: bool,
        input: &[u8],
        value: &Amount,
    ) {
        if self.config.debug {
            tracing::debug!(
                %caller,
                %to,
                create,
                input_len = input.len(),
                %value,
                "trace start"
            );
        }
    }

    fn capture_state(
        &mut self,
        pc: u64,
        op: u8,
        depth: usize,
        stack: &Stack,
        memory: &Memory,
        _return_data: &[u8],
    ) {
        let entry = StructLog {
            pc,
            op: Opcode::name_of(op),
            depth,
            stack: if self.config.disable_stack {
                None
            } else {
                Some(stack.data().to_vec())
            },
            memory: if self.config.disable_memory {
                None
            } else {
                Some(Bytes::from_slice(memory.as_slice()))
            },
            error: None,
        };
        if self.config.debug {
            tracing::debug!(pc = entry.pc, op = %entry.op, depth = entry.depth, "step");
        }
        self.logs.push(entry);
    }

    fn capture_fault(&mut self, pc: u64, op: u8, depth: usize, err: &VmError) {
        self.logs.push(StructLog {
            pc,
            op: Opcode::name_of(op),
            depth,
            stack: None,
            memory: None,
            error: Some(err.to_string()),
        });
    }

    fn capture_end(&mut self, output: &[u8], elapsed: Duration, err: Option<&VmError>) {
        self.output = Bytes::from_slice(output);
        self.error = err.map(|e| e.to_string());
        if self.config.debug {
            tracing::debug!(output_len = output.len(), ?elapsed, "trace end");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_log_filters() {
        let mut logger = StructLogger::new(LogConfig {
            disable_memory: true,
            disable_stack: false,
            debug: false,
        });
        let stack = Stack::new();
        let memory = Memory::new();
        logger.capture_state(0, 0x01, 1, &stack, &memory, &[]);

        let log = &logger.logs()[0];
        assert_eq!(log.op, "ADD");
        assert!(log.memory.is_none());
        assert_eq!(log.stack.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_capture_end_records_error() {
        let mut logger = StructLogger::new(LogConfig::default());
        logger.capture_end(&[1, 2], Duration::from_millis(1), Some(&VmError::InvalidJump));
        assert_eq!(logger.output(), &[1, 2]);
        assert_eq!(logger.error(), Some("invalid jump destination"));
    }
}
