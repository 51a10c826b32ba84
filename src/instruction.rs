//! Instruction forms flowing through the assembler

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker for an empty field
pub const NONE: &str = "-";

/// Selector tag telling the PE to read operand B from the immediate field
pub const IMMEDIATE_TAG: &str = "IMM";

/// One source-dialect line, as handed out by the demultiplexer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub text: String,
    /// 1-based line number in the kernel source
    pub line: usize,
}

impl SourceLine {
    pub fn new(text: impl Into<String>, line: usize) -> Self {
        Self { text: text.into(), line }
    }
}

/// Decoded source instruction: `operation operand1, operand2 -> operand3`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalInstruction {
    pub operation: String,
    pub operand1: String,
    pub operand2: String,
    pub operand3: String,
    pub writeback: String,
}

impl CanonicalInstruction {
    pub fn new(
        operation: &str,
        operand1: &str,
        operand2: &str,
        operand3: &str,
        writeback: &str,
    ) -> Self {
        Self {
            operation: operation.to_string(),
            operand1: operand1.to_string(),
            operand2: operand2.to_string(),
            operand3: operand3.to_string(),
            writeback: writeback.to_string(),
        }
    }

    pub fn fields(&self) -> [&str; 5] {
        [
            &self.operation,
            &self.operand1,
            &self.operand2,
            &self.operand3,
            &self.writeback,
        ]
    }
}

impl fmt::Display for CanonicalInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.fields().join(", "))
    }
}

/// Instruction in the fabric's six-field format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInstruction {
    pub source_a: String,
    pub source_b: String,
    pub operation: String,
    pub destination: String,
    /// Reserved
    pub flag: String,
    pub immediate: String,
}

impl TargetInstruction {
    pub fn new(
        source_a: &str,
        source_b: &str,
        operation: &str,
        destination: &str,
        flag: &str,
        immediate: &str,
    ) -> Self {
        Self {
            source_a: source_a.to_string(),
            source_b: source_b.to_string(),
            operation: operation.to_string(),
            destination: destination.to_string(),
            flag: flag.to_string(),
            immediate: immediate.to_string(),
        }
    }

    /// The fixed NOP encoding
    pub fn nop() -> Self {
        Self::new("ZEROS", "PREV", "NOP", NONE, "PREV", "0")
    }

    pub fn is_nop(&self) -> bool {
        *self == Self::nop()
    }

    pub fn fields(&self) -> [&str; 6] {
        [
            &self.source_a,
            &self.source_b,
            &self.operation,
            &self.destination,
            &self.flag,
            &self.immediate,
        ]
    }
}

impl fmt::Display for TargetInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields().join(", "))
    }
}
