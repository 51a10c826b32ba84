//! Error types for the CGRA assembler

use thiserror::Error;

/// Result type for assembler operations
pub type AsmResult<T> = Result<T, AsmError>;

/// Assembly errors
///
/// Every variant is fatal to the kernel being assembled. Encoding fallbacks
/// are not errors; they are reported as [`crate::translator::Diagnostic`]s.
#[derive(Debug, Error)]
pub enum AsmError {
    #[error("Malformed schedule at line {line}: {message}")]
    MalformedSchedule { line: usize, message: String },

    #[error("Unrecognized operation at line {line}: '{text}'")]
    UnrecognizedOperation { line: usize, text: String },

    #[error("Capacity exceeded: {message}")]
    CapacityExceeded { message: String },

    #[error("Invalid fabric configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Kernel {kernel_id}: {source}")]
    Kernel {
        kernel_id: usize,
        #[source]
        source: Box<AsmError>,
    },

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AsmError {
    pub fn malformed(line: usize, msg: impl Into<String>) -> Self {
        AsmError::MalformedSchedule { line, message: msg.into() }
    }

    pub fn unrecognized(line: usize, text: impl Into<String>) -> Self {
        AsmError::UnrecognizedOperation { line, text: text.into() }
    }

    pub fn capacity(msg: impl Into<String>) -> Self {
        AsmError::CapacityExceeded { message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        AsmError::InvalidConfig { message: msg.into() }
    }

    /// Attach the id of the kernel being assembled
    pub fn in_kernel(self, kernel_id: usize) -> Self {
        AsmError::Kernel { kernel_id, source: Box::new(self) }
    }

    /// Source line the error points at, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            AsmError::MalformedSchedule { line, .. }
            | AsmError::UnrecognizedOperation { line, .. } => Some(*line),
            AsmError::Kernel { source, .. } => source.line(),
            _ => None,
        }
    }
}
