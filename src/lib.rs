//! CGRA Schedule Assembler
//!
//! This library translates per-PE execution schedules written in a source
//! pseudo-assembly dialect into the six-field instruction format of a
//! coarse-grained reconfigurable array, and lays the result out in the
//! fabric's shared instruction memory together with one configuration word
//! per kernel.
//!
//! # Example
//!
//! ```rust
//! use cgra_asm::{assemble, FabricConfig};
//!
//! let config = FabricConfig {
//!     n_row: 1,
//!     n_col: 1,
//!     remap: Vec::new(),
//!     ..FabricConfig::default_4x4()
//! };
//! let program = assemble(&["ADD R1, R2 -> R3\n"], config).unwrap();
//! let word = program.memory.get(0, 0).unwrap();
//! assert_eq!(word.fields(), ["R1", "R2", "SADD", "R3", "-", "-"]);
//! println!("{}", program);
//! ```

pub mod instruction;
pub mod lexer;
pub mod decoder;
pub mod translator;
pub mod schedule;
pub mod remap;
pub mod packer;
pub mod memory;
pub mod assembler;
pub mod hardware;
pub mod error;

pub use instruction::{CanonicalInstruction, SourceLine, TargetInstruction};
pub use decoder::Decoder;
pub use translator::{Diagnostic, FallbackKind, Translator};
pub use schedule::{demultiplex, Schedule};
pub use remap::GridRemap;
pub use packer::{pack_kernel, ColumnMask, ConfigurationWord, KernelLayout};
pub use memory::InstructionMemory;
pub use assembler::{AssembledProgram, Assembler, CompilerState, Kernel};
pub use hardware::{ColumnMaskEncoding, DecodeMode, FabricConfig};
pub use error::{AsmError, AsmResult};

/// Assemble a sequence of kernel sources in one run
pub fn assemble<S: AsRef<str>>(kernels: &[S], config: FabricConfig) -> AsmResult<AssembledProgram> {
    let mut assembler = Assembler::new(config)?;
    let mut assembled = Vec::with_capacity(kernels.len());

    for source in kernels {
        assembled.push(assembler.assemble_kernel(source.as_ref())?);
    }

    Ok(assembler.finish(assembled))
}
