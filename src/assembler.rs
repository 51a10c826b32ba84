//! Kernel-by-kernel assembly driver
//!
//! Kernels are assembled one after another: each kernel's start address
//! depends on the address and column count consumed by the previous one, so
//! every compilation goes through `&mut Assembler`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::decoder::Decoder;
use crate::error::{AsmError, AsmResult};
use crate::hardware::FabricConfig;
use crate::instruction::{SourceLine, TargetInstruction};
use crate::memory::InstructionMemory;
use crate::packer::{pack_kernel, ColumnMask, ConfigurationWord, KernelLayout};
use crate::remap::GridRemap;
use crate::schedule::{demultiplex, Schedule};
use crate::translator::{Diagnostic, Translator};

/// A fallback substitution tied to the instruction it came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocatedDiagnostic {
    /// PE in source numbering
    pub pe: usize,
    pub step: usize,
    pub line: usize,
    pub diagnostic: Diagnostic,
}

impl fmt::Display for LocatedDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {} (PE {}, step {}): {}",
            self.line, self.pe, self.step, self.diagnostic
        )
    }
}

/// One assembled kernel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kernel {
    pub id: usize,
    pub start_address: usize,
    pub instruction_count: usize,
    pub active_columns: ColumnMask,
    pub active_column_count: usize,
    pub config_word: ConfigurationWord,
    /// Translated instructions in fabric PE order
    pub schedule: Schedule<TargetInstruction>,
    pub diagnostics: Vec<LocatedDiagnostic>,
}

/// Counters and images carried from one kernel to the next
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerState {
    pub next_kernel_id: usize,
    pub next_free_address: usize,
    /// Configuration word of every kernel, indexed by kernel id
    pub config_words: Vec<ConfigurationWord>,
    pub memory: InstructionMemory,
}

impl CompilerState {
    pub fn new(config: &FabricConfig) -> Self {
        Self {
            next_kernel_id: 0,
            next_free_address: 0,
            config_words: Vec::new(),
            memory: InstructionMemory::new(config.pe_count(), config.imem_depth),
        }
    }

    /// Record a placed kernel and move the counters past it
    fn commit(&mut self, layout: &KernelLayout) {
        self.config_words.push(layout.config_word);
        self.next_free_address += layout.footprint();
        self.next_kernel_id += 1;
    }
}

/// Assembler owning the fabric description and the run state
pub struct Assembler {
    config: FabricConfig,
    remap: GridRemap,
    state: CompilerState,
}

impl Assembler {
    pub fn new(config: FabricConfig) -> AsmResult<Self> {
        config.validate()?;
        let remap = GridRemap::new(config.remap.clone())?;
        let state = CompilerState::new(&config);
        Ok(Self { config, remap, state })
    }

    pub fn state(&self) -> &CompilerState {
        &self.state
    }

    /// Start an independent run
    pub fn reset(&mut self) {
        self.state = CompilerState::new(&self.config);
    }

    /// Assemble one kernel source and place it in the instruction memory
    ///
    /// On error the state is left as it was before the call.
    pub fn assemble_kernel(&mut self, source: &str) -> AsmResult<Kernel> {
        let kernel_id = self.state.next_kernel_id;
        self.build_kernel(kernel_id, source)
            .map_err(|err| err.in_kernel(kernel_id))
    }

    fn build_kernel(&mut self, kernel_id: usize, source: &str) -> AsmResult<Kernel> {
        let start_address = self.state.next_free_address;

        let lines = demultiplex(source, self.config.pe_count())?;
        debug!(kernel_id, steps = lines.steps(), "demultiplexed schedule");

        let (translated, diagnostics) = self.translate_schedule(&lines)?;
        let schedule = self.remap.apply(&translated)?;

        let layout = pack_kernel(&schedule, start_address, &self.config)?;
        self.state.memory.place(&schedule, start_address)?;
        self.state.commit(&layout);

        info!(
            kernel_id,
            start_address,
            instructions = layout.instruction_count,
            columns = layout.active_column_count,
            config_word = %layout.config_word,
            "kernel assembled"
        );

        Ok(Kernel {
            id: kernel_id,
            start_address,
            instruction_count: layout.instruction_count,
            active_columns: layout.active_columns,
            active_column_count: layout.active_column_count,
            config_word: layout.config_word,
            schedule,
            diagnostics,
        })
    }

    /// Decode and translate every cell, still in source PE order
    fn translate_schedule(
        &self,
        lines: &Schedule<SourceLine>,
    ) -> AsmResult<(Schedule<TargetInstruction>, Vec<LocatedDiagnostic>)> {
        let decoder = Decoder::new(&self.config);
        let translator = Translator::new(&self.config);
        let mut diagnostics = Vec::new();

        let translated = lines.try_map(|pe, step, line| {
            let canonical = decoder.decode(line)?;
            let translation = translator.translate(&canonical);
            for diagnostic in translation.diagnostics {
                warn!(line = line.line, pe, step, "{}", diagnostic);
                diagnostics.push(LocatedDiagnostic {
                    pe,
                    step,
                    line: line.line,
                    diagnostic,
                });
            }
            Ok::<_, AsmError>(translation.instruction)
        })?;

        Ok((translated, diagnostics))
    }

    /// Hand over everything assembled in this run
    pub fn finish(self, kernels: Vec<Kernel>) -> AssembledProgram {
        AssembledProgram {
            config: self.config,
            kernels,
            config_words: self.state.config_words,
            memory: self.state.memory,
        }
    }
}

/// Output of a complete run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledProgram {
    pub config: FabricConfig,
    pub kernels: Vec<Kernel>,
    pub config_words: Vec<ConfigurationWord>,
    pub memory: InstructionMemory,
}

impl AssembledProgram {
    /// Export to JSON format
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Configuration words followed by the instruction-memory table
    pub fn to_listing(&self) -> String {
        let mut output = String::new();
        output.push_str("// Kernel configuration words\n");
        for (id, word) in self.config_words.iter().enumerate() {
            output.push_str(&format!("kernel {}: {}\n", id, word));
        }
        output.push_str("\n// Instruction memory\n");
        output.push_str(&self.memory.to_listing());
        output
    }
}

impl fmt::Display for AssembledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Assembled Program")?;
        writeln!(f, "=================")?;
        writeln!(f, "Target: {}x{} CGRA", self.config.n_row, self.config.n_col)?;
        writeln!(f, "Instruction memory: {} words per PE", self.config.imem_depth)?;
        writeln!(f, "Kernels: {}", self.kernels.len())?;
        writeln!(f, "Memory used: {} words", self.memory.used_depth())?;
        writeln!(f)?;

        for kernel in &self.kernels {
            writeln!(f, "Kernel {}:", kernel.id)?;
            writeln!(f, "  Start address: {}", kernel.start_address)?;
            writeln!(f, "  Instructions: {}", kernel.instruction_count)?;
            writeln!(f, "  Active columns: {:#b} ({})", kernel.active_columns.0, kernel.active_column_count)?;
            writeln!(f, "  Configuration word: {}", kernel.config_word)?;
            for diagnostic in &kernel.diagnostics {
                writeln!(f, "  warning: {}", diagnostic)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
