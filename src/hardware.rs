//! Fabric description for the target CGRA
//!
//! Every geometry constant and operand vocabulary the assembler relies on
//! lives in [`FabricConfig`], so a different fabric only needs a different
//! configuration file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AsmError, AsmResult};
use crate::remap::GridRemap;

/// Target PE `t` is fed by source PE `TRANSPOSE_4X4[t]`.
///
/// The source dialect numbers PEs column by column while the fabric numbers
/// them row by row, so on a square grid the remap is a transpose.
pub const TRANSPOSE_4X4: [usize; 16] = [0, 4, 8, 12, 1, 5, 9, 13, 2, 6, 10, 14, 3, 7, 11, 15];

/// Selectors understood by the PE input multiplexers
pub const MUX_OPERANDS: [&str; 13] = [
    "SRAM", "RCL", "RCR", "RCT", "RCB", "R0", "R1", "R2", "R3", "ZEROS", "-", "ROUTA", "Rout",
];

/// Registers an instruction may write back to
pub const REGISTER_DESTINATIONS: [&str; 5] = ["R0", "R1", "R2", "R3", "Rout"];

/// Operations implemented by the fabric ALU and load/store unit
pub const OPERATIONS: [&str; 25] = [
    "NOP", "SADD", "SSUB", "SMUL", "SDIV", "SLL", "SRL", "SRA", "LAND", "LOR", "LXOR",
    "INB_SF_INA", "INB_ZF_INA", "FXP_MUL", "FXP_DIV", "BEQ", "BNE", "BLT", "BGE", "JUMP",
    "LWD", "SWD", "LWI", "SWI", "EXIT",
];

/// How the decoder treats mnemonics outside the operation vocabulary
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    /// Pass unknown mnemonics through unchanged
    #[default]
    Lenient,
    /// Reject unknown mnemonics
    Strict,
}

/// How the column-enable field of a configuration word is filled
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMaskEncoding {
    /// One bit per column that holds a non-NOP instruction
    #[default]
    Occupied,
    /// The low `active_column_count` bits set, for fabrics that relocate a
    /// kernel onto the leading columns
    Packed,
}

/// Configuration for the CGRA fabric and its instruction memory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FabricConfig {
    /// PEs per column
    pub n_row: usize,
    /// Number of columns
    pub n_col: usize,
    /// Words of instruction memory per PE
    pub imem_depth: usize,
    /// Width of the start-address field of a configuration word
    pub imem_address_bits: u32,
    /// Longest kernel, in time steps
    pub max_kernel_instructions: usize,
    /// Width of the instruction-count field of a configuration word
    pub kernel_length_bits: u32,
    /// Grid remap, target PE -> source PE; PEs past the end keep their index
    pub remap: Vec<usize>,
    pub mux_operands: Vec<String>,
    pub register_destinations: Vec<String>,
    pub operations: Vec<String>,
    pub decode_mode: DecodeMode,
    pub column_mask_encoding: ColumnMaskEncoding,
}

impl FabricConfig {
    /// The 4x4 fabric with 512-word instruction memories and kernels of up
    /// to 64 steps
    pub fn default_4x4() -> Self {
        Self {
            n_row: 4,
            n_col: 4,
            imem_depth: 512,
            imem_address_bits: 9,
            max_kernel_instructions: 64,
            kernel_length_bits: 6,
            remap: TRANSPOSE_4X4.to_vec(),
            mux_operands: MUX_OPERANDS.iter().map(|s| s.to_string()).collect(),
            register_destinations: REGISTER_DESTINATIONS.iter().map(|s| s.to_string()).collect(),
            operations: OPERATIONS.iter().map(|s| s.to_string()).collect(),
            decode_mode: DecodeMode::Lenient,
            column_mask_encoding: ColumnMaskEncoding::Occupied,
        }
    }

    /// Total number of processing elements
    pub fn pe_count(&self) -> usize {
        self.n_row * self.n_col
    }

    /// Column a PE belongs to, PEs being grouped column after column
    pub fn column_of(&self, pe: usize) -> usize {
        pe / self.n_row
    }

    /// Width of a packed configuration word
    pub fn config_word_bits(&self) -> u32 {
        self.n_col as u32 + self.imem_address_bits + self.kernel_length_bits
    }

    pub fn is_mux_operand(&self, token: &str) -> bool {
        self.mux_operands.iter().any(|m| m == token)
    }

    pub fn is_register_destination(&self, token: &str) -> bool {
        self.register_destinations.iter().any(|r| r == token)
    }

    pub fn is_operation(&self, token: &str) -> bool {
        self.operations.iter().any(|o| o == token)
    }

    /// Parse a configuration from JSON; missing keys take the 4x4 defaults
    pub fn from_json_str(json: &str) -> AsmResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> AsmResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| AsmError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check that the geometry, field widths and remap table are consistent
    pub fn validate(&self) -> AsmResult<()> {
        if self.n_row == 0 || self.n_col == 0 {
            return Err(AsmError::config("grid must have at least one row and one column"));
        }
        if self.imem_depth == 0 || self.max_kernel_instructions == 0 {
            return Err(AsmError::config("memory depth and kernel length must be non-zero"));
        }
        if !fits_in(self.imem_depth - 1, self.imem_address_bits) {
            return Err(AsmError::config(format!(
                "{} address bits cannot address {} words",
                self.imem_address_bits, self.imem_depth
            )));
        }
        if !fits_in(self.max_kernel_instructions - 1, self.kernel_length_bits) {
            return Err(AsmError::config(format!(
                "{} length bits cannot encode kernels of {} instructions",
                self.kernel_length_bits, self.max_kernel_instructions
            )));
        }
        if self.config_word_bits() > 64 {
            return Err(AsmError::config(format!(
                "configuration word of {} bits does not fit in 64 bits",
                self.config_word_bits()
            )));
        }
        if self.remap.len() > self.pe_count() {
            return Err(AsmError::config(format!(
                "remap table has {} entries for {} PEs",
                self.remap.len(),
                self.pe_count()
            )));
        }
        GridRemap::new(self.remap.clone())?;
        Ok(())
    }
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self::default_4x4()
    }
}

/// Whether `value` can be represented in `bits` bits
pub fn fits_in(value: usize, bits: u32) -> bool {
    bits >= usize::BITS || (value >> bits) == 0
}
