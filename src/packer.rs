//! Kernel configuration words
//!
//! A configuration word tells the fabric which columns take part in a kernel,
//! where its instructions start, and how many there are:
//!
//! ```text
//! | column mask (n_col) | start address (imem_address_bits) | count - 1 (kernel_length_bits) |
//! ```
//!
//! The mask is the most significant field; column 0 is its lowest bit.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AsmError, AsmResult};
use crate::hardware::{fits_in, ColumnMaskEncoding, FabricConfig};
use crate::instruction::TargetInstruction;
use crate::schedule::Schedule;

/// Set of fabric columns, column `c` being bit `c`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMask(pub u64);

impl ColumnMask {
    /// The low `count` columns
    pub fn leading(count: usize) -> Self {
        if count >= 64 {
            ColumnMask(u64::MAX)
        } else {
            ColumnMask((1u64 << count) - 1)
        }
    }

    pub fn set(&mut self, column: usize) {
        self.0 |= 1u64 << column;
    }

    pub fn contains(&self, column: usize) -> bool {
        self.0 & (1u64 << column) != 0
    }

    pub fn count(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Packed kernel configuration word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationWord {
    pub column_mask: ColumnMask,
    pub start_address: usize,
    /// Instruction count minus one
    pub last_instruction: usize,
    pub mask_bits: u32,
    pub address_bits: u32,
    pub length_bits: u32,
}

impl ConfigurationWord {
    pub fn width(&self) -> u32 {
        self.mask_bits + self.address_bits + self.length_bits
    }

    /// The word as an integer, mask in the high bits
    pub fn bits(&self) -> u64 {
        let length = self.last_instruction as u64;
        let address = (self.start_address as u64) << self.length_bits;
        let mask = self.column_mask.0 << (self.address_bits + self.length_bits);
        mask | address | length
    }

    /// The word as an MSB-first binary string of exactly `width()` digits
    pub fn to_bit_string(&self) -> String {
        format!("{:0width$b}", self.bits(), width = self.width() as usize)
    }
}

impl fmt::Display for ConfigurationWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bit_string())
    }
}

/// Configuration word and layout metadata for one kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelLayout {
    pub config_word: ConfigurationWord,
    /// Columns holding at least one non-NOP instruction
    pub active_columns: ColumnMask,
    pub active_column_count: usize,
    pub instruction_count: usize,
}

impl KernelLayout {
    /// Instruction-memory words the kernel accounts for across its columns
    pub fn footprint(&self) -> usize {
        self.instruction_count * self.active_column_count
    }
}

/// Columns in which some PE holds a non-NOP instruction
pub fn active_columns(schedule: &Schedule<TargetInstruction>, config: &FabricConfig) -> ColumnMask {
    let mut mask = ColumnMask::default();
    for (pe, row) in schedule.rows().enumerate() {
        let column = config.column_of(pe);
        if !mask.contains(column) && row.iter().any(|instr| !instr.is_nop()) {
            mask.set(column);
        }
    }
    mask
}

/// Derive the configuration word of a translated, remapped schedule
pub fn pack_kernel(
    schedule: &Schedule<TargetInstruction>,
    start_address: usize,
    config: &FabricConfig,
) -> AsmResult<KernelLayout> {
    if schedule.pe_count() != config.pe_count() {
        return Err(AsmError::malformed(
            0,
            format!(
                "schedule has {} PEs, fabric has {}",
                schedule.pe_count(),
                config.pe_count()
            ),
        ));
    }

    let instruction_count = schedule.steps();
    if instruction_count == 0 {
        return Err(AsmError::malformed(0, "kernel has no instructions"));
    }
    if instruction_count > config.max_kernel_instructions
        || !fits_in(instruction_count - 1, config.kernel_length_bits)
    {
        return Err(AsmError::capacity(format!(
            "kernel has {} instructions, at most {} allowed",
            instruction_count, config.max_kernel_instructions
        )));
    }
    if start_address >= config.imem_depth || !fits_in(start_address, config.imem_address_bits) {
        return Err(AsmError::capacity(format!(
            "start address {} is outside the {}-word instruction memory",
            start_address, config.imem_depth
        )));
    }

    let active = active_columns(schedule, config);
    let active_column_count = active.count();
    let column_mask = match config.column_mask_encoding {
        ColumnMaskEncoding::Occupied => active,
        ColumnMaskEncoding::Packed => ColumnMask::leading(active_column_count),
    };

    Ok(KernelLayout {
        config_word: ConfigurationWord {
            column_mask,
            start_address,
            last_instruction: instruction_count - 1,
            mask_bits: config.n_col as u32,
            address_bits: config.imem_address_bits,
            length_bits: config.kernel_length_bits,
        },
        active_columns: active,
        active_column_count,
        instruction_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn add() -> TargetInstruction {
        TargetInstruction::new("R1", "R2", "SADD", "R3", "-", "-")
    }

    /// 16 PEs of `steps` NOPs, with `add()` at the given (pe, step) cells
    fn schedule(steps: usize, busy: &[(usize, usize)]) -> Schedule<TargetInstruction> {
        let mut rows = vec![vec![TargetInstruction::nop(); steps]; 16];
        for &(pe, step) in busy {
            rows[pe][step] = add();
        }
        Schedule::from_rows(rows).unwrap()
    }

    #[test]
    fn test_all_nop_kernel() {
        let config = FabricConfig::default_4x4();
        let layout = pack_kernel(&schedule(3, &[]), 0, &config).unwrap();
        assert_eq!(layout.active_column_count, 0);
        assert!(layout.active_columns.is_empty());
        assert!(layout.config_word.column_mask.is_empty());
        assert_eq!(layout.instruction_count, 3);
        assert_eq!(layout.footprint(), 0);
        assert_eq!(layout.config_word.to_bit_string(), "0000000000000000010");
    }

    #[test]
    fn test_column_detection() {
        let config = FabricConfig::default_4x4();
        // PE 3 is the last PE of column 0, PE 9 is in column 2
        let layout = pack_kernel(&schedule(4, &[(3, 2), (9, 0)]), 16, &config).unwrap();
        assert_eq!(layout.active_columns, ColumnMask(0b0101));
        assert_eq!(layout.active_column_count, 2);
        assert_eq!(layout.footprint(), 8);
        assert_eq!(layout.config_word.to_bit_string(), "0101000010000000011");
        assert_eq!(
            layout.config_word.bits(),
            (0b0101 << 15) | (16 << 6) | 3
        );
    }

    #[test]
    fn test_packed_mask_encoding() {
        let config = FabricConfig {
            column_mask_encoding: ColumnMaskEncoding::Packed,
            ..FabricConfig::default_4x4()
        };
        let layout = pack_kernel(&schedule(1, &[(15, 0), (8, 0)]), 0, &config).unwrap();
        assert_eq!(layout.active_columns, ColumnMask(0b1100));
        assert_eq!(layout.config_word.column_mask, ColumnMask(0b0011));
    }

    #[test]
    fn test_active_count_bounded_by_columns() {
        let config = FabricConfig::default_4x4();
        let busy: Vec<_> = (0..16).map(|pe| (pe, 0)).collect();
        let layout = pack_kernel(&schedule(2, &busy), 0, &config).unwrap();
        assert_eq!(layout.active_column_count, config.n_col);
        assert_eq!(layout.config_word.column_mask, ColumnMask(0b1111));
    }

    #[test]
    fn test_kernel_too_long() {
        let config = FabricConfig::default_4x4();
        assert!(pack_kernel(&schedule(64, &[]), 0, &config).is_ok());
        let result = pack_kernel(&schedule(65, &[]), 0, &config);
        assert!(matches!(result, Err(AsmError::CapacityExceeded { .. })));
    }

    #[test]
    fn test_start_address_out_of_range() {
        let config = FabricConfig::default_4x4();
        let result = pack_kernel(&schedule(1, &[]), 512, &config);
        assert!(matches!(result, Err(AsmError::CapacityExceeded { .. })));
    }

    #[test]
    fn test_wrong_pe_count() {
        let config = FabricConfig::default_4x4();
        let small = Schedule::from_rows(vec![vec![add()]; 4]).unwrap();
        assert!(pack_kernel(&small, 0, &config).is_err());
    }
}
