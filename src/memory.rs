//! Shared instruction-memory image

use serde::{Deserialize, Serialize};

use crate::error::{AsmError, AsmResult};
use crate::instruction::TargetInstruction;
use crate::schedule::Schedule;

/// Instruction memories of every PE, indexed by `(pe, address)`
///
/// Cells never written by a kernel are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionMemory {
    depth: usize,
    words: Vec<Vec<Option<TargetInstruction>>>,
}

impl InstructionMemory {
    pub fn new(pe_count: usize, depth: usize) -> Self {
        Self {
            depth,
            words: vec![vec![None; depth]; pe_count],
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn pe_count(&self) -> usize {
        self.words.len()
    }

    pub fn get(&self, pe: usize, address: usize) -> Option<&TargetInstruction> {
        self.words.get(pe)?.get(address)?.as_ref()
    }

    /// Words of one PE's memory, `None` past the last PE
    pub fn row(&self, pe: usize) -> Option<&[Option<TargetInstruction>]> {
        self.words.get(pe).map(Vec::as_slice)
    }

    /// One past the highest address written in any PE
    pub fn used_depth(&self) -> usize {
        self.words
            .iter()
            .filter_map(|row| row.iter().rposition(Option::is_some))
            .max()
            .map_or(0, |last| last + 1)
    }

    /// Write `schedule[pe][t]` to address `start_address + t` of every PE
    ///
    /// Nothing is written if the kernel does not fit.
    pub fn place(
        &mut self,
        schedule: &Schedule<TargetInstruction>,
        start_address: usize,
    ) -> AsmResult<()> {
        if schedule.pe_count() != self.pe_count() {
            return Err(AsmError::malformed(
                0,
                format!(
                    "schedule has {} PEs, instruction memory has {}",
                    schedule.pe_count(),
                    self.pe_count()
                ),
            ));
        }

        let end = start_address
            .checked_add(schedule.steps())
            .filter(|&end| end <= self.depth)
            .ok_or_else(|| {
                AsmError::capacity(format!(
                    "{} instructions at address {} overflow the {}-word instruction memory",
                    schedule.steps(),
                    start_address,
                    self.depth
                ))
            })?;

        for (row, instructions) in self.words.iter_mut().zip(schedule.rows()) {
            for (slot, instr) in row[start_address..end].iter_mut().zip(instructions) {
                *slot = Some(instr.clone());
            }
        }
        Ok(())
    }

    /// Per-PE, per-address text table of the written words
    pub fn to_listing(&self) -> String {
        let mut output = String::new();
        let used = self.used_depth();
        for (pe, row) in self.words.iter().enumerate() {
            output.push_str(&format!("PE {}\n", pe));
            for (address, word) in row[..used].iter().enumerate() {
                match word {
                    Some(instr) => output.push_str(&format!("  {:4}: {}\n", address, instr)),
                    None => output.push_str(&format!("  {:4}: <empty>\n", address)),
                }
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kernel(pe_count: usize, steps: usize) -> Schedule<TargetInstruction> {
        let rows = (0..pe_count)
            .map(|pe| {
                (0..steps)
                    .map(|t| TargetInstruction::new("R0", "IMM", "SADD", "R1", "-", &format!("{}", pe * 10 + t)))
                    .collect()
            })
            .collect();
        Schedule::from_rows(rows).unwrap()
    }

    #[test]
    fn test_place_at_offset() {
        let mut memory = InstructionMemory::new(16, 64);
        let schedule = kernel(16, 4);
        memory.place(&schedule, 16).unwrap();

        for pe in 0..16 {
            for address in 0..64 {
                match memory.get(pe, address) {
                    Some(instr) => {
                        assert!((16..20).contains(&address), "PE {} address {}", pe, address);
                        assert_eq!(instr, &schedule.row(pe).unwrap()[address - 16]);
                    }
                    None => assert!(!(16..20).contains(&address), "PE {} address {}", pe, address),
                }
            }
        }
        assert_eq!(memory.used_depth(), 20);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut memory = InstructionMemory::new(2, 8);
        assert!(memory.place(&kernel(2, 4), 4).is_ok());

        let result = memory.place(&kernel(2, 4), 5);
        assert!(matches!(result, Err(AsmError::CapacityExceeded { .. })));
        // failed placement leaves the image alone
        assert_eq!(memory.get(0, 5).unwrap().immediate, "1");
    }

    #[test]
    fn test_row_access() {
        let mut memory = InstructionMemory::new(2, 4);
        memory.place(&kernel(2, 1), 2).unwrap();
        let row = memory.row(1).unwrap();
        assert_eq!(row.len(), 4);
        assert!(row[1].is_none());
        assert!(row[2].is_some());
        assert!(memory.row(2).is_none());
    }

    #[test]
    fn test_pe_count_mismatch() {
        let mut memory = InstructionMemory::new(4, 8);
        assert!(matches!(
            memory.place(&kernel(2, 1), 0),
            Err(AsmError::MalformedSchedule { .. })
        ));
    }

    #[test]
    fn test_listing() {
        let mut memory = InstructionMemory::new(1, 8);
        memory.place(&kernel(1, 1), 1).unwrap();
        assert_eq!(
            memory.to_listing(),
            "PE 0\n     0: <empty>\n     1: R0, IMM, SADD, R1, -, 0\n"
        );
    }
}
