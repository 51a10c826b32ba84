//! Per-PE schedules and the demultiplexer that builds them
//!
//! Kernel sources list one instruction per PE for each time step, steps being
//! separated by blank lines:
//!
//! ```text
//! ADD R1, R2 -> R3     <- PE 0, step 0
//! NOP                  <- PE 1, step 0
//!
//! SWD R3               <- PE 0, step 1
//! NOP                  <- PE 1, step 1
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{AsmError, AsmResult};
use crate::instruction::SourceLine;

/// Rectangular grid of cells indexed by `(pe, step)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule<T> {
    pes: Vec<Vec<T>>,
}

impl<T> Schedule<T> {
    /// Build a schedule from one row per PE; every row must have the same length
    pub fn from_rows(pes: Vec<Vec<T>>) -> AsmResult<Self> {
        if let Some(first) = pes.first() {
            let steps = first.len();
            if let Some((pe, row)) = pes.iter().enumerate().find(|(_, row)| row.len() != steps) {
                return Err(AsmError::malformed(
                    0,
                    format!("PE {} has {} instructions, expected {}", pe, row.len(), steps),
                ));
            }
        }
        Ok(Self { pes })
    }

    pub fn pe_count(&self) -> usize {
        self.pes.len()
    }

    /// Number of time steps, shared by every PE
    pub fn steps(&self) -> usize {
        self.pes.first().map_or(0, Vec::len)
    }

    pub fn get(&self, pe: usize, step: usize) -> Option<&T> {
        self.pes.get(pe).and_then(|row| row.get(step))
    }

    /// Time-ordered cells of one PE, `None` past the last PE
    pub fn row(&self, pe: usize) -> Option<&[T]> {
        self.pes.get(pe).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.pes.iter().map(Vec::as_slice)
    }

    pub fn into_rows(self) -> Vec<Vec<T>> {
        self.pes
    }

    /// Transform every cell, keeping its position
    pub fn try_map<U, E>(
        &self,
        mut f: impl FnMut(usize, usize, &T) -> Result<U, E>,
    ) -> Result<Schedule<U>, E> {
        let pes = self
            .pes
            .iter()
            .enumerate()
            .map(|(pe, row)| {
                row.iter()
                    .enumerate()
                    .map(|(step, cell)| f(pe, step, cell))
                    .collect::<Result<Vec<_>, E>>()
            })
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Schedule { pes })
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Schedule<U> {
        Schedule {
            pes: self.pes.iter().map(|row| row.iter().map(&mut f).collect()).collect(),
        }
    }
}

/// Split a kernel source into one time-ordered line sequence per PE
///
/// A blank line closes the current time step. Every step must list exactly
/// `pe_count` instructions.
pub fn demultiplex(source: &str, pe_count: usize) -> AsmResult<Schedule<SourceLine>> {
    let mut pes: Vec<Vec<SourceLine>> = (0..pe_count).map(|_| Vec::new()).collect();
    let mut cursor = 0;
    let mut last_line = 0;

    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        last_line = line;

        if text.trim().is_empty() {
            close_step(cursor, pe_count, line)?;
            cursor = 0;
            continue;
        }

        let row = pes.get_mut(cursor).ok_or_else(|| {
            AsmError::malformed(
                line,
                format!("more than {} instructions in one time step", pe_count),
            )
        })?;
        row.push(SourceLine::new(text, line));
        cursor += 1;
    }
    close_step(cursor, pe_count, last_line + 1)?;

    if pes.iter().all(Vec::is_empty) {
        return Err(AsmError::malformed(last_line, "schedule has no instructions"));
    }

    Schedule::from_rows(pes)
}

/// Check a time step that ends at `line` listed every PE
fn close_step(cursor: usize, pe_count: usize, line: usize) -> AsmResult<()> {
    if cursor == 0 || cursor == pe_count {
        Ok(())
    } else {
        Err(AsmError::malformed(
            line,
            format!(
                "time step lists {} instructions, expected {}",
                cursor, pe_count
            ),
        ))
    }
}
