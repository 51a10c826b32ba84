//! PE grid remapping between the source and fabric numbering conventions

use crate::error::{AsmError, AsmResult};
use crate::schedule::Schedule;

/// Constant permutation of PE indices
///
/// Entry `t` of the table names the source PE whose instructions land at
/// target PE `t`. PEs past the end of the table keep their index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRemap {
    table: Vec<usize>,
}

impl GridRemap {
    /// Fails unless `table` is a permutation of `0..table.len()`
    pub fn new(table: Vec<usize>) -> AsmResult<Self> {
        let mut seen = vec![false; table.len()];
        for (target, &source) in table.iter().enumerate() {
            match seen.get_mut(source) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(AsmError::config(format!(
                        "remap entry {} -> {} breaks the permutation",
                        target, source
                    )))
                }
            }
        }
        Ok(Self { table })
    }

    /// Source PE feeding target PE `target`
    pub fn source_of(&self, target: usize) -> usize {
        self.table.get(target).copied().unwrap_or(target)
    }

    pub fn inverse(&self) -> Self {
        let mut table = vec![0; self.table.len()];
        for (target, &source) in self.table.iter().enumerate() {
            table[source] = target;
        }
        Self { table }
    }

    /// Reorder the PE rows of a schedule into target order
    pub fn apply<T: Clone>(&self, schedule: &Schedule<T>) -> AsmResult<Schedule<T>> {
        if self.table.len() > schedule.pe_count() {
            return Err(AsmError::config(format!(
                "remap covers {} PEs but the schedule has {}",
                self.table.len(),
                schedule.pe_count()
            )));
        }
        let rows = (0..schedule.pe_count())
            .map(|target| {
                let source = self.source_of(target);
                schedule.row(source).map(<[T]>::to_vec).ok_or_else(|| {
                    AsmError::config(format!("remap source PE {} is outside the schedule", source))
                })
            })
            .collect::<AsmResult<Vec<_>>>()?;
        Schedule::from_rows(rows)
    }
}
