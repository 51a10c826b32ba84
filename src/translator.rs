//! Translator from canonical instructions to the fabric's six-field format
//!
//! Operand B is either a mux selector or an immediate literal. Destinations
//! and operand A selectors outside the fabric vocabularies are replaced with a
//! fallback value and reported as a [`Diagnostic`]; translation never fails.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hardware::FabricConfig;
use crate::instruction::{CanonicalInstruction, TargetInstruction, IMMEDIATE_TAG, NONE};

/// Kind of substitution made during translation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FallbackKind {
    /// Destination outside the register set (absolute branch targets are not
    /// supported), forced to `R3`
    DestinationFallback,
    /// `ROUTA` as operand A, read as `R0`
    RoutaAlias,
    /// Operand A outside the mux vocabulary, forced to `ZEROS`
    SelectorFallback,
    /// `Rout` as destination, written to `R1`, the single output register
    RoutAlias,
    /// Third operand replaced by the writeback target
    DisplacedOperand,
}

/// A non-fatal substitution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: FallbackKind,
    pub original: String,
    pub substituted: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.kind {
            FallbackKind::DestinationFallback => "absolute destination not supported",
            FallbackKind::RoutaAlias => "ROUTA read as R0",
            FallbackKind::SelectorFallback => "selector not in mux vocabulary",
            FallbackKind::RoutAlias => "Rout written as R1",
            FallbackKind::DisplacedOperand => "third operand replaced by writeback target",
        };
        write!(f, "{}: '{}' -> '{}'", reason, self.original, self.substituted)
    }
}

/// Result of translating one instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub instruction: TargetInstruction,
    pub diagnostics: Vec<Diagnostic>,
}

/// Translator for one fabric configuration
pub struct Translator<'cfg> {
    config: &'cfg FabricConfig,
}

impl<'cfg> Translator<'cfg> {
    pub fn new(config: &'cfg FabricConfig) -> Self {
        Self { config }
    }

    pub fn translate(&self, instr: &CanonicalInstruction) -> Translation {
        let mut diagnostics = Vec::new();

        if instr.operation == "NOP" {
            return Translation {
                instruction: TargetInstruction::nop(),
                diagnostics,
            };
        }

        let (source_b, immediate) = if self.config.is_mux_operand(&instr.operand2) {
            (instr.operand2.as_str(), NONE)
        } else {
            (IMMEDIATE_TAG, instr.operand2.as_str())
        };

        let mut destination = instr.operand3.clone();
        if instr.writeback != NONE {
            if destination == NONE {
                destination = instr.writeback.clone();
            } else {
                substitute(&mut destination, &instr.writeback, FallbackKind::DisplacedOperand, &mut diagnostics);
            }
        }

        let mut target = TargetInstruction::new(
            &instr.operand1,
            source_b,
            &instr.operation,
            &destination,
            NONE,
            immediate,
        );

        if target.destination != NONE && !self.config.is_register_destination(&target.destination) {
            substitute(&mut target.destination, "R3", FallbackKind::DestinationFallback, &mut diagnostics);
        }

        if target.source_a == "ROUTA" {
            substitute(&mut target.source_a, "R0", FallbackKind::RoutaAlias, &mut diagnostics);
        } else if !self.config.is_mux_operand(&target.source_a) {
            substitute(&mut target.source_a, "ZEROS", FallbackKind::SelectorFallback, &mut diagnostics);
        }

        if target.destination == "Rout" {
            substitute(&mut target.destination, "R1", FallbackKind::RoutAlias, &mut diagnostics);
        }

        Translation {
            instruction: target,
            diagnostics,
        }
    }
}

fn substitute(
    field: &mut String,
    value: &str,
    kind: FallbackKind,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let original = std::mem::replace(field, value.to_string());
    diagnostics.push(Diagnostic {
        kind,
        original,
        substituted: value.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decoder;
    use crate::instruction::SourceLine;
    use pretty_assertions::assert_eq;

    fn translate(instr: &CanonicalInstruction) -> Translation {
        let config = FabricConfig::default_4x4();
        Translator::new(&config).translate(instr)
    }

    #[test]
    fn test_add_end_to_end() {
        let config = FabricConfig::default_4x4();
        let canonical = Decoder::new(&config)
            .decode(&SourceLine::new("ADD R1, R2 -> R3\n", 1))
            .unwrap();
        assert_eq!(canonical.fields(), ["SADD", "R1", "R2", "R3", "-"]);

        let translation = Translator::new(&config).translate(&canonical);
        assert_eq!(translation.instruction.fields(), ["R1", "R2", "SADD", "R3", "-", "-"]);
        assert!(translation.diagnostics.is_empty());
    }

    #[test]
    fn test_nop_ignores_other_fields() {
        for instr in [
            CanonicalInstruction::new("NOP", "-", "-", "-", "-"),
            CanonicalInstruction::new("NOP", "R1", "42", "label", "R2"),
        ] {
            let translation = translate(&instr);
            assert_eq!(translation.instruction, TargetInstruction::nop());
            assert!(translation.diagnostics.is_empty());
        }
    }

    #[test]
    fn test_mux_operand_b() {
        for selector in ["SRAM", "RCL", "RCR", "RCT", "RCB", "R2", "ZEROS", "-"] {
            let instr = CanonicalInstruction::new("SADD", "R0", selector, "R1", "-");
            let out = translate(&instr).instruction;
            assert_eq!(out.source_b, selector);
            assert_eq!(out.immediate, "-");
        }
    }

    #[test]
    fn test_immediate_operand_b() {
        for literal in ["5", "-7", "0x1F", "label"] {
            let instr = CanonicalInstruction::new("SADD", "R0", literal, "R1", "-");
            let out = translate(&instr).instruction;
            assert_eq!(out.source_b, "IMM");
            assert_eq!(out.immediate, literal);
        }
    }

    #[test]
    fn test_destination_fallback() {
        let instr = CanonicalInstruction::new("BEQ", "R0", "ZEROS", "loop", "-");
        let translation = translate(&instr);
        assert_eq!(translation.instruction.fields(), ["R0", "ZEROS", "BEQ", "R3", "-", "-"]);
        assert_eq!(
            translation.diagnostics,
            vec![Diagnostic {
                kind: FallbackKind::DestinationFallback,
                original: "loop".to_string(),
                substituted: "R3".to_string(),
            }]
        );
    }

    #[test]
    fn test_source_a_normalization() {
        let routa = translate(&CanonicalInstruction::new("SADD", "ROUTA", "R1", "-", "-"));
        assert_eq!(routa.instruction.source_a, "R0");
        assert_eq!(routa.diagnostics[0].kind, FallbackKind::RoutaAlias);

        let unknown = translate(&CanonicalInstruction::new("SADD", "42", "R1", "-", "-"));
        assert_eq!(unknown.instruction.source_a, "ZEROS");
        assert_eq!(unknown.diagnostics[0].kind, FallbackKind::SelectorFallback);
        assert_eq!(unknown.diagnostics[0].original, "42");
    }

    #[test]
    fn test_rout_destination() {
        let translation = translate(&CanonicalInstruction::new("SMUL", "R0", "RCL", "Rout", "-"));
        assert_eq!(translation.instruction.destination, "R1");
        assert_eq!(translation.diagnostics.len(), 1);
        assert_eq!(translation.diagnostics[0].kind, FallbackKind::RoutAlias);
    }

    #[test]
    fn test_writeback_register_reaches_destination() {
        let translation = translate(&CanonicalInstruction::new("SADD", "R0", "R1", "-", "R2"));
        assert_eq!(translation.instruction.destination, "R2");
        assert!(translation.diagnostics.is_empty());

        let both = translate(&CanonicalInstruction::new("BEQ", "R0", "ZEROS", "loop", "R2"));
        assert_eq!(both.instruction.fields(), ["R0", "ZEROS", "BEQ", "R2", "-", "-"]);
        assert_eq!(
            both.diagnostics,
            vec![Diagnostic {
                kind: FallbackKind::DisplacedOperand,
                original: "loop".to_string(),
                substituted: "R2".to_string(),
            }]
        );
    }

    #[test]
    fn test_multiple_fallbacks_are_all_recorded() {
        let translation = translate(&CanonicalInstruction::new("BNE", "foo", "3", "end", "-"));
        assert_eq!(translation.instruction.fields(), ["ZEROS", "IMM", "BNE", "R3", "-", "3"]);
        let kinds: Vec<_> = translation.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![FallbackKind::DestinationFallback, FallbackKind::SelectorFallback]);
    }
}
