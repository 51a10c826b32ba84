//! Decoder for source-dialect instruction lines
//!
//! Decodes lines like:
//! - `ADD R1, R2 -> R3`
//! - `MV R0 -> R1`
//! - `SWD Rout, SRAM`
//! - `BEQ R0, ZEROS, loop`
//!
//! into a [`CanonicalInstruction`], then applies the aliasing table that maps
//! source mnemonics and operands onto fabric names.

use tracing::{trace, warn};

use crate::error::{AsmError, AsmResult};
use crate::hardware::{DecodeMode, FabricConfig};
use crate::instruction::{CanonicalInstruction, SourceLine, NONE};
use crate::lexer::{Lexer, Token};

/// Operand slots in source order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandSlot {
    First,
    Second,
    Third,
}

impl OperandSlot {
    fn next(self) -> Option<Self> {
        match self {
            OperandSlot::First => Some(OperandSlot::Second),
            OperandSlot::Second => Some(OperandSlot::Third),
            OperandSlot::Third => None,
        }
    }
}

/// Decoder state while walking the tokens of one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Reading the mnemonic
    Operation,
    /// Reading an operand; `filled` once it holds text, so that repeated
    /// separators only advance past a non-empty field
    Operand { slot: OperandSlot, filled: bool },
    /// After the writeback marker; the target goes to `operand3` unless an
    /// explicit third operand was already given
    Writeback { into_operand3: bool },
    /// Three operands read; further words are set aside as trailing text
    Done,
}

/// Working fields of the instruction being decoded
#[derive(Debug, Default)]
struct Fields {
    operation: String,
    operands: [String; 3],
    writeback: String,
    trailing: Vec<String>,
}

impl Fields {
    fn operand_mut(&mut self, slot: OperandSlot) -> &mut String {
        match slot {
            OperandSlot::First => &mut self.operands[0],
            OperandSlot::Second => &mut self.operands[1],
            OperandSlot::Third => &mut self.operands[2],
        }
    }

    fn into_canonical(self) -> CanonicalInstruction {
        let [operand1, operand2, operand3] = self.operands.map(or_none);
        CanonicalInstruction {
            operation: or_none(self.operation),
            operand1,
            operand2,
            operand3,
            writeback: or_none(self.writeback),
        }
    }
}

fn or_none(field: String) -> String {
    if field.is_empty() {
        NONE.to_string()
    } else {
        field
    }
}

/// Decoder for one fabric configuration
pub struct Decoder<'cfg> {
    config: &'cfg FabricConfig,
}

impl<'cfg> Decoder<'cfg> {
    pub fn new(config: &'cfg FabricConfig) -> Self {
        Self { config }
    }

    /// Decode a line and apply the aliasing table
    pub fn decode(&self, line: &SourceLine) -> AsmResult<CanonicalInstruction> {
        let mut instr = decode_fields(line)?;
        apply_aliases(&mut instr);

        if self.config.decode_mode == DecodeMode::Strict
            && !self.config.is_operation(&instr.operation)
        {
            return Err(AsmError::unrecognized(line.line, line.text.trim()));
        }

        trace!(line = line.line, text = %line.text, decoded = %instr, "decoded");
        Ok(instr)
    }
}

/// Split a line into canonical fields, without aliasing
pub fn decode_fields(line: &SourceLine) -> AsmResult<CanonicalInstruction> {
    let mut fields = Fields::default();
    let mut state = DecodeState::Operation;

    for token in Lexer::new(&line.text).filter_map(Result::ok) {
        state = step(state, token, &mut fields);
    }

    if fields.operation.is_empty() {
        return Err(AsmError::unrecognized(line.line, line.text.trim()));
    }
    // operand3 and writeback are never both populated
    if !fields.operands[2].is_empty() && !fields.writeback.is_empty() {
        return Err(AsmError::malformed(
            line.line,
            format!(
                "'{}' has both a third operand and a writeback target",
                line.text.trim()
            ),
        ));
    }
    if !fields.trailing.is_empty() {
        warn!(
            line = line.line,
            ignored = %fields.trailing.join(" "),
            "text after the third operand ignored"
        );
    }

    Ok(fields.into_canonical())
}

/// One transition of the decoder
fn step(state: DecodeState, token: Token, fields: &mut Fields) -> DecodeState {
    match (state, token) {
        (DecodeState::Operation, Token::Word(word)) => {
            fields.operation.push_str(&word);
            DecodeState::Operation
        }
        (DecodeState::Operation, Token::Separator) => {
            if fields.operation.is_empty() {
                DecodeState::Operation
            } else {
                DecodeState::Operand { slot: OperandSlot::First, filled: false }
            }
        }
        (DecodeState::Operation, Token::Arrow | Token::Dash) => {
            DecodeState::Writeback { into_operand3: true }
        }

        (DecodeState::Operand { slot, .. }, Token::Word(word)) => {
            fields.operand_mut(slot).push_str(&word);
            DecodeState::Operand { slot, filled: true }
        }
        (DecodeState::Operand { slot, filled }, Token::Separator) => {
            if !filled {
                DecodeState::Operand { slot, filled }
            } else {
                match slot.next() {
                    Some(next) => DecodeState::Operand { slot: next, filled: false },
                    None => DecodeState::Done,
                }
            }
        }
        (DecodeState::Operand { .. }, Token::Arrow | Token::Dash) => DecodeState::Writeback {
            into_operand3: fields.operands[2].is_empty(),
        },

        (DecodeState::Writeback { into_operand3 }, Token::Word(word)) => {
            if into_operand3 {
                fields.operands[2].push_str(&word);
            } else {
                fields.writeback.push_str(&word);
            }
            DecodeState::Writeback { into_operand3 }
        }
        (state @ DecodeState::Writeback { .. }, _) => state,

        (DecodeState::Done, Token::Arrow | Token::Dash) => {
            DecodeState::Writeback { into_operand3: false }
        }
        (DecodeState::Done, Token::Word(word)) => {
            fields.trailing.push(word);
            DecodeState::Done
        }
        (DecodeState::Done, Token::Separator) => DecodeState::Done,
    }
}

/// Map source mnemonics and operands onto their fabric names
///
/// Two groups of rules run in order and the first match of each group wins.
/// Running this twice is the same as running it once.
pub fn apply_aliases(instr: &mut CanonicalInstruction) {
    match instr.operation.as_str() {
        "MV" => {
            // MV src -> dst becomes SADD with the source in operand 2
            let source = std::mem::replace(&mut instr.operand1, NONE.to_string());
            let other = std::mem::replace(&mut instr.operand2, source.clone());
            instr.operand1 = if other == NONE { source } else { other };
            instr.operation = "SADD".to_string();
        }
        "SUB" | "ADD" | "MUL" | "DIV" => {
            instr.operation = format!("S{}", instr.operation);
        }
        "SWD" if instr.operand1 == "Rout" => {
            instr.operand1 = "R1".to_string();
        }
        _ => {}
    }

    match instr.operand1.as_str() {
        "0" => instr.operand1 = "ZEROS".to_string(),
        "ROUTA" => instr.operand1 = "R0".to_string(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode(text: &str) -> CanonicalInstruction {
        let config = FabricConfig::default_4x4();
        Decoder::new(&config).decode(&SourceLine::new(text, 1)).unwrap()
    }

    #[test]
    fn test_add_with_writeback() {
        assert_eq!(decode("ADD R1, R2 -> R3").fields(), ["SADD", "R1", "R2", "R3", "-"]);
    }

    #[test]
    fn test_mv_swaps_operands() {
        assert_eq!(decode("MV R0 -> R1").fields(), ["SADD", "R0", "R0", "R1", "-"]);
        assert_eq!(decode("MV R0, RCL -> R2").fields(), ["SADD", "RCL", "R0", "R2", "-"]);
    }

    #[test]
    fn test_arithmetic_aliases() {
        assert_eq!(decode("SUB R1, R2").operation, "SSUB");
        assert_eq!(decode("MUL R1, R2").operation, "SMUL");
        assert_eq!(decode("DIV R1, R2").operation, "SDIV");
        assert_eq!(decode("LAND R1, R2").operation, "LAND");
    }

    #[test]
    fn test_swd_rout() {
        assert_eq!(decode("SWD Rout, SRAM").fields(), ["SWD", "R1", "SRAM", "-", "-"]);
        assert_eq!(decode("LWD Rout").operand1, "Rout");
    }

    #[test]
    fn test_operand1_aliases() {
        assert_eq!(decode("ADD 0, RCT -> R0").operand1, "ZEROS");
        assert_eq!(decode("SADD ROUTA, 5").operand1, "R0");
    }

    #[test]
    fn test_nop_and_missing_fields() {
        assert_eq!(decode("NOP").fields(), ["NOP", "-", "-", "-", "-"]);
        assert_eq!(decode("  NOP  ").fields(), ["NOP", "-", "-", "-", "-"]);
    }

    #[test]
    fn test_three_operands() {
        assert_eq!(decode("BEQ R0, ZEROS, loop").fields(), ["BEQ", "R0", "ZEROS", "loop", "-"]);
    }

    #[test]
    fn test_third_operand_and_writeback_rejected() {
        let config = FabricConfig::default_4x4();
        let decoder = Decoder::new(&config);
        for text in ["BEQ R0, ZEROS, loop -> R2", "BEQ R0, ZEROS, loop, -> R2", "BNE R1 R2 end>R0"] {
            let result = decoder.decode(&SourceLine::new(text, 9));
            assert!(
                matches!(result, Err(AsmError::MalformedSchedule { line: 9, .. })),
                "{:?} gave {:?}",
                text,
                result
            );
        }
    }

    #[test]
    fn test_decoded_destination_is_never_duplicated() {
        for text in ["ADD R1, R2 -> R3", "MV R0 -> R1", "BEQ R0, ZEROS, loop", "NOP", "SWD Rout, SRAM"] {
            let instr = decode(text);
            assert!(instr.operand3 == NONE || instr.writeback == NONE, "{:?} -> {}", text, instr);
        }
    }

    #[test]
    fn test_repeated_separators_collapse() {
        assert_eq!(decode("ADD  R1 ,  R2   ->R3").fields(), ["SADD", "R1", "R2", "R3", "-"]);
    }

    #[test]
    fn test_negative_immediate() {
        assert_eq!(decode("SADD RCL, -7 -> R1").fields(), ["SADD", "RCL", "-7", "R1", "-"]);
    }

    #[test]
    fn test_trailing_text_ignored() {
        assert_eq!(decode("BNE R1, R2, end extra words").operand3, "end");
    }

    #[test]
    fn test_trailing_words_are_kept_aside() {
        let mut fields = Fields::default();
        let mut state = DecodeState::Operation;
        for token in Lexer::new("BNE R1, R2, end extra, words").filter_map(Result::ok) {
            state = step(state, token, &mut fields);
        }
        assert_eq!(state, DecodeState::Done);
        assert_eq!(fields.operands[2], "end");
        assert_eq!(fields.trailing, vec!["extra".to_string(), "words".to_string()]);
    }

    #[test]
    fn test_empty_mnemonic() {
        let result = decode_fields(&SourceLine::new("   ", 4));
        assert!(matches!(result, Err(AsmError::UnrecognizedOperation { line: 4, .. })));
    }

    #[test]
    fn test_unknown_mnemonic_lenient_and_strict() {
        assert_eq!(decode("FROB R1").operation, "FROB");

        let config = FabricConfig {
            decode_mode: DecodeMode::Strict,
            ..FabricConfig::default_4x4()
        };
        let decoder = Decoder::new(&config);
        assert!(decoder.decode(&SourceLine::new("ADD R1, R2", 1)).is_ok());
        let result = decoder.decode(&SourceLine::new("FROB R1", 2));
        assert!(matches!(result, Err(AsmError::UnrecognizedOperation { line: 2, .. })));
    }

    #[test]
    fn test_aliasing_is_idempotent() {
        for text in ["MV R0 -> R1", "MV R2, RCB", "SUB R1, R2", "ADD 0, R1", "MUL ROUTA, 3", "DIV R1, R2"] {
            let once = decode(text);
            let mut twice = once.clone();
            apply_aliases(&mut twice);
            assert_eq!(once, twice, "aliasing {:?}", text);
        }
    }

    #[test]
    fn test_decoding_is_pure() {
        let config = FabricConfig::default_4x4();
        let decoder = Decoder::new(&config);
        let a = SourceLine::new("MV R0 -> R1", 1);
        let b = SourceLine::new("ADD R1, R2 -> R3", 2);
        let first = decoder.decode(&a).unwrap();
        decoder.decode(&b).unwrap();
        assert_eq!(decoder.decode(&a).unwrap(), first);
    }
}
