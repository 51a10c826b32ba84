//! Lexer for source-dialect instruction lines using logos
//!
//! A line such as `ADD R1, -4 -> R3` splits into:
//! - Words: mnemonics, registers, selectors, literals (`-4` stays one word)
//! - Separators: runs of spaces, tabs and commas
//! - Arrows: `->` or a bare `>`, the writeback marker
//! - Dashes: a `-` not glued to the following word

use logos::Logos;

/// Token types for one instruction line
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    #[regex(r"-?[^ \t\r\n,>\-]+", |lex| lex.slice().to_string())]
    Word(String),

    #[regex(r"[ \t\r\n,]+")]
    Separator,

    #[token("->")]
    #[token(">")]
    Arrow,

    #[token("-")]
    Dash,
}

/// Lexer wrapper over the logos token stream
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Token>,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: Token::lexer(source),
        }
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Result<Token, ()>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
