//! Shared token-cursor helper used by both the concept parser and the sync
//! parser. Parse failures report file/line/column and a one-sentence
//! diagnostic; no partial AST is ever returned — every parse
//! function either succeeds completely or returns `Err`.

use crate::lexer::{SpannedTok, Tok};
use concept_domain::ParseError;

pub struct Cursor<'a> {
    toks: &'a [SpannedTok],
    pos: usize,
    file: String,
}

impl<'a> Cursor<'a> {
    pub fn new(toks: &'a [SpannedTok], file: impl Into<String>) -> Self {
        Self { toks, pos: 0, file: file.into() }
    }

    pub fn peek(&self) -> &Tok {
        &self.toks[self.pos.min(self.toks.len() - 1)].tok
    }

    pub fn peek_at(&self, offset: usize) -> &Tok {
        let idx = (self.pos + offset).min(self.toks.len() - 1);
        &self.toks[idx].tok
    }

    fn current(&self) -> &SpannedTok {
        &self.toks[self.pos.min(self.toks.len() - 1)]
    }

    pub fn bump(&mut self) -> Tok {
        let t = self.current().tok.clone();
        if self.pos < self.toks.len() - 1 {
            self.pos += 1;
        }
        t
    }

    pub fn err(&self, message: impl Into<String>) -> ParseError {
        let t = self.current();
        ParseError::new(self.file.clone(), t.line, t.column, message.into())
    }

    pub fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.bump() {
            Tok::Ident(s) => Ok(s),
            other => Err(self.err(format!("expected identifier, found {other}"))),
        }
    }

    pub fn expect(&mut self, want: &Tok) -> Result<(), ParseError> {
        let found = self.peek().clone();
        if &found == want {
            self.bump();
            Ok(())
        } else {
            Err(self.err(format!("expected {want}, found {found}")))
        }
    }

    pub fn at(&self, t: &Tok) -> bool {
        self.peek() == t
    }

    pub fn eof(&self) -> bool {
        matches!(self.peek(), Tok::Eof)
    }
}
