//! Parser for concept and sync source files.
//!
//! Two entry points: [`parse_concept`] turns one `concept { ... }` block
//! into a `concept_domain::ConceptSpec`; [`parse_sync`] turns one
//! `sync { ... }` block into a compiled, binding-checked
//! `concept_domain::CompiledSync`. Both are hand-written recursive-descent
//! parsers over a small custom lexer — nothing here depends on a parser
//! combinator crate.

mod compiler;
mod concept;
mod cursor;
mod lexer;
mod sync;
mod type_expr;

pub use compiler::compile_sync;
pub use concept::parse_concept_spec;
pub use lexer::{lex, LexError, SpannedTok, Tok};
pub use sync::parse_sync_spec;
pub use type_expr::parse_type_expr;

use concept_domain::{CompiledSync, ConceptSpec, ParseError};

/// Parses one concept source file into its AST.
pub fn parse_concept(src: &str, file: &str) -> Result<ConceptSpec, ParseError> {
    parse_concept_spec(src, file)
}

/// Parses and compiles one sync source file.
pub fn parse_sync(src: &str, file: &str) -> Result<CompiledSync, ParseError> {
    let raw = parse_sync_spec(src, file)?;
    compile_sync(raw)
}
