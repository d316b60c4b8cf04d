//! Type-expression parsing, shared by the concept parser.
//!
//! `set`, `list`, `option`, `mapping` are keywords only inside a type
//! expression; everywhere else (field names, action names, param names)
//! they parse as ordinary identifiers because the lexer never special-cases
//! them — only this function does.

use crate::cursor::Cursor;
use crate::lexer::Tok;
use concept_domain::{type_expr::Primitive, ParseError, TypeExpr};

pub fn parse_type_expr(cur: &mut Cursor) -> Result<TypeExpr, ParseError> {
    let base = parse_type_prefix(cur)?;
    let with_opt = if cur.at(&Tok::Question) {
        cur.bump();
        TypeExpr::Option(Box::new(base))
    } else {
        base
    };
    if cur.at(&Tok::Arrow) {
        cur.bump();
        let v = parse_type_expr(cur)?;
        Ok(TypeExpr::Map(Box::new(with_opt), Box::new(v)))
    } else {
        Ok(with_opt)
    }
}

fn parse_type_prefix(cur: &mut Cursor) -> Result<TypeExpr, ParseError> {
    if let Tok::Ident(name) = cur.peek().clone() {
        match name.as_str() {
            "set" => {
                cur.bump();
                return Ok(TypeExpr::Set(Box::new(parse_type_atom(cur)?)));
            }
            "list" => {
                cur.bump();
                return Ok(TypeExpr::List(Box::new(parse_type_atom(cur)?)));
            }
            "option" => {
                cur.bump();
                return Ok(TypeExpr::Option(Box::new(parse_type_atom(cur)?)));
            }
            "mapping" => {
                cur.bump();
                let k = parse_type_atom(cur)?;
                cur.expect(&Tok::Arrow)?;
                let v = parse_type_expr(cur)?;
                return Ok(TypeExpr::Map(Box::new(k), Box::new(v)));
            }
            _ => {}
        }
    }
    parse_type_atom(cur)
}

fn parse_type_atom(cur: &mut Cursor) -> Result<TypeExpr, ParseError> {
    let name = cur.expect_ident()?;
    Ok(match Primitive::from_keyword(&name) {
        Some(p) => TypeExpr::Primitive(p),
        None => TypeExpr::Param(name),
    })
}
