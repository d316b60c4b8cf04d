//! Parser for one `sync { ... }` declaration.
//!
//! Pattern syntax: `concept/action:[inputField: matcher, ...] => [outputField: matcher, ...]`.
//! A matcher is a literal, `?name` (binds a variable), or `_` (matches anything, binds nothing).

use crate::cursor::Cursor;
use crate::lexer::{lex, Tok};
use concept_domain::sync_spec::{
    FieldMatch, MatchedField, RawSync, SyncAnnotation, ThenField, ThenInvocation, ThenValue, WhenPattern,
    WhereClause,
};
use concept_domain::ParseError;

pub fn parse_sync_spec(src: &str, file: &str) -> Result<RawSync, ParseError> {
    let toks = lex(src).map_err(|e| ParseError::new(file, e.line, e.column, e.message))?;
    let mut cur = Cursor::new(&toks, file);
    let sync = parse_sync(&mut cur)?;
    if !cur.eof() {
        return Err(cur.err(format!("unexpected trailing input, found {}", cur.peek())));
    }
    Ok(sync)
}

fn expect_keyword(cur: &mut Cursor, word: &str) -> Result<(), ParseError> {
    match cur.peek().clone() {
        Tok::Ident(s) if s == word => {
            cur.bump();
            Ok(())
        }
        other => Err(cur.err(format!("expected `{word}`, found {other}"))),
    }
}

fn parse_sync(cur: &mut Cursor) -> Result<RawSync, ParseError> {
    let mut annotations = Vec::new();
    while cur.at(&Tok::At) {
        cur.bump();
        let name = cur.expect_ident()?;
        match name.as_str() {
            "eager" => annotations.push(SyncAnnotation::Eager),
            other => return Err(cur.err(format!("unknown sync annotation `@{other}`"))),
        }
    }
    expect_keyword(cur, "sync")?;
    let name = cur.expect_ident()?;
    cur.expect(&Tok::LBrace)?;

    let mut when = Vec::new();
    let mut r#where = Vec::new();
    let mut then = Vec::new();
    let mut saw_when = false;
    let mut saw_then = false;

    while !cur.at(&Tok::RBrace) {
        let section = cur.expect_ident()?;
        match section.as_str() {
            "when" => {
                saw_when = true;
                cur.expect(&Tok::LBrace)?;
                while !cur.at(&Tok::RBrace) {
                    when.push(parse_when_pattern(cur)?);
                }
                cur.expect(&Tok::RBrace)?;
            }
            "where" => {
                cur.expect(&Tok::LBrace)?;
                while !cur.at(&Tok::RBrace) {
                    r#where.push(parse_where_clause(cur)?);
                }
                cur.expect(&Tok::RBrace)?;
            }
            "then" => {
                saw_then = true;
                cur.expect(&Tok::LBrace)?;
                while !cur.at(&Tok::RBrace) {
                    then.push(parse_then_invocation(cur)?);
                }
                cur.expect(&Tok::RBrace)?;
            }
            other => return Err(cur.err(format!("unexpected section `{other}` in sync body"))),
        }
    }
    cur.expect(&Tok::RBrace)?;

    if !saw_when || when.is_empty() {
        return Err(cur.err(format!("sync `{name}` has no `when` pattern")));
    }
    if !saw_then || then.is_empty() {
        return Err(cur.err(format!("sync `{name}` has no `then` invocation")));
    }

    Ok(RawSync { name, annotations, when, r#where, then })
}

fn parse_when_pattern(cur: &mut Cursor) -> Result<WhenPattern, ParseError> {
    let concept = cur.expect_ident()?;
    cur.expect(&Tok::Slash)?;
    let action = cur.expect_ident()?;
    cur.expect(&Tok::Colon)?;
    cur.expect(&Tok::LBracket)?;
    let input_fields = parse_matched_fields(cur)?;
    cur.expect(&Tok::RBracket)?;
    cur.expect(&Tok::FatArrow)?;
    cur.expect(&Tok::LBracket)?;
    let output_fields = parse_matched_fields(cur)?;
    cur.expect(&Tok::RBracket)?;
    Ok(WhenPattern { concept, action, input_fields, output_fields })
}

fn parse_matched_fields(cur: &mut Cursor) -> Result<Vec<MatchedField>, ParseError> {
    let mut out = Vec::new();
    if cur.at(&Tok::RBracket) {
        return Ok(out);
    }
    loop {
        let name = cur.expect_ident()?;
        cur.expect(&Tok::Colon)?;
        let matcher = parse_field_match(cur)?;
        out.push(MatchedField { name, matcher });
        if cur.at(&Tok::Comma) {
            cur.bump();
            continue;
        }
        break;
    }
    Ok(out)
}

fn parse_field_match(cur: &mut Cursor) -> Result<FieldMatch, ParseError> {
    match cur.peek().clone() {
        Tok::Question => {
            cur.bump();
            Ok(FieldMatch::Variable(cur.expect_ident()?))
        }
        Tok::Ident(s) if s == "_" => {
            cur.bump();
            Ok(FieldMatch::Wildcard)
        }
        Tok::Str(s) => {
            cur.bump();
            Ok(FieldMatch::Literal(serde_json::Value::String(s)))
        }
        Tok::Number(n) => {
            cur.bump();
            Ok(FieldMatch::Literal(json_number(cur, n)?))
        }
        Tok::Bool(b) => {
            cur.bump();
            Ok(FieldMatch::Literal(serde_json::Value::Bool(b)))
        }
        other => Err(cur.err(format!("expected a literal, `?variable`, or `_`, found {other}"))),
    }
}

fn parse_where_clause(cur: &mut Cursor) -> Result<WhereClause, ParseError> {
    expect_keyword(cur, "bind")?;
    cur.expect(&Tok::Question)?;
    let bind = cur.expect_ident()?;
    expect_keyword(cur, "from")?;
    if cur.at(&Tok::Question) {
        cur.bump();
        let source_variable = cur.expect_ident()?;
        Ok(WhereClause::Bind { bind, source_variable })
    } else {
        let concept = cur.expect_ident()?;
        cur.expect(&Tok::Dot)?;
        let relation = cur.expect_ident()?;
        cur.expect(&Tok::LBracket)?;
        let criteria = parse_criteria(cur)?;
        cur.expect(&Tok::RBracket)?;
        Ok(WhereClause::Query { bind, concept, relation, criteria })
    }
}

fn parse_criteria(cur: &mut Cursor) -> Result<Vec<(String, FieldMatch)>, ParseError> {
    let mut out = Vec::new();
    if cur.at(&Tok::RBracket) {
        return Ok(out);
    }
    loop {
        let name = cur.expect_ident()?;
        cur.expect(&Tok::Colon)?;
        let matcher = parse_field_match(cur)?;
        out.push((name, matcher));
        if cur.at(&Tok::Comma) {
            cur.bump();
            continue;
        }
        break;
    }
    Ok(out)
}

fn parse_then_invocation(cur: &mut Cursor) -> Result<ThenInvocation, ParseError> {
    let concept = cur.expect_ident()?;
    cur.expect(&Tok::Slash)?;
    let action = cur.expect_ident()?;
    cur.expect(&Tok::LBracket)?;
    let fields = parse_then_fields(cur)?;
    cur.expect(&Tok::RBracket)?;
    Ok(ThenInvocation { concept, action, fields })
}

fn parse_then_fields(cur: &mut Cursor) -> Result<Vec<ThenField>, ParseError> {
    let mut out = Vec::new();
    if cur.at(&Tok::RBracket) {
        return Ok(out);
    }
    loop {
        let name = cur.expect_ident()?;
        cur.expect(&Tok::Colon)?;
        let value = parse_then_value(cur)?;
        out.push(ThenField { name, value });
        if cur.at(&Tok::Comma) {
            cur.bump();
            continue;
        }
        break;
    }
    Ok(out)
}

fn parse_then_value(cur: &mut Cursor) -> Result<ThenValue, ParseError> {
    match cur.peek().clone() {
        Tok::Question => {
            cur.bump();
            Ok(ThenValue::Variable(cur.expect_ident()?))
        }
        Tok::Str(s) => {
            cur.bump();
            Ok(ThenValue::Literal(serde_json::Value::String(s)))
        }
        Tok::Number(n) => {
            cur.bump();
            Ok(ThenValue::Literal(json_number(cur, n)?))
        }
        Tok::Bool(b) => {
            cur.bump();
            Ok(ThenValue::Literal(serde_json::Value::Bool(b)))
        }
        other => Err(cur.err(format!("expected a literal or `?variable`, found {other}"))),
    }
}

fn json_number(cur: &Cursor, n: f64) -> Result<serde_json::Value, ParseError> {
    serde_json::Number::from_f64(n).map(serde_json::Value::Number).ok_or_else(|| cur.err("number is not representable as JSON"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_echo_loopback_sync() {
        let src = r#"
            sync echoLoopback {
                when {
                    echo/send:[input: ?x] => [input: ?x]
                }
                then {
                    logger/record:[message: ?x]
                }
            }
        "#;
        let sync = parse_sync_spec(src, "echo.sync").unwrap();
        assert_eq!(sync.name, "echoLoopback");
        assert_eq!(sync.when.len(), 1);
        assert_eq!(sync.then.len(), 1);
    }

    #[test]
    fn parses_where_clause_with_query() {
        let src = r#"
            sync notifyOwner {
                when {
                    article/publish:[] => [id: ?aid]
                }
                where {
                    bind ?owner from article.byId[id: ?aid]
                }
                then {
                    mailer/send:[to: ?owner]
                }
            }
        "#;
        let sync = parse_sync_spec(src, "notify.sync").unwrap();
        assert_eq!(sync.r#where.len(), 1);
        match &sync.r#where[0] {
            WhereClause::Query { bind, concept, relation, .. } => {
                assert_eq!(bind, "owner");
                assert_eq!(concept, "article");
                assert_eq!(relation, "byId");
            }
            other => panic!("expected a query clause, got {other:?}"),
        }
    }

    #[test]
    fn rejects_sync_without_then() {
        let src = r#"sync noop { when { a/b:[] => [] } }"#;
        let err = parse_sync_spec(src, "noop.sync").unwrap_err();
        assert!(err.message.contains("then"));
    }
}
