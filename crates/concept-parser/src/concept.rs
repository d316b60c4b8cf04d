//! Parser for one `concept { ... }` declaration.

use crate::cursor::Cursor;
use crate::lexer::{lex, Tok};
use crate::type_expr::parse_type_expr;
use concept_domain::concept_spec::{
    Action, Annotation, ArgBinding, ConceptSpec, FreeVariable, Invariant, InvariantPattern, StateField, Variant,
};
use concept_domain::ParseError;
use std::collections::BTreeSet;

pub fn parse_concept_spec(src: &str, file: &str) -> Result<ConceptSpec, ParseError> {
    let toks = lex(src).map_err(|e| ParseError::new(file, e.line, e.column, e.message))?;
    let mut cur = Cursor::new(&toks, file);
    let spec = parse_concept(&mut cur)?;
    if !cur.eof() {
        return Err(cur.err(format!("unexpected trailing input, found {}", cur.peek())));
    }
    Ok(spec)
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

fn parse_concept(cur: &mut Cursor) -> Result<ConceptSpec, ParseError> {
    let mut annotations = BTreeSet::new();
    let mut version = 1u32;
    while cur.at(&Tok::At) {
        cur.bump();
        let name = cur.expect_ident()?;
        match name.as_str() {
            "gate" => {
                annotations.insert(Annotation::Gate);
            }
            "eager" => {
                annotations.insert(Annotation::Eager);
            }
            "version" => {
                cur.expect(&Tok::LParen)?;
                version = expect_u32(cur)?;
                cur.expect(&Tok::RParen)?;
            }
            other => return Err(cur.err(format!("unknown annotation `@{other}`"))),
        }
    }
    expect_keyword(cur, "concept")?;
    let name = cur.expect_ident()?;

    let mut type_params = Vec::new();
    if cur.at(&Tok::LBracket) {
        cur.bump();
        loop {
            type_params.push(cur.expect_ident()?);
            if cur.at(&Tok::Comma) {
                cur.bump();
                continue;
            }
            break;
        }
        cur.expect(&Tok::RBracket)?;
    }

    cur.expect(&Tok::LBrace)?;
    let mut purpose = None;
    let mut capabilities = BTreeSet::new();
    let mut state = Vec::new();
    let mut actions = Vec::new();
    let mut invariants = Vec::new();
    let mut saw_state = false;
    let mut saw_actions = false;

    while !cur.at(&Tok::RBrace) {
        let section = cur.expect_ident()?;
        match section.as_str() {
            "purpose" => {
                cur.expect(&Tok::LBrace)?;
                purpose = Some(parse_quoted_text(cur)?);
                cur.expect(&Tok::RBrace)?;
            }
            "state" => {
                saw_state = true;
                cur.expect(&Tok::LBrace)?;
                state = parse_state_fields(cur)?;
                cur.expect(&Tok::RBrace)?;
            }
            "actions" => {
                saw_actions = true;
                cur.expect(&Tok::LBrace)?;
                actions = parse_actions(cur)?;
                cur.expect(&Tok::RBrace)?;
            }
            "invariant" => {
                cur.expect(&Tok::LBrace)?;
                invariants.push(parse_invariant(cur)?);
                cur.expect(&Tok::RBrace)?;
            }
            "capabilities" => {
                cur.expect(&Tok::LBrace)?;
                capabilities = parse_capabilities(cur)?;
                cur.expect(&Tok::RBrace)?;
            }
            other => return Err(cur.err(format!("unexpected section `{other}` in concept body"))),
        }
    }
    cur.expect(&Tok::RBrace)?;

    if !saw_state {
        return Err(cur.err("concept is missing a `state` block"));
    }
    if !saw_actions {
        return Err(cur.err("concept is missing an `actions` block"));
    }

    Ok(ConceptSpec { annotations, name, version, type_params, purpose, capabilities, state, actions, invariants })
}

fn expect_u32(cur: &mut Cursor) -> Result<u32, ParseError> {
    match cur.bump() {
        Tok::Number(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as u32),
        other => Err(cur.err(format!("expected a non-negative integer, found {other}"))),
    }
}

fn parse_quoted_text(cur: &mut Cursor) -> Result<String, ParseError> {
    match cur.bump() {
        Tok::Str(s) => Ok(s),
        other => Err(cur.err(format!("expected a string literal, found {other}"))),
    }
}

fn parse_state_fields(cur: &mut Cursor) -> Result<Vec<StateField>, ParseError> {
    let mut fields = Vec::new();
    while !cur.at(&Tok::RBrace) {
        let name = cur.expect_ident()?;
        cur.expect(&Tok::Colon)?;
        let ty = parse_type_expr(cur)?;
        fields.push(StateField { name, ty });
    }
    Ok(fields)
}

fn parse_params(cur: &mut Cursor) -> Result<Vec<StateField>, ParseError> {
    let mut params = Vec::new();
    if cur.at(&Tok::RParen) {
        return Ok(params);
    }
    loop {
        let name = cur.expect_ident()?;
        cur.expect(&Tok::Colon)?;
        let ty = parse_type_expr(cur)?;
        params.push(StateField { name, ty });
        if cur.at(&Tok::Comma) {
            cur.bump();
            continue;
        }
        break;
    }
    Ok(params)
}

fn parse_actions(cur: &mut Cursor) -> Result<Vec<Action>, ParseError> {
    let mut actions = Vec::new();
    while !cur.at(&Tok::RBrace) {
        expect_keyword(cur, "action")?;
        let name = cur.expect_ident()?;
        cur.expect(&Tok::LParen)?;
        let params = parse_params(cur)?;
        cur.expect(&Tok::RParen)?;
        cur.expect(&Tok::LBrace)?;
        let variants = parse_variants(cur)?;
        cur.expect(&Tok::RBrace)?;
        if variants.is_empty() {
            return Err(cur.err(format!("action `{name}` declares no result variants")));
        }
        actions.push(Action { name, params, variants });
    }
    Ok(actions)
}

fn parse_variants(cur: &mut Cursor) -> Result<Vec<Variant>, ParseError> {
    let mut variants = Vec::new();
    while cur.at(&Tok::Arrow) {
        cur.bump();
        let tag = cur.expect_ident()?;
        cur.expect(&Tok::LParen)?;
        let params = parse_params(cur)?;
        cur.expect(&Tok::RParen)?;
        cur.expect(&Tok::LBrace)?;
        if !cur.at(&Tok::RBrace) {
            parse_quoted_text(cur)?;
        }
        cur.expect(&Tok::RBrace)?;
        variants.push(Variant { tag, params });
    }
    Ok(variants)
}

fn parse_capabilities(cur: &mut Cursor) -> Result<BTreeSet<String>, ParseError> {
    let mut caps = BTreeSet::new();
    while !cur.at(&Tok::RBrace) {
        caps.insert(cur.expect_ident()?);
        if cur.at(&Tok::Comma) {
            cur.bump();
        }
    }
    Ok(caps)
}

fn parse_invariant(cur: &mut Cursor) -> Result<Invariant, ParseError> {
    expect_keyword(cur, "forall")?;
    let mut free_variables = Vec::new();
    loop {
        cur.expect(&Tok::Question)?;
        let name = cur.expect_ident()?;
        cur.expect(&Tok::Colon)?;
        let bound_param = cur.expect_ident()?;
        free_variables.push(FreeVariable { name, bound_param });
        if cur.at(&Tok::Comma) {
            cur.bump();
            continue;
        }
        break;
    }

    let mut after_patterns = Vec::new();
    let mut then_patterns = Vec::new();
    while !cur.at(&Tok::RBrace) {
        let kw = cur.expect_ident()?;
        match kw.as_str() {
            "after" => after_patterns.push(parse_invariant_pattern(cur)?),
            "then" => then_patterns.push(parse_invariant_pattern(cur)?),
            other => return Err(cur.err(format!("expected `after` or `then`, found `{other}`"))),
        }
    }
    if after_patterns.is_empty() {
        return Err(cur.err("invariant has no `after` clause"));
    }
    if then_patterns.is_empty() {
        return Err(cur.err("invariant has no `then` clause"));
    }
    Ok(Invariant { free_variables, after_patterns, then_patterns })
}

fn parse_invariant_pattern(cur: &mut Cursor) -> Result<InvariantPattern, ParseError> {
    let action = cur.expect_ident()?;
    cur.expect(&Tok::LParen)?;
    let mut arg_bindings = parse_arg_bindings(cur)?;
    cur.expect(&Tok::RParen)?;
    cur.expect(&Tok::Arrow)?;
    let variant_name = cur.expect_ident()?;
    cur.expect(&Tok::LParen)?;
    arg_bindings.extend(parse_arg_bindings(cur)?);
    cur.expect(&Tok::RParen)?;
    Ok(InvariantPattern { action, variant_name, arg_bindings })
}

fn parse_arg_bindings(cur: &mut Cursor) -> Result<Vec<(String, ArgBinding)>, ParseError> {
    let mut out = Vec::new();
    if cur.at(&Tok::RParen) {
        return Ok(out);
    }
    loop {
        let name = cur.expect_ident()?;
        cur.expect(&Tok::Colon)?;
        let binding = parse_arg_binding_value(cur)?;
        out.push((name, binding));
        if cur.at(&Tok::Comma) {
            cur.bump();
            continue;
        }
        break;
    }
    Ok(out)
}

fn parse_arg_binding_value(cur: &mut Cursor) -> Result<ArgBinding, ParseError> {
    match cur.peek().clone() {
        Tok::Question => {
            cur.bump();
            Ok(ArgBinding::Variable(cur.expect_ident()?))
        }
        Tok::Str(s) => {
            cur.bump();
            Ok(ArgBinding::Literal(serde_json::Value::String(s)))
        }
        Tok::Number(n) => {
            cur.bump();
            let num = serde_json::Number::from_f64(n).ok_or_else(|| cur.err("number is not representable as JSON"))?;
            Ok(ArgBinding::Literal(serde_json::Value::Number(num)))
        }
        Tok::Bool(b) => {
            cur.bump();
            Ok(ArgBinding::Literal(serde_json::Value::Bool(b)))
        }
        other => Err(cur.err(format!("expected a literal or `?variable`, found {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_echo_concept() {
        let src = r#"
            concept echo[T] {
                purpose { "repeats whatever input it is given" }
                state {
                    lastInput: option T
                }
                actions {
                    action send(input: T) {
                        -> ok(input: T) { "echoes the input back" }
                    }
                }
            }
        "#;
        let spec = parse_concept_spec(src, "echo.concept").unwrap();
        assert_eq!(spec.name, "echo");
        assert_eq!(spec.type_params, vec!["T".to_string()]);
        assert_eq!(spec.state.len(), 1);
        assert_eq!(spec.actions.len(), 1);
        assert_eq!(spec.actions[0].variants[0].tag, "ok");
    }

    #[test]
    fn parses_gate_annotation_and_invariant() {
        let src = r#"
            @gate
            concept password[U] {
                state {
                    value: option String
                }
                actions {
                    action set(user: U, value: String) {
                        -> ok(user: U) { "value stored" }
                    }
                    action check(user: U, value: String) {
                        -> matched() { "value equals stored value" }
                        -> mismatched() { "value differs" }
                    }
                }
                invariant {
                    forall ?u: U
                    after set(user: ?u, value: "secret") -> ok(user: ?u)
                    then check(user: ?u, value: "secret") -> matched()
                }
            }
        "#;
        let spec = parse_concept_spec(src, "password.concept").unwrap();
        assert!(spec.is_gate());
        assert_eq!(spec.invariants.len(), 1);
        assert_eq!(spec.invariants[0].free_variables[0].name, "u");
    }

    #[test]
    fn rejects_missing_actions_block() {
        let src = r#"concept empty { state { x: String } }"#;
        let err = parse_concept_spec(src, "empty.concept").unwrap_err();
        assert!(err.message.contains("actions"));
    }
}
