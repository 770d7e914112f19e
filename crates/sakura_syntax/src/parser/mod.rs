//! The grammar driver.
//!
//! Grammar rules are data ([`rules::Rule`]) and this module is the single
//! interpreter that runs them against a token cursor. A parse attempt yields
//! a [`ParseOutcome`]: the status, the raw value, the cursor after the match,
//! and the furthest error seen.
//!
//! The two policies that make diagnostics useful both live here:
//!
//! - **Furthest error** (`Choice`): among failed alternatives, the failure
//!   at the greatest token index wins; ties go to the first alternative.
//! - **Committed failure** (`Many`): an iteration that fails *past* its own
//!   starting point poisons the whole loop instead of ending it cleanly.
//!
//! Named productions fold their raw value into an AST [`Node`] the moment
//! they succeed (see [`actions`]), so the value flowing upward is already a
//! syntax tree at every `Ref` boundary.

pub mod actions;
pub mod rules;

#[cfg(test)]
mod tests;

use crate::ast::Node;
use crate::token::{Token, TokenKind};
use self::rules::{Production, Rule};
use sakura_base::{CompileError, Position, Result, Stage};

/// An immutable position in the token stream. Cheap to copy; never mutated.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'t> {
    tokens: &'t [Token],
    pub pos: usize,
}

impl<'t> Cursor<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    pub fn advance(&self) -> Cursor<'t> {
        Cursor {
            tokens: self.tokens,
            pos: self.pos + 1,
        }
    }

    fn position(&self) -> Position {
        self.peek()
            .map(|t| t.position())
            .unwrap_or_else(|| match self.tokens.last() {
                Some(t) => t.position(),
                None => Position::default(),
            })
    }
}

/// Parse status: `Unparsed` means the rule never attempted the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failed,
    Unparsed,
}

/// The raw value produced by a rule, mirroring the rule's shape.
#[derive(Debug, Clone)]
pub enum RawValue {
    /// A matched token (`Rule::Token`).
    Leaf(Token),
    /// Placeholder for `Discard` and `Empty`, keeping sequence positions stable.
    Unit,
    /// Zero or more repetitions (`Rule::Many`).
    List(Vec<RawValue>),
    /// One value per sequence element (`Rule::Seq`).
    Seq(Vec<RawValue>),
    /// The matched alternative and its index (`Rule::Choice`).
    Alt { index: usize, value: Box<RawValue> },
    /// A folded named production (`Rule::Ref`).
    Node(Node),
}

/// Result of one parse attempt.
#[derive(Debug, Clone)]
pub struct ParseOutcome<'t> {
    pub status: Status,
    pub value: Option<RawValue>,
    pub rest: Cursor<'t>,
    pub error: Option<CompileError>,
    pub error_pos: usize,
}

impl<'t> ParseOutcome<'t> {
    fn success(value: RawValue, rest: Cursor<'t>) -> Self {
        Self {
            status: Status::Success,
            value: Some(value),
            rest,
            error: None,
            error_pos: rest.pos,
        }
    }

    fn failed(at: Cursor<'t>, error: CompileError, error_pos: usize) -> Self {
        Self {
            status: Status::Failed,
            value: None,
            rest: at,
            error: Some(error),
            error_pos,
        }
    }

    fn unparsed(at: Cursor<'t>) -> Self {
        Self {
            status: Status::Unparsed,
            value: None,
            rest: at,
            error: None,
            error_pos: at.pos,
        }
    }

    /// Takes the folded node out of a successful production parse.
    pub fn into_node(self) -> Option<Node> {
        match self.value {
            Some(RawValue::Node(node)) => Some(node),
            _ => None,
        }
    }
}

/// Attempts a rule: `Unparsed` when the lookahead says it cannot start here,
/// otherwise the real parse result.
pub fn attempt<'t>(rule: &Rule, input: Cursor<'t>) -> ParseOutcome<'t> {
    if !check(rule, input) {
        return ParseOutcome::unparsed(input);
    }
    parse_rule(rule, input)
}

/// True if `rule` can succeed without consuming any tokens.
pub fn epsilonable(rule: &Rule) -> bool {
    match rule {
        Rule::Token(_) | Rule::Discard(_) => false,
        Rule::Empty | Rule::Many(_) => true,
        Rule::Seq(items) => items.iter().all(epsilonable),
        Rule::Choice(alts) => alts.iter().any(epsilonable),
        Rule::Ref(prod) => epsilonable(rules::table(*prod)),
    }
}

/// Cheap lookahead: could `rule` plausibly start at `input`?
pub fn check(rule: &Rule, input: Cursor<'_>) -> bool {
    match rule {
        Rule::Token(kind) | Rule::Discard(kind) => {
            input.peek().map(|t| t.kind == *kind).unwrap_or(false)
        }
        Rule::Empty => true,
        Rule::Many(inner) => check(inner, input),
        Rule::Seq(items) => {
            for item in items.iter() {
                if check(item, input) {
                    return true;
                }
                if !epsilonable(item) {
                    return false;
                }
            }
            true
        }
        Rule::Choice(alts) => alts.iter().any(|a| check(a, input)) || epsilonable(rule),
        Rule::Ref(prod) => check(rules::table(*prod), input),
    }
}

fn unexpected_error(input: Cursor<'_>) -> CompileError {
    match input.peek() {
        Some(found) if found.kind == TokenKind::Unknown => {
            CompileError::new(Stage::Lexer, found.lexeme.clone()).at(found.position())
        }
        Some(found) => CompileError::new(
            Stage::Parser,
            format!("Unexpected token {}", found.kind.describe()),
        )
        .at(found.position()),
        None => CompileError::new(Stage::Parser, "Unexpected end of input").at(input.position()),
    }
}

fn expected_error(kind: TokenKind, input: Cursor<'_>) -> CompileError {
    match input.peek() {
        Some(found) if found.kind == TokenKind::Unknown => {
            // Lexical damage surfaces at the first consumption attempt.
            CompileError::new(Stage::Lexer, found.lexeme.clone()).at(found.position())
        }
        Some(found) => CompileError::new(
            Stage::Parser,
            format!("Expected {}, but got {}", kind.describe(), found.kind.describe()),
        )
        .at(found.position()),
        None => CompileError::new(
            Stage::Parser,
            format!("Expected {}, but got EOF", kind.describe()),
        )
        .at(input.position()),
    }
}

/// Runs one rule against the input.
pub fn parse_rule<'t>(rule: &Rule, input: Cursor<'t>) -> ParseOutcome<'t> {
    match rule {
        Rule::Token(kind) => match input.peek() {
            Some(tok) if tok.kind == *kind => {
                ParseOutcome::success(RawValue::Leaf(tok.clone()), input.advance())
            }
            _ => ParseOutcome::failed(input, expected_error(*kind, input), input.pos),
        },

        Rule::Discard(kind) => match input.peek() {
            Some(tok) if tok.kind == *kind => {
                ParseOutcome::success(RawValue::Unit, input.advance())
            }
            _ => ParseOutcome::failed(input, expected_error(*kind, input), input.pos),
        },

        Rule::Empty => ParseOutcome::success(RawValue::Unit, input),

        Rule::Many(inner) => {
            let mut items = Vec::new();
            let mut cur = input;
            loop {
                if !check(inner, cur) {
                    break;
                }
                let out = parse_rule(inner, cur);
                match out.status {
                    Status::Success => {
                        if out.rest.pos == cur.pos {
                            // zero-width match; the loop would never advance
                            break;
                        }
                        items.push(out.value.expect("success carries a value"));
                        cur = out.rest;
                    }
                    _ => {
                        if out.error_pos > cur.pos {
                            let err = out
                                .error
                                .unwrap_or_else(|| CompileError::new(Stage::Parser, "Unexpected token"));
                            return ParseOutcome::failed(input, err, out.error_pos);
                        }
                        break;
                    }
                }
            }
            ParseOutcome::success(RawValue::List(items), cur)
        }

        Rule::Seq(items) => {
            let mut values = Vec::with_capacity(items.len());
            let mut cur = input;
            for item in items.iter() {
                let out = parse_rule(item, cur);
                if out.status != Status::Success {
                    let err = out
                        .error
                        .unwrap_or_else(|| CompileError::new(Stage::Parser, "Unexpected token"));
                    return ParseOutcome::failed(input, err, out.error_pos);
                }
                values.push(out.value.expect("success carries a value"));
                cur = out.rest;
            }
            ParseOutcome::success(RawValue::Seq(values), cur)
        }

        Rule::Choice(alts) => {
            let mut best_error: Option<CompileError> = None;
            let mut best_pos = input.pos;
            for (index, alt) in alts.iter().enumerate() {
                let out = attempt(alt, input);
                match out.status {
                    Status::Unparsed => continue,
                    Status::Success => {
                        let value = RawValue::Alt {
                            index,
                            value: Box::new(out.value.expect("success carries a value")),
                        };
                        return ParseOutcome::success(value, out.rest);
                    }
                    Status::Failed => {
                        if out.error_pos > best_pos || best_error.is_none() {
                            best_pos = out.error_pos;
                            best_error = out.error;
                        }
                    }
                }
            }
            match best_error {
                Some(err) => ParseOutcome::failed(input, err, best_pos),
                None => ParseOutcome::failed(input, unexpected_error(input), input.pos),
            }
        }

        Rule::Ref(prod) => parse_production(*prod, input),
    }
}

/// Parses a named production and folds the raw value into a syntax tree node.
pub fn parse_production<'t>(prod: Production, input: Cursor<'t>) -> ParseOutcome<'t> {
    let out = parse_rule(rules::table(prod), input);
    if out.status != Status::Success {
        return out;
    }
    let raw = out.value.expect("success carries a value");
    match actions::fold(prod, raw) {
        Ok(node) => ParseOutcome {
            status: Status::Success,
            value: Some(RawValue::Node(node)),
            rest: out.rest,
            error: None,
            error_pos: out.rest.pos,
        },
        // Semantic checks in the fold fail the parse at the production's end.
        Err(err) => ParseOutcome::failed(input, err, out.rest.pos),
    }
}

/// Parses a single top-level statement.
pub fn parse_statement(input: Cursor<'_>) -> ParseOutcome<'_> {
    parse_production(Production::Stmt, input)
}

/// Parses a whole token stream into top-level statements.
///
/// The stream must end with `Eof`. On failure the furthest error is returned.
pub fn parse_program(tokens: &[Token]) -> Result<Vec<Node>> {
    let mut cursor = Cursor::new(tokens);
    let mut statements = Vec::new();

    while let Some(tok) = cursor.peek() {
        if tok.kind == TokenKind::Eof {
            break;
        }
        let out = parse_statement(cursor);
        match out.status {
            Status::Success => {
                let rest = out.rest;
                let node = out.into_node().expect("production parse yields a node");
                log::trace!("parsed statement: {:?}", node.tag());
                statements.push(node);
                cursor = rest;
            }
            _ => {
                return Err(out
                    .error
                    .unwrap_or_else(|| CompileError::new(Stage::Parser, "Unexpected token")));
            }
        }
    }
    Ok(statements)
}
