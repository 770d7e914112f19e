//! The grammar as data.
//!
//! Five primitive combinators, closed under composition:
//!
//! | Variant    | Matches                                  |
//! |------------|------------------------------------------|
//! | `Token`    | exactly one token of a kind (kept)       |
//! | `Discard`  | exactly one token of a kind (dropped)    |
//! | `Empty`    | nothing; always succeeds                 |
//! | `Many`     | zero or more of the inner rule, greedy   |
//! | `Seq`      | each element in order                    |
//! | `Choice`   | ordered alternatives, first match wins   |
//!
//! `Ref` names another production, which is how recursion is expressed
//! without recursive `const` initializers. Precedence climbs from `PrimExpr`
//! up through `MulExpr`/`AddExpr`/`LogicExpr`/`BinaryExpr`; assignment and
//! array literals join at `WholeExpr`.

use crate::token::TokenKind as K;
use Rule::{Choice, Discard, Empty, Many, Ref, Seq, Token};

/// A grammar combinator description. Interpreted by the driver in `parser`.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    Token(K),
    Discard(K),
    Empty,
    Many(&'static Rule),
    Seq(&'static [Rule]),
    Choice(&'static [Rule]),
    Ref(Production),
}

/// Named productions. Each has a rule table entry and a fold action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Production {
    Literal,
    IndexOp,
    CallingOp,
    AtomIdentifier,
    IdentifierExpr,
    PrimExpr,
    MulExpr,
    AddExpr,
    LogicExpr,
    BinaryExpr,
    ArrayExpr,
    AssignExpr,
    WholeExpr,
    BasicType,
    ArrayType,
    TypeModifier,
    RangeExpr,
    DeclareStmt,
    ExprStmt,
    IfStmt,
    ElseStmt,
    WhileStmt,
    ForStmt,
    BlockStmt,
    ReturnStmt,
    FuncDefineStmt,
    Stmt,
}

use Production as P;

const LITERAL: Rule = Choice(&[
    Token(K::Int),
    Token(K::Float),
    Token(K::Str),
    Token(K::Bool),
    Token(K::Char),
]);

const INDEX_OP: Rule = Seq(&[
    Discard(K::LBracket),
    Ref(P::AddExpr),
    Discard(K::RBracket),
]);

const ARG_TAIL: Rule = Seq(&[Discard(K::Comma), Ref(P::WholeExpr)]);

const CALLING_OP: Rule = Seq(&[
    Discard(K::LParen),
    Choice(&[Seq(&[Ref(P::WholeExpr), Many(&ARG_TAIL)]), Empty]),
    Discard(K::RParen),
]);

const ATOM_OP: Rule = Choice(&[Ref(P::CallingOp), Ref(P::IndexOp)]);
const ATOM_IDENTIFIER: Rule = Seq(&[Token(K::Ident), Many(&ATOM_OP)]);

const PREFIX_OP: Rule = Choice(&[Token(K::Not), Token(K::PlusPlus), Token(K::MinusMinus)]);
const DOTTED_ATOM: Rule = Seq(&[Discard(K::Dot), Ref(P::AtomIdentifier)]);
const IDENTIFIER_EXPR: Rule = Seq(&[
    Many(&PREFIX_OP),
    Ref(P::AtomIdentifier),
    Many(&DOTTED_ATOM),
]);

const PRIM_EXPR: Rule = Choice(&[
    Ref(P::Literal),
    Ref(P::IdentifierExpr),
    Seq(&[Discard(K::LParen), Ref(P::WholeExpr), Discard(K::RParen)]),
]);

const MUL_TAIL: Rule = Seq(&[
    Choice(&[Token(K::Star), Token(K::Slash), Token(K::Percent)]),
    Ref(P::PrimExpr),
]);
const MUL_EXPR: Rule = Seq(&[Ref(P::PrimExpr), Many(&MUL_TAIL)]);

const ADD_TAIL: Rule = Seq(&[
    Choice(&[Token(K::Plus), Token(K::Minus)]),
    Ref(P::MulExpr),
]);
const ADD_EXPR: Rule = Seq(&[Ref(P::MulExpr), Many(&ADD_TAIL)]);

const LOGIC_TAIL: Rule = Seq(&[
    Choice(&[
        Token(K::Lt),
        Token(K::Le),
        Token(K::Gt),
        Token(K::Ge),
        Token(K::NotEq),
        Token(K::EqEq),
    ]),
    Ref(P::AddExpr),
]);
const LOGIC_EXPR: Rule = Seq(&[Ref(P::AddExpr), Many(&LOGIC_TAIL)]);

const BINARY_TAIL: Rule = Seq(&[
    Choice(&[Token(K::AndAnd), Token(K::OrOr)]),
    Ref(P::LogicExpr),
]);
const BINARY_EXPR: Rule = Seq(&[Ref(P::LogicExpr), Many(&BINARY_TAIL)]);

const ARRAY_EXPR: Rule = Seq(&[
    Discard(K::LBracket),
    Choice(&[Seq(&[Ref(P::WholeExpr), Many(&ARG_TAIL)]), Empty]),
    Discard(K::RBracket),
]);

const ASSIGN_OP: Rule = Choice(&[
    Token(K::Assign),
    Token(K::PlusAssign),
    Token(K::MinusAssign),
    Token(K::StarAssign),
    Token(K::SlashAssign),
]);
const ASSIGN_EXPR: Rule = Seq(&[Ref(P::IdentifierExpr), ASSIGN_OP, Ref(P::WholeExpr)]);

const WHOLE_EXPR: Rule = Choice(&[
    Ref(P::AssignExpr),
    Ref(P::BinaryExpr),
    Ref(P::ArrayExpr),
]);

const BASIC_TYPE: Rule = Choice(&[
    Token(K::KwInt),
    Token(K::KwChar),
    Token(K::KwFloat),
    Token(K::KwBool),
]);

const DIMENSION: Rule = Seq(&[Discard(K::LBracket), Ref(P::AddExpr), Discard(K::RBracket)]);
const ARRAY_TYPE: Rule = Seq(&[Many(&DIMENSION), Ref(P::BasicType)]);

const TYPE_MODIFIER: Rule = Choice(&[Ref(P::BasicType), Ref(P::ArrayType)]);

const RANGE_EXPR: Rule = Seq(&[
    Discard(K::Range),
    Choice(&[Ref(P::ArrayExpr), Ref(P::IdentifierExpr)]),
]);

// Optional clauses are zero-or-more closures so that a failure *inside* an
// attempted clause (past the ':'/'=') poisons the whole declaration instead
// of silently matching the empty alternative.
const TYPE_CLAUSE: Rule = Seq(&[Discard(K::Colon), Ref(P::TypeModifier)]);
const OPT_TYPE: Rule = Many(&TYPE_CLAUSE);
const INIT_CLAUSE: Rule = Seq(&[Discard(K::Assign), Ref(P::WholeExpr)]);
const OPT_INIT: Rule = Many(&INIT_CLAUSE);

const DECLARE_STMT: Rule = Seq(&[
    Discard(K::Let),
    Token(K::Ident),
    OPT_TYPE,
    OPT_INIT,
    Discard(K::Semicolon),
]);

const EXPR_STMT: Rule = Seq(&[
    Choice(&[Ref(P::AssignExpr), Ref(P::IdentifierExpr)]),
    Discard(K::Semicolon),
]);

const IF_STMT: Rule = Seq(&[
    Discard(K::If),
    Discard(K::LParen),
    Ref(P::BinaryExpr),
    Discard(K::RParen),
    Ref(P::BlockStmt),
    Choice(&[Ref(P::ElseStmt), Empty]),
]);

const ELSE_STMT: Rule = Seq(&[Discard(K::Else), Ref(P::BlockStmt)]);

const WHILE_STMT: Rule = Seq(&[
    Discard(K::While),
    Discard(K::LParen),
    Ref(P::BinaryExpr),
    Discard(K::RParen),
    Ref(P::BlockStmt),
]);

const FOR_C_HEAD: Rule = Seq(&[
    Ref(P::DeclareStmt),
    Ref(P::WholeExpr),
    Discard(K::Semicolon),
    Ref(P::WholeExpr),
]);
const FOR_RANGE_HEAD: Rule = Seq(&[
    Discard(K::Let),
    Token(K::Ident),
    OPT_TYPE,
    Discard(K::Assign),
    Ref(P::RangeExpr),
]);
const FOR_STMT: Rule = Seq(&[
    Discard(K::For),
    Discard(K::LParen),
    Choice(&[FOR_C_HEAD, FOR_RANGE_HEAD]),
    Discard(K::RParen),
    Ref(P::BlockStmt),
]);

const CONTAINABLE: Rule = Choice(&[
    Ref(P::DeclareStmt),
    Ref(P::ExprStmt),
    Ref(P::IfStmt),
    Ref(P::WhileStmt),
    Ref(P::ForStmt),
    Ref(P::BlockStmt),
    Ref(P::ReturnStmt),
]);

const BLOCK_STMT: Rule = Seq(&[
    Discard(K::LBrace),
    Many(&CONTAINABLE),
    Discard(K::RBrace),
]);

const RETURN_STMT: Rule = Seq(&[
    Discard(K::Return),
    Ref(P::WholeExpr),
    Discard(K::Semicolon),
]);

const PARAM: Rule = Seq(&[Token(K::Ident), Discard(K::Colon), Ref(P::TypeModifier)]);
const PARAM_TAIL: Rule = Seq(&[Discard(K::Comma), PARAM]);

const FUNC_DEFINE_STMT: Rule = Seq(&[
    Discard(K::Func),
    Token(K::Ident),
    Discard(K::LParen),
    Choice(&[Seq(&[PARAM, Many(&PARAM_TAIL)]), Empty]),
    Discard(K::RParen),
    Discard(K::Arrow),
    Ref(P::TypeModifier),
    Ref(P::BlockStmt),
]);

const STMT: Rule = Choice(&[
    Ref(P::DeclareStmt),
    Ref(P::ExprStmt),
    Ref(P::IfStmt),
    Ref(P::WhileStmt),
    Ref(P::ForStmt),
    Ref(P::BlockStmt),
    Ref(P::ReturnStmt),
    Ref(P::FuncDefineStmt),
]);

/// The rule for a named production.
pub fn table(prod: Production) -> &'static Rule {
    match prod {
        P::Literal => &LITERAL,
        P::IndexOp => &INDEX_OP,
        P::CallingOp => &CALLING_OP,
        P::AtomIdentifier => &ATOM_IDENTIFIER,
        P::IdentifierExpr => &IDENTIFIER_EXPR,
        P::PrimExpr => &PRIM_EXPR,
        P::MulExpr => &MUL_EXPR,
        P::AddExpr => &ADD_EXPR,
        P::LogicExpr => &LOGIC_EXPR,
        P::BinaryExpr => &BINARY_EXPR,
        P::ArrayExpr => &ARRAY_EXPR,
        P::AssignExpr => &ASSIGN_EXPR,
        P::WholeExpr => &WHOLE_EXPR,
        P::BasicType => &BASIC_TYPE,
        P::ArrayType => &ARRAY_TYPE,
        P::TypeModifier => &TYPE_MODIFIER,
        P::RangeExpr => &RANGE_EXPR,
        P::DeclareStmt => &DECLARE_STMT,
        P::ExprStmt => &EXPR_STMT,
        P::IfStmt => &IF_STMT,
        P::ElseStmt => &ELSE_STMT,
        P::WhileStmt => &WHILE_STMT,
        P::ForStmt => &FOR_STMT,
        P::BlockStmt => &BLOCK_STMT,
        P::ReturnStmt => &RETURN_STMT,
        P::FuncDefineStmt => &FUNC_DEFINE_STMT,
        P::Stmt => &STMT,
    }
}
