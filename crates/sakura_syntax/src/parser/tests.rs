use super::rules::{table, Production};
use super::*;
use crate::ast::Tag;
use crate::lexer::Lexer;

fn tokens(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

fn parse_one(source: &str) -> Node {
    let toks = tokens(source);
    let out = parse_statement(Cursor::new(&toks));
    assert_eq!(out.status, Status::Success, "parse failed: {:?}", out.error);
    out.into_node().expect("node")
}

fn parse_err(source: &str) -> CompileError {
    let toks = tokens(source);
    let out = parse_statement(Cursor::new(&toks));
    assert_eq!(out.status, Status::Failed);
    out.error.expect("failed parse carries an error")
}

#[test]
fn declare_statement_builds_the_expected_tree() {
    let stmt = parse_one("let x: int = 42;");
    let decl = stmt.child(Tag::DeclareStmt).expect("declare under stmt");

    assert_eq!(
        decl.child(Tag::Identifier).unwrap().content().unwrap().lexeme,
        "x"
    );
    let ty = decl.child(Tag::Type).unwrap();
    let basic = ty.child(Tag::BasicTypeModifier).unwrap();
    assert_eq!(
        basic.child(Tag::Keyword).unwrap().content().unwrap().lexeme,
        "int"
    );

    // let-with-init nests WholeExpr → BinaryExpr → ... → Literal(42)
    let init = decl.child(Tag::AssignTerm).unwrap();
    assert_eq!(init.tag(), Tag::WholeExpr);
    let text = init.unparse();
    assert_eq!(text, "42");
}

#[test]
fn declare_without_type_or_init_is_rejected() {
    let err = parse_err("let x;");
    assert_eq!(err.stage, Stage::Ast);
    assert!(err.message.contains("must have an initializer"));
}

#[test]
fn missing_identifier_reports_the_furthest_error() {
    // Both viable alternatives die at the '='; the winner names the Ident.
    let err = parse_err("let = 5;");
    assert!(err.message.contains("Expected Ident"), "{}", err.message);
    let pos = err.position.expect("error carries a position");
    assert_eq!(pos.column, 5);
}

#[test]
fn furthest_error_wins_across_choice_alternatives() {
    // The declaration gets past `let x:` before dying at `=`; every other
    // statement alternative dies on the first token. Deepest failure wins.
    let err = parse_err("let x: = 5;");
    let pos = err.position.expect("position");
    assert_eq!(pos.column, 8);
}

#[test]
fn parse_is_deterministic() {
    let source = "if (a < 10) { return 1; } else { return 2; }";
    let first = parse_one(source);
    let second = parse_one(source);
    assert_eq!(first, second);
}

#[test]
fn chained_comparisons_stay_in_one_logic_chain() {
    let stmt = parse_one("let t: bool = a < b < c;");
    let decl = stmt.child(Tag::DeclareStmt).unwrap();
    let whole = decl.child(Tag::AssignTerm).unwrap();
    let binary = whole.child(Tag::BinaryExpr).unwrap();
    let logic = binary
        .child(Tag::Exprs)
        .unwrap()
        .children()
        .next()
        .unwrap();
    assert_eq!(logic.tag(), Tag::LogicExpr);
    assert_eq!(logic.child(Tag::Exprs).unwrap().child_count(), 3);
    assert_eq!(logic.child(Tag::Ops).unwrap().child_count(), 2);
}

#[test]
fn array_literal_elements_appear_exactly_once() {
    let stmt = parse_one("let a: [3]int = [1, 2, 3];");
    let decl = stmt.child(Tag::DeclareStmt).unwrap();
    let whole = decl.child(Tag::AssignTerm).unwrap();
    let array = whole.child(Tag::ArrayExpr).unwrap();
    assert_eq!(array.child(Tag::Exprs).unwrap().child_count(), 3);
}

#[test]
fn empty_array_literal_parses() {
    let stmt = parse_one("let a: [0]int = [];");
    let decl = stmt.child(Tag::DeclareStmt).unwrap();
    let whole = decl.child(Tag::AssignTerm).unwrap();
    let array = whole.child(Tag::ArrayExpr).unwrap();
    assert!(array.child(Tag::Exprs).is_none());
}

#[test]
fn call_with_arguments_lands_under_ops() {
    let stmt = parse_one("f(1, x);");
    let expr = stmt.child(Tag::ExprStmt).unwrap();
    let ident = expr.child(Tag::IdentifierExpr).unwrap();
    let atom = ident.child(Tag::Exprs).unwrap().children().next().unwrap();
    let ops = atom.child(Tag::Ops).unwrap();
    let call = ops.children().next().unwrap();
    assert_eq!(call.tag(), Tag::CallingOp);
    assert_eq!(call.child(Tag::Exprs).unwrap().child_count(), 2);
}

#[test]
fn if_else_fills_condition_block_and_else() {
    let stmt = parse_one("if (a < 10) { return 1; } else { return 2; }");
    let node = stmt.child(Tag::IfStmt).unwrap();
    assert!(node.has(Tag::Condition));
    assert!(node.has(Tag::Block));
    let els = node.child(Tag::ElseStmt).unwrap();
    assert!(els.has(Tag::Block));
}

#[test]
fn for_c_style_head_has_declare_condition_step() {
    let stmt = parse_one("for (let i: int = 0; i < n; i = i + 1) { }");
    let node = stmt.child(Tag::ForStmt).unwrap();
    assert!(node.has(Tag::DeclareStmt));
    assert!(node.has(Tag::Condition));
    assert!(node.has(Tag::HeadExpr));
    assert!(node.has(Tag::Block));
}

#[test]
fn for_range_style_head_binds_identifier() {
    let stmt = parse_one("for (let v = range [1, 2, 3]) { }");
    let node = stmt.child(Tag::ForStmt).unwrap();
    assert!(node.has(Tag::Identifier));
    let range = node.child(Tag::AssignTerm).unwrap();
    assert_eq!(range.tag(), Tag::RangeExpr);
    assert!(range.has(Tag::ArrayExpr));
}

#[test]
fn func_define_collects_parameter_names_and_types() {
    let stmt = parse_one("func add(a: int, b: int) -> int { return a + b; }");
    let node = stmt.child(Tag::FuncDefineStmt).unwrap();
    let args = node.child(Tag::Args).unwrap();
    assert_eq!(args.child(Tag::Types).unwrap().child_count(), 2);
    assert_eq!(args.child(Tag::Exprs).unwrap().child_count(), 2);
    assert!(node.has(Tag::Type));
    assert!(node.has(Tag::Block));
}

#[test]
fn multi_dimension_array_type_keeps_dimension_order() {
    let stmt = parse_one("let g: [2][3]int = [];");
    let decl = stmt.child(Tag::DeclareStmt).unwrap();
    let ty = decl.child(Tag::Type).unwrap();
    let arr = ty.child(Tag::ArrayTypeModifier).unwrap();
    let dims = arr.child(Tag::Exprs).unwrap();
    assert_eq!(dims.child_count(), 2);
    let rendered = ty.unparse();
    assert_eq!(rendered, "[2][3]int");
}

#[test]
fn unterminated_string_surfaces_as_a_lex_error() {
    let err = parse_err("let s: int = \"oops\n;");
    assert_eq!(err.stage, Stage::Lexer);
    assert!(err.message.contains("Unclosed string literal"));
}

#[test]
fn committed_closure_failure_propagates() {
    // The block's statement list starts a `let` and dies inside it; the
    // closure must not end cleanly and let the block close early.
    let err = parse_err("{ let = 1; }");
    assert!(err.message.contains("Expected Ident"));
}

#[test]
fn empty_program_parses_to_no_statements() {
    let toks = tokens("");
    let stmts = parse_program(&toks).expect("empty program");
    assert!(stmts.is_empty());
}

#[test]
fn program_parses_consecutive_statements() {
    let toks = tokens("let a: int = 1; let b: int = 2;");
    let stmts = parse_program(&toks).expect("program");
    assert_eq!(stmts.len(), 2);
}

#[test]
fn pretty_print_then_reparse_is_structurally_equal() {
    let source = "func main() -> int { let x: int = 1; if (x < 2) { return x; } return 0; }";
    let first = parse_one(source);
    let second = parse_one(&first.unparse());
    assert!(first.structurally_equal(&second), "{}", first.unparse());
}

#[test]
fn epsilonable_classification_matches_the_grammar() {
    assert!(epsilonable(&rules::Rule::Empty));
    assert!(!epsilonable(table(Production::DeclareStmt)));
    assert!(!epsilonable(table(Production::WholeExpr)));
}

#[test]
fn check_rejects_obviously_wrong_starts() {
    let toks = tokens("42");
    let cur = Cursor::new(&toks);
    assert!(check(table(Production::Literal), cur));
    assert!(!check(table(Production::FuncDefineStmt), cur));
}
