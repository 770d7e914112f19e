//! Fold actions: raw parse values → syntax tree nodes.
//!
//! Each named production knows how to turn the raw value its rule produced
//! into an AST node with labelled children. The folds are shape-driven: the
//! accessors below destructure the raw value exactly as the rule table laid
//! it out, so a mismatch between table and fold is a programming error, not
//! a user error.
//!
//! The only semantic check at this stage: a declaration must carry a type
//! annotation, an initializer, or both.

use super::rules::Production;
use super::RawValue;
use crate::ast::{Node, Tag};
use crate::token::{Token, TokenKind};
use sakura_base::{CompileError, Result, Stage};

impl RawValue {
    fn seq(self) -> Vec<RawValue> {
        match self {
            RawValue::Seq(items) => items,
            _ => unreachable!("rule table and fold action disagree: expected Seq"),
        }
    }

    fn list(self) -> Vec<RawValue> {
        match self {
            RawValue::List(items) => items,
            _ => unreachable!("rule table and fold action disagree: expected List"),
        }
    }

    fn alt(self) -> (usize, RawValue) {
        match self {
            RawValue::Alt { index, value } => (index, *value),
            _ => unreachable!("rule table and fold action disagree: expected Alt"),
        }
    }

    fn leaf(self) -> Token {
        match self {
            RawValue::Leaf(token) => token,
            _ => unreachable!("rule table and fold action disagree: expected Leaf"),
        }
    }

    fn node(self) -> Node {
        match self {
            RawValue::Node(node) => node,
            _ => unreachable!("rule table and fold action disagree: expected Node"),
        }
    }
}

/// Folds the raw value of `prod` into its AST node.
pub fn fold(prod: Production, raw: RawValue) -> Result<Node> {
    match prod {
        Production::Literal => Ok(fold_literal(raw)),
        Production::IndexOp => Ok(fold_index_op(raw)),
        Production::CallingOp => Ok(fold_calling_op(raw)),
        Production::AtomIdentifier => Ok(fold_atom_identifier(raw)),
        Production::IdentifierExpr => Ok(fold_identifier_expr(raw)),
        Production::PrimExpr => Ok(fold_prim_expr(raw)),
        Production::MulExpr => Ok(fold_chain(Tag::MulExpr, raw)),
        Production::AddExpr => Ok(fold_chain(Tag::AddExpr, raw)),
        Production::LogicExpr => Ok(fold_chain(Tag::LogicExpr, raw)),
        Production::BinaryExpr => Ok(fold_chain(Tag::BinaryExpr, raw)),
        Production::ArrayExpr => Ok(fold_array_expr(raw)),
        Production::AssignExpr => Ok(fold_assign_expr(raw)),
        Production::WholeExpr => Ok(fold_tagged_choice(Tag::WholeExpr, raw)),
        Production::BasicType => Ok(fold_basic_type(raw)),
        Production::ArrayType => Ok(fold_array_type(raw)),
        Production::TypeModifier => Ok(fold_tagged_choice(Tag::TypeModifier, raw)),
        Production::RangeExpr => Ok(fold_range_expr(raw)),
        Production::DeclareStmt => fold_declare_stmt(raw),
        Production::ExprStmt => Ok(fold_expr_stmt(raw)),
        Production::IfStmt => Ok(fold_if_stmt(raw)),
        Production::ElseStmt => Ok(fold_else_stmt(raw)),
        Production::WhileStmt => Ok(fold_while_stmt(raw)),
        Production::ForStmt => Ok(fold_for_stmt(raw)),
        Production::BlockStmt => Ok(fold_block_stmt(raw)),
        Production::ReturnStmt => Ok(fold_return_stmt(raw)),
        Production::FuncDefineStmt => Ok(fold_func_define(raw)),
        Production::Stmt => Ok(fold_tagged_choice(Tag::Stmt, raw)),
    }
}

fn fold_literal(raw: RawValue) -> Node {
    let (_, token) = raw.alt();
    let mut root = Node::new(Tag::Literal);
    root.set(Tag::Literal, Node::token(token.leaf()));
    root
}

fn fold_index_op(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let mut root = Node::new(Tag::IndexOp);
    root.set(Tag::HeadExpr, items.swap_remove(1).node());
    root
}

fn fold_calling_op(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let mut root = Node::new(Tag::CallingOp);
    let (variant, args) = items.swap_remove(1).alt();
    if variant == 0 {
        let mut parts = args.seq();
        let tails = parts.pop().expect("argument tail list").list();
        root.slot(Tag::Exprs)
            .add_child(parts.pop().expect("first argument").node());
        for tail in tails {
            let mut pair = tail.seq();
            root.slot(Tag::Exprs).add_child(pair.swap_remove(1).node());
        }
    }
    root
}

fn fold_atom_identifier(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let ops = items.pop().expect("operator list").list();
    let ident = items.pop().expect("identifier token").leaf();

    let mut root = Node::new(Tag::AtomIdentifier);
    root.set(Tag::Identifier, Node::token(ident));
    for op in ops {
        let (_, value) = op.alt();
        root.slot(Tag::Ops).add_child(value.node());
    }
    root
}

fn fold_identifier_expr(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let dotted = items.pop().expect("dotted chain").list();
    let head = items.pop().expect("head atom").node();
    let prefixes = items.pop().expect("prefix list").list();

    let mut root = Node::new(Tag::IdentifierExpr);

    // A run of `!` collapses by parity; one `++`/`--` prefix is honored.
    let mut not_count = 0usize;
    let mut not_token: Option<Token> = None;
    let mut step_token: Option<Token> = None;
    for prefix in prefixes {
        let (_, value) = prefix.alt();
        let token = value.leaf();
        match token.kind {
            TokenKind::Not => {
                not_count += 1;
                not_token.get_or_insert(token);
            }
            _ => {
                step_token = Some(token);
            }
        }
    }
    if not_count % 2 == 1 {
        if let Some(token) = not_token {
            root.set(Tag::Op, Node::token(token));
        }
    }
    if let Some(token) = step_token {
        root.set(Tag::PreOp, Node::token(token));
    }

    root.slot(Tag::Exprs).add_child(head);
    for atom in dotted {
        let mut pair = atom.seq();
        root.slot(Tag::Exprs).add_child(pair.swap_remove(1).node());
    }
    root
}

fn fold_prim_expr(raw: RawValue) -> Node {
    let (variant, value) = raw.alt();
    let mut root = Node::new(Tag::PrimExpr);
    match variant {
        0 => root.set(Tag::Literal, value.node()),
        1 => root.set(Tag::Identifier, value.node()),
        _ => {
            let mut items = value.seq();
            root.set(Tag::HeadExpr, items.swap_remove(1).node());
        }
    }
    root
}

fn fold_chain(tag: Tag, raw: RawValue) -> Node {
    let mut items = raw.seq();
    let tails = items.pop().expect("chain tail list").list();
    let first = items.pop().expect("chain head").node();

    let mut root = Node::new(tag);
    root.slot(Tag::Exprs).add_child(first);
    for tail in tails {
        let mut pair = tail.seq();
        let rhs = pair.pop().expect("chain operand").node();
        let (_, op) = pair.pop().expect("chain operator").alt();
        root.slot(Tag::Exprs).add_child(rhs);
        root.slot(Tag::Ops).add_child(Node::token(op.leaf()));
    }
    root
}

fn fold_array_expr(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let mut root = Node::new(Tag::ArrayExpr);
    let (variant, elements) = items.swap_remove(1).alt();
    if variant == 0 {
        let mut parts = elements.seq();
        let tails = parts.pop().expect("element tail list").list();
        root.slot(Tag::Exprs)
            .add_child(parts.pop().expect("first element").node());
        for tail in tails {
            let mut pair = tail.seq();
            root.slot(Tag::Exprs).add_child(pair.swap_remove(1).node());
        }
    }
    root
}

fn fold_assign_expr(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let value = items.pop().expect("assigned value").node();
    let (_, op) = items.pop().expect("assignment operator").alt();
    let target = items.pop().expect("assignment target").node();

    let mut root = Node::new(Tag::AssignExpr);
    root.set(Tag::Identifier, target);
    root.set(Tag::Op, Node::token(op.leaf()));
    root.set(Tag::HeadExpr, value);
    root
}

/// Choice productions that store the winning child under its own tag.
fn fold_tagged_choice(tag: Tag, raw: RawValue) -> Node {
    let (_, value) = raw.alt();
    let inner = value.node();
    let mut root = Node::new(tag);
    root.set(inner.tag(), inner);
    root
}

fn fold_basic_type(raw: RawValue) -> Node {
    let (_, keyword) = raw.alt();
    let mut root = Node::new(Tag::BasicTypeModifier);
    root.set(Tag::Keyword, Node::token(keyword.leaf()));
    root
}

fn fold_array_type(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let basic = items.pop().expect("element type").node();
    let dims = items.pop().expect("dimension list").list();

    let mut root = Node::new(Tag::ArrayTypeModifier);
    for dim in dims {
        let mut parts = dim.seq();
        root.slot(Tag::Exprs).add_child(parts.swap_remove(1).node());
    }
    root.set(Tag::HeadExpr, basic);
    root
}

fn fold_range_expr(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let (variant, value) = items.swap_remove(1).alt();
    let mut root = Node::new(Tag::RangeExpr);
    match variant {
        0 => root.set(Tag::ArrayExpr, value.node()),
        _ => root.set(Tag::Identifier, value.node()),
    }
    root
}

fn fold_declare_stmt(raw: RawValue) -> Result<Node> {
    let mut items = raw.seq();
    items.pop();
    let opt_init = items.pop().expect("optional initializer");
    let opt_type = items.pop().expect("optional annotation");
    let name = items.pop().expect("declared name").leaf();

    let mut root = Node::new(Tag::DeclareStmt);
    let name_pos = name.position();
    root.set(Tag::Identifier, Node::token(name));

    let mut has_type = false;
    if let Some(clause) = opt_type.list().into_iter().next() {
        let mut parts = clause.seq();
        root.set(Tag::Type, parts.swap_remove(1).node());
        has_type = true;
    }

    match opt_init.list().into_iter().next() {
        Some(clause) => {
            let mut parts = clause.seq();
            root.set(Tag::AssignTerm, parts.swap_remove(1).node());
        }
        None if !has_type => {
            return Err(CompileError::new(
                Stage::Ast,
                "A declaration must have an initializer if no type constraint is specified",
            )
            .at(name_pos));
        }
        None => {}
    }
    Ok(root)
}

fn fold_expr_stmt(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let (_, value) = items.swap_remove(0).alt();
    let inner = value.node();
    let mut root = Node::new(Tag::ExprStmt);
    root.set(inner.tag(), inner);
    root
}

fn fold_if_stmt(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let opt_else = items.pop().expect("optional else");
    let block = items.pop().expect("then block").node();
    items.pop();
    let cond = items.pop().expect("condition").node();

    let mut root = Node::new(Tag::IfStmt);
    root.set(Tag::Condition, cond);
    root.set(Tag::Block, block);
    if let (0, value) = opt_else.alt() {
        root.set(Tag::ElseStmt, value.node());
    }
    root
}

fn fold_else_stmt(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let mut root = Node::new(Tag::ElseStmt);
    root.set(Tag::Block, items.swap_remove(1).node());
    root
}

fn fold_while_stmt(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let block = items.pop().expect("loop body").node();
    items.pop();
    let cond = items.pop().expect("condition").node();

    let mut root = Node::new(Tag::WhileStmt);
    root.set(Tag::Condition, cond);
    root.set(Tag::Block, block);
    root
}

fn fold_for_stmt(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let block = items.pop().expect("loop body").node();
    items.pop();
    let (variant, head) = items.pop().expect("loop head").alt();

    let mut root = Node::new(Tag::ForStmt);
    if variant == 0 {
        let mut parts = head.seq();
        let step = parts.pop().expect("step expression").node();
        parts.pop();
        let cond = parts.pop().expect("condition").node();
        let decl = parts.pop().expect("init declaration").node();
        root.set(Tag::DeclareStmt, decl);
        root.set(Tag::Condition, cond);
        root.set(Tag::HeadExpr, step);
    } else {
        let mut parts = head.seq();
        let range = parts.pop().expect("range expression").node();
        parts.pop();
        let opt_type = parts.pop().expect("optional annotation");
        let name = parts.pop().expect("binding name").leaf();
        root.set(Tag::Identifier, Node::token(name));
        if let Some(clause) = opt_type.list().into_iter().next() {
            let mut ty = clause.seq();
            root.set(Tag::Type, ty.swap_remove(1).node());
        }
        root.set(Tag::AssignTerm, range);
    }
    root.set(Tag::Block, block);
    root
}

fn fold_block_stmt(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let stmts = items.swap_remove(1).list();
    let mut root = Node::new(Tag::BlockStmt);
    for stmt in stmts {
        let (_, value) = stmt.alt();
        root.slot(Tag::Stmts).add_child(value.node());
    }
    root
}

fn fold_return_stmt(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let mut root = Node::new(Tag::ReturnStmt);
    root.set(Tag::HeadExpr, items.swap_remove(1).node());
    root
}

fn fold_func_define(raw: RawValue) -> Node {
    let mut items = raw.seq();
    let block = items.pop().expect("function body").node();
    let ret_type = items.pop().expect("return type").node();
    items.pop();
    items.pop();
    let opt_params = items.pop().expect("optional parameters");
    items.pop();
    let name = items.pop().expect("function name").leaf();

    let mut root = Node::new(Tag::FuncDefineStmt);
    root.set(Tag::Identifier, Node::token(name));

    if let (0, value) = opt_params.alt() {
        let mut parts = value.seq();
        let tails = parts.pop().expect("parameter tail list").list();
        let first = parts.pop().expect("first parameter");

        let args = root.slot(Tag::Args);
        push_param(args, first);
        for tail in tails {
            let mut pair = tail.seq();
            push_param(args, pair.swap_remove(1));
        }
    }

    root.set(Tag::Type, ret_type);
    root.set(Tag::Block, block);
    root
}

fn push_param(args: &mut Node, param: RawValue) {
    let mut parts = param.seq();
    let ty = parts.pop().expect("parameter type").node();
    parts.pop();
    let name = parts.pop().expect("parameter name").leaf();
    args.slot(Tag::Types).add_child(ty);
    args.slot(Tag::Exprs).add_child(Node::token(name));
}
