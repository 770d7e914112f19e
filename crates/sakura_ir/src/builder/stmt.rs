//! Statement and control-flow lowering.
//!
//! Structured control flow becomes explicit block topology:
//!
//! ```text
//! if:     before ──cond_br──► if.then ──br──► if.merge
//!                └──────────► if.else ──br──────┘
//! while:  before ─br─► while.prep ─cond_br─► while.body ─br─► while.prep
//!                                     └─────► while.merge
//! for:    before(init) ─br─► for.cond ─cond_br─► for.body ─br─► for.step ─br─► for.cond
//!                                        └──────► for.merge
//! ```
//!
//! Branch wiring always goes through `seal_with_br`, which leaves blocks
//! already terminated by a `ret` alone, so `if { return } else { return }`
//! keeps exactly one terminal per block.

use super::expr::ExprLowering;
use super::IrBuilder;
use crate::instruction::OpKind;
use crate::types::TypeKind;
use crate::constant::ConstValue;
use crate::value::{BlockId, ValueRef};
use sakura_base::Result;
use sakura_syntax::ast::{Node, Tag};

pub trait StmtLowering<'t> {
    fn visit_stmt_node(&mut self, node: &Node) -> Result<()>;
    fn visit_declare(&mut self, node: &Node) -> Result<ValueRef>;
    fn visit_expr_stmt(&mut self, node: &Node) -> Result<()>;
    fn visit_if(&mut self, node: &Node) -> Result<()>;
    fn visit_while(&mut self, node: &Node) -> Result<()>;
    fn visit_for(&mut self, node: &Node) -> Result<()>;
    fn visit_block(&mut self, node: &Node, label: &str, before: Option<BlockId>)
        -> Result<BlockId>;
    fn visit_return(&mut self, node: &Node) -> Result<()>;
    fn visit_func_define(&mut self, node: &Node) -> Result<()>;
}

impl<'t> StmtLowering<'t> for IrBuilder<'t> {
    fn visit_stmt_node(&mut self, node: &Node) -> Result<()> {
        match node.tag() {
            Tag::Stmt => {
                let inner = node
                    .children()
                    .next()
                    .ok_or_else(|| self.err("Empty statement wrapper", node))?;
                self.visit_stmt_node(inner)
            }
            Tag::DeclareStmt => self.visit_declare(node).map(|_| ()),
            Tag::ExprStmt => self.visit_expr_stmt(node),
            Tag::IfStmt => self.visit_if(node),
            Tag::WhileStmt => self.visit_while(node),
            Tag::ForStmt => self.visit_for(node),
            Tag::BlockStmt => {
                let before = self.cur_block_id()?;
                self.visit_block(node, "blockStmt", Some(before))?;
                Ok(())
            }
            Tag::ReturnStmt => self.visit_return(node),
            Tag::FuncDefineStmt => self.visit_func_define(node),
            other => Err(self.err(format!("Unknown statement {:?}", other), node)),
        }
    }

    fn visit_declare(&mut self, node: &Node) -> Result<ValueRef> {
        let name = node
            .child(Tag::Identifier)
            .and_then(|n| n.content())
            .ok_or_else(|| self.err("Declaration without a name", node))?
            .lexeme
            .clone();

        let annotated = match node.child(Tag::Type) {
            Some(ty_node) => Some(self.resolve_type(ty_node)?),
            None => None,
        };
        let init = match node.child(Tag::AssignTerm) {
            Some(init_node) => Some(self.visit_whole(init_node)?),
            None => None,
        };

        match (annotated, init) {
            (Some(ty), Some(value)) => {
                let value_ty = self.type_of(value)?;
                if !self.types_match(value_ty, ty) {
                    return Err(self.err(
                        format!(
                            "Initializer of type {} does not match declared type {}",
                            value_ty, ty
                        ),
                        node,
                    ));
                }
                self.declare_symbol(&name, ty, Some(value), node)
            }
            (Some(ty), None) => self.declare_symbol(&name, ty, None, node),
            (None, Some(value)) => {
                let ty = self.type_of(value)?;
                self.declare_symbol(&name, ty, Some(value), node)
            }
            (None, None) => Err(self.err(
                "A declaration must have an initializer if no type constraint is specified",
                node,
            )),
        }
    }

    fn visit_expr_stmt(&mut self, node: &Node) -> Result<()> {
        if let Some(assign) = node.child(Tag::AssignExpr) {
            self.visit_assign(assign)?;
        } else if let Some(ident) = node.child(Tag::IdentifierExpr) {
            self.visit_identifier_read(ident)?;
        } else {
            return Err(self.err("Empty expression statement", node));
        }
        Ok(())
    }

    fn visit_if(&mut self, node: &Node) -> Result<()> {
        let cond_node = node
            .child(Tag::Condition)
            .ok_or_else(|| self.err("if without a condition", node))?;
        let cond = self.visit_binary(cond_node)?;
        self.expect_bool(cond, cond_node)?;
        let before = self.cur_block_id()?;

        let then_node = node
            .child(Tag::Block)
            .ok_or_else(|| self.err("if without a block", node))?;
        let then_entry = self.visit_block(then_node, "if.then", None)?;
        let then_exit = self.cur_block_id()?;

        let mut else_blocks = None;
        if let Some(else_stmt) = node.child(Tag::ElseStmt) {
            let else_body = else_stmt
                .child(Tag::Block)
                .ok_or_else(|| self.err("else without a block", node))?;
            let else_entry = self.visit_block(else_body, "if.else", None)?;
            else_blocks = Some((else_entry, self.cur_block_id()?));
        }

        let merge = self.build_block("if.merge")?;

        let else_entry = else_blocks.map(|(entry, _)| entry).unwrap_or(merge);
        self.emit_cond_br(before, cond, then_entry, else_entry)?;
        self.seal_with_br(then_exit, merge)?;
        if let Some((_, else_exit)) = else_blocks {
            self.seal_with_br(else_exit, merge)?;
        }

        self.move_cursor(merge)
    }

    fn visit_while(&mut self, node: &Node) -> Result<()> {
        let before = self.cur_block_id()?;

        let prep = self.build_block("while.prep")?;
        self.seal_with_br(before, prep)?;

        let cond_node = node
            .child(Tag::Condition)
            .ok_or_else(|| self.err("while without a condition", node))?;
        let cond = self.visit_binary(cond_node)?;
        self.expect_bool(cond, cond_node)?;
        let prep_exit = self.cur_block_id()?;

        let body_node = node
            .child(Tag::Block)
            .ok_or_else(|| self.err("while without a body", node))?;
        let body_entry = self.visit_block(body_node, "while.body", None)?;
        let body_exit = self.cur_block_id()?;

        let merge = self.build_block("while.merge")?;

        self.seal_with_br(body_exit, prep)?;
        self.emit_cond_br(prep_exit, cond, body_entry, merge)?;
        self.move_cursor(merge)
    }

    fn visit_for(&mut self, node: &Node) -> Result<()> {
        if node.has(Tag::DeclareStmt) {
            self.visit_for_c(node)
        } else {
            self.visit_for_range(node)
        }
    }

    /// Enter scope, allocate a fresh block (optionally wired from `before`),
    /// lower the statements, leave scope. Returns the entry block; the
    /// cursor ends wherever the last statement left it.
    fn visit_block(
        &mut self,
        node: &Node,
        label: &str,
        before: Option<BlockId>,
    ) -> Result<BlockId> {
        let entry = self.build_block(label)?;
        if let Some(prev) = before {
            self.seal_with_br(prev, entry)?;
        }

        self.scope_enter()?;
        if let Some(stmts) = node.child(Tag::Stmts) {
            for stmt in stmts.children() {
                self.visit_stmt_node(stmt)?;
            }
        }
        self.scope_leave()?;
        Ok(entry)
    }

    fn visit_return(&mut self, node: &Node) -> Result<()> {
        let value_node = node
            .child(Tag::HeadExpr)
            .ok_or_else(|| self.err("return without a value", node))?;
        let value = self.visit_whole(value_node)?;

        let value_ty = self.type_of(value)?;
        let ret_ty = self.cur_func()?.ret_ty();
        if !self.types_match(value_ty, ret_ty) {
            return Err(self.err(
                format!(
                    "Return value of type {} does not match function return type {}",
                    value_ty, ret_ty
                ),
                node,
            ));
        }

        let void = self.types.void_ty();
        self.emit(OpKind::Ret, void, vec![value], "ret")?;
        Ok(())
    }

    fn visit_func_define(&mut self, node: &Node) -> Result<()> {
        let name = node
            .child(Tag::Identifier)
            .and_then(|n| n.content())
            .ok_or_else(|| self.err("Function without a name", node))?
            .lexeme
            .clone();

        let mut params: Vec<(String, crate::types::Ty<'t>)> = Vec::new();
        if let Some(args) = node.child(Tag::Args) {
            let types: Vec<&Node> = args
                .child(Tag::Types)
                .map(|l| l.children().collect())
                .unwrap_or_default();
            let names: Vec<&Node> = args
                .child(Tag::Exprs)
                .map(|l| l.children().collect())
                .unwrap_or_default();
            for (ty_node, name_node) in types.iter().zip(names.iter()) {
                let ty = self.resolve_type(ty_node)?;
                let pname = name_node
                    .content()
                    .ok_or_else(|| self.err("Parameter without a name", node))?
                    .lexeme
                    .clone();
                params.push((pname, ty));
            }
        }

        let ret_node = node
            .child(Tag::Type)
            .ok_or_else(|| self.err("Function without a return type", node))?;
        let ret_ty = self.resolve_type(ret_node)?;

        let param_tys: Vec<crate::types::Ty<'t>> = params.iter().map(|(_, t)| *t).collect();
        let fn_ty = self.types.function(ret_ty, &param_tys);

        let position = node.position();
        let fid = self
            .program
            .cur_module_mut()
            .build_function(&name, ret_ty, fn_ty, params.clone());
        self.program
            .cur_module_mut()
            .scope
            .declare(&name, ValueRef::Func(fid), fn_ty)
            .map_err(|err| match position {
                Some(pos) => err.at(pos),
                None => err,
            })?;

        // Formal parameters become local slots in the entry block.
        for (i, (pname, pty)) in params.iter().enumerate() {
            self.declare_symbol(pname, *pty, Some(ValueRef::Param(i as u32)), node)?;
        }

        let body = node
            .child(Tag::Block)
            .ok_or_else(|| self.err("Function without a body", node))?;
        let entry = BlockId(0);
        self.visit_block(body, &format!("fn.{}", name), Some(entry))?;
        log::debug!("lowered function '{}'", name);
        Ok(())
    }
}

impl<'t> IrBuilder<'t> {
    fn visit_for_c(&mut self, node: &Node) -> Result<()> {
        self.scope_enter()?;

        let decl = node
            .child(Tag::DeclareStmt)
            .ok_or_else(|| self.err("for without an init declaration", node))?;
        self.visit_declare(decl)?;
        let init_exit = self.cur_block_id()?;

        let cond_block = self.build_block("for.cond")?;
        let cond_node = node
            .child(Tag::Condition)
            .ok_or_else(|| self.err("for without a condition", node))?;
        let cond = self.visit_whole(cond_node)?;
        self.expect_bool(cond, cond_node)?;
        let cond_exit = self.cur_block_id()?;

        let body_node = node
            .child(Tag::Block)
            .ok_or_else(|| self.err("for without a body", node))?;
        let body_entry = self.visit_block(body_node, "for.body", None)?;
        let body_exit = self.cur_block_id()?;

        let step = self.build_block("for.step")?;
        let step_node = node
            .child(Tag::HeadExpr)
            .ok_or_else(|| self.err("for without a step expression", node))?;
        self.visit_whole(step_node)?;
        let step_exit = self.cur_block_id()?;

        let merge = self.build_block("for.merge")?;

        self.seal_with_br(init_exit, cond_block)?;
        self.emit_cond_br(cond_exit, cond, body_entry, merge)?;
        self.seal_with_br(body_exit, step)?;
        self.seal_with_br(step_exit, cond_block)?;

        self.scope_leave()?;
        self.move_cursor(merge)
    }

    /// Range-style `for` over an array literal: hidden index slot, element
    /// bound per iteration, same block topology as the C-style loop.
    fn visit_for_range(&mut self, node: &Node) -> Result<()> {
        let range = node
            .child(Tag::AssignTerm)
            .ok_or_else(|| self.err("for without a range expression", node))?;
        if range.has(Tag::Identifier) {
            return Err(self.err("Range iteration over an identifier is not supported", node));
        }
        let array_node = range
            .child(Tag::ArrayExpr)
            .ok_or_else(|| self.err("Range expression without an array", node))?;

        self.scope_enter()?;

        let array = self.visit_array_literal(array_node)?;
        let TypeKind::Array { elem, len } = *self.type_of(array)? else {
            return Err(self.err("Range expression did not produce an array", node));
        };
        if len == 0 {
            self.scope_leave()?;
            return Err(self.err("Cannot range over an empty array literal", node));
        }

        let int32 = self.types.int32_ty();
        let void = self.types.void_ty();

        let var_ty = match node.child(Tag::Type) {
            Some(ty_node) => {
                let ty = self.resolve_type(ty_node)?;
                if !self.types_match(ty, elem) {
                    return Err(self.err(
                        format!("Range elements have type {}, not {}", elem, ty),
                        node,
                    ));
                }
                ty
            }
            None => elem,
        };

        let idx_name = format!("riv.{}", self.riv_counter);
        self.riv_counter += 1;
        let zero = ValueRef::Const(self.consts.intern(int32, ConstValue::Int(0)));
        let idx_slot = self.declare_symbol(&idx_name, int32, Some(zero), node)?;

        let var_name = node
            .child(Tag::Identifier)
            .and_then(|n| n.content())
            .ok_or_else(|| self.err("Range binding without a name", node))?
            .lexeme
            .clone();
        let first = self.emit(OpKind::Indexing, elem, vec![array, zero], "indexing")?;
        let var_slot = self.declare_symbol(&var_name, var_ty, Some(first), node)?;
        let before_exit = self.cur_block_id()?;

        let cond_block = self.build_block("for.cond")?;
        let idx = self.emit(OpKind::Load, int32, vec![idx_slot], "load")?;
        let bound = ValueRef::Const(self.consts.intern(int32, ConstValue::Int(len as i64)));
        let bool_ty = self.types.bool_ty();
        let cond = self.emit(OpKind::LgcLsThan, bool_ty, vec![idx, bound], "lgc_ls_than")?;
        let cond_exit = self.cur_block_id()?;

        let body_entry = self.build_block("for.body")?;
        let idx_again = self.emit(OpKind::Load, int32, vec![idx_slot], "load")?;
        let element = self.emit(OpKind::Indexing, elem, vec![array, idx_again], "indexing")?;
        self.emit(OpKind::Assign, void, vec![var_slot, element], "assign")?;
        self.scope_enter()?;
        if let Some(body) = node.child(Tag::Block).and_then(|b| b.child(Tag::Stmts)) {
            for stmt in body.children() {
                self.visit_stmt_node(stmt)?;
            }
        }
        self.scope_leave()?;
        let body_exit = self.cur_block_id()?;

        let step = self.build_block("for.step")?;
        let idx_step = self.emit(OpKind::Load, int32, vec![idx_slot], "load")?;
        let one = ValueRef::Const(self.consts.intern(int32, ConstValue::Int(1)));
        let next = self.emit(OpKind::Add, int32, vec![idx_step, one], "add")?;
        self.emit(OpKind::Assign, void, vec![idx_slot, next], "assign")?;
        let step_exit = self.cur_block_id()?;

        let merge = self.build_block("for.merge")?;

        self.seal_with_br(before_exit, cond_block)?;
        self.emit_cond_br(cond_exit, cond, body_entry, merge)?;
        self.seal_with_br(body_exit, step)?;
        self.seal_with_br(step_exit, cond_block)?;

        self.scope_leave()?;
        self.move_cursor(merge)
    }
}
