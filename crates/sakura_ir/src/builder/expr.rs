//! Expression lowering.
//!
//! Every method returns the IR value the expression evaluates to: the result
//! of the last instruction emitted, or a constant. Straight-line chains
//! (arithmetic, comparison) fold left; `&&`/`||` chains branch through a
//! boolean stack slot instead (see [`ExprLowering::visit_binary`]).

use super::IrBuilder;
use crate::instruction::OpKind;
use crate::types::{Ty, TypeKind};
use crate::constant::ConstValue;
use crate::value::ValueRef;
use sakura_base::Result;
use sakura_syntax::ast::{Node, Tag};
use sakura_syntax::token::TokenKind;

/// How an identifier expression is being used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AccessMode {
    /// Read context: addresses are loaded through.
    Load,
    /// Assignment target: the final address is preserved.
    Address,
}

pub trait ExprLowering<'t> {
    fn visit_whole(&mut self, node: &Node) -> Result<ValueRef>;
    fn visit_binary(&mut self, node: &Node) -> Result<ValueRef>;
    fn visit_logic(&mut self, node: &Node) -> Result<ValueRef>;
    fn visit_add(&mut self, node: &Node) -> Result<ValueRef>;
    fn visit_mul(&mut self, node: &Node) -> Result<ValueRef>;
    fn visit_prim(&mut self, node: &Node) -> Result<ValueRef>;
    fn visit_literal(&mut self, node: &Node) -> Result<ValueRef>;
    fn visit_array_literal(&mut self, node: &Node) -> Result<ValueRef>;
    fn visit_assign(&mut self, node: &Node) -> Result<ValueRef>;
    fn visit_identifier_read(&mut self, node: &Node) -> Result<ValueRef>;
}

impl<'t> ExprLowering<'t> for IrBuilder<'t> {
    fn visit_whole(&mut self, node: &Node) -> Result<ValueRef> {
        if let Some(inner) = node.child(Tag::BinaryExpr) {
            self.visit_binary(inner)
        } else if let Some(inner) = node.child(Tag::AssignExpr) {
            self.visit_assign(inner)
        } else if let Some(inner) = node.child(Tag::ArrayExpr) {
            self.visit_array_literal(inner)
        } else {
            Err(self.err("Empty expression", node))
        }
    }

    /// `&&`/`||` chains lower to control flow: a `bool` slot `tbv.N` holds
    /// the running value, each right-hand side gets its own block, and every
    /// link short-circuits to `short.cur.merge`. The expression's value is a
    /// load of the slot in the merge block.
    fn visit_binary(&mut self, node: &Node) -> Result<ValueRef> {
        let exprs: Vec<&Node> = match node.child(Tag::Exprs) {
            Some(list) => list.children().collect(),
            None => return Err(self.err("Empty boolean expression", node)),
        };
        let mut value = self.visit_logic(exprs[0])?;

        let Some(ops_node) = node.child(Tag::Ops) else {
            return Ok(value);
        };
        let ops: Vec<&Node> = ops_node.children().collect();

        self.expect_bool(value, exprs[0])?;
        let bool_ty = self.types.bool_ty();
        let void = self.types.void_ty();

        let slot_name = format!("tbv.{}", self.tbv_counter);
        self.tbv_counter += 1;
        let slot = self.declare_symbol(&slot_name, bool_ty, Some(value), node)?;

        let mut before = self.cur_block_id()?;
        let merge = self.build_block("short.cur.merge")?;

        for (i, op) in ops.iter().enumerate() {
            let rhs_node = exprs[i + 1];
            let op_kind = op
                .content()
                .map(|t| t.kind)
                .ok_or_else(|| self.err("Malformed boolean operator", node))?;

            let label = match op_kind {
                TokenKind::AndAnd => {
                    let label = format!("and.rhs{}", self.and_counter);
                    self.and_counter += 1;
                    label
                }
                _ => {
                    let label = format!("or.rhs{}", self.or_counter);
                    self.or_counter += 1;
                    label
                }
            };
            let rhs_block = self.build_block(&label)?;

            let rhs_value = self.visit_logic(rhs_node)?;
            self.expect_bool(rhs_value, rhs_node)?;
            self.emit(OpKind::Assign, void, vec![slot, rhs_value], "assign")?;
            let rhs_exit = self.cur_block_id()?;

            match op_kind {
                TokenKind::AndAnd => self.emit_cond_br(before, value, rhs_block, merge)?,
                _ => self.emit_cond_br(before, value, merge, rhs_block)?,
            }

            before = rhs_exit;
            value = rhs_value;
        }

        self.seal_with_br(before, merge)?;
        self.move_cursor(merge)?;
        self.emit(OpKind::Load, bool_ty, vec![slot], format!("load.{}", slot_name))
    }

    fn visit_logic(&mut self, node: &Node) -> Result<ValueRef> {
        let bool_ty = self.types.bool_ty();
        self.fold_chain(node, Self::visit_add, |builder, op, lhs, rhs, at| {
            let (lty, rty) = (builder.type_of(lhs)?, builder.type_of(rhs)?);
            builder.check_comparable(lty, rty, at)?;
            let kind = match op {
                TokenKind::Lt => OpKind::LgcLsThan,
                TokenKind::Le => OpKind::LgcEqLsThan,
                TokenKind::Gt => OpKind::LgcMrThan,
                TokenKind::Ge => OpKind::LgcEqMrThan,
                TokenKind::EqEq => OpKind::LgcEqual,
                TokenKind::NotEq => OpKind::LgcNotEqual,
                other => {
                    return Err(builder.err(
                        format!("Unknown comparison operator {}", other.describe()),
                        at,
                    ))
                }
            };
            builder.emit(kind, bool_ty, vec![lhs, rhs], kind.mnemonic())
        })
    }

    fn visit_add(&mut self, node: &Node) -> Result<ValueRef> {
        self.fold_chain(node, Self::visit_mul, |builder, op, lhs, rhs, at| {
            let kind = match op {
                TokenKind::Plus => OpKind::Add,
                TokenKind::Minus => OpKind::Sub,
                other => {
                    return Err(builder.err(
                        format!("Unknown additive operator {}", other.describe()),
                        at,
                    ))
                }
            };
            let ty = builder.unify_operands(lhs, rhs, at)?;
            builder.emit(kind, ty, vec![lhs, rhs], kind.mnemonic())
        })
    }

    fn visit_mul(&mut self, node: &Node) -> Result<ValueRef> {
        self.fold_chain(node, Self::visit_prim, |builder, op, lhs, rhs, at| {
            let kind = match op {
                TokenKind::Star => OpKind::Mul,
                TokenKind::Slash => OpKind::Div,
                TokenKind::Percent => OpKind::Mod,
                other => {
                    return Err(builder.err(
                        format!("Unknown multiplicative operator {}", other.describe()),
                        at,
                    ))
                }
            };
            let ty = builder.unify_operands(lhs, rhs, at)?;
            builder.emit(kind, ty, vec![lhs, rhs], kind.mnemonic())
        })
    }

    fn visit_prim(&mut self, node: &Node) -> Result<ValueRef> {
        if let Some(literal) = node.child(Tag::Literal) {
            self.visit_literal(literal)
        } else if let Some(identifier) = node.child(Tag::Identifier) {
            self.visit_identifier_read(identifier)
        } else if let Some(grouped) = node.child(Tag::HeadExpr) {
            self.visit_whole(grouped)
        } else {
            Err(self.err("Empty primary expression", node))
        }
    }

    fn visit_literal(&mut self, node: &Node) -> Result<ValueRef> {
        let token = node
            .child(Tag::Literal)
            .and_then(|n| n.content())
            .ok_or_else(|| self.err("Literal node without a token", node))?
            .clone();

        let (ty, value) = match token.kind {
            TokenKind::Int => {
                let parsed = token.lexeme.parse::<i64>().map_err(|_| {
                    self.err(format!("Invalid integer literal '{}'", token.lexeme), node)
                })?;
                (self.types.int32_ty(), ConstValue::Int(parsed))
            }
            TokenKind::Float => {
                let parsed = token.lexeme.parse::<f64>().map_err(|_| {
                    self.err(format!("Invalid float literal '{}'", token.lexeme), node)
                })?;
                (self.types.float_ty(), ConstValue::Float(parsed))
            }
            TokenKind::Str => {
                let ty = self.types.pointer_to(self.types.char_ty());
                let id = self.consts.intern_str(ty, &token.lexeme);
                return self.emit(OpKind::Constant, ty, vec![ValueRef::Const(id)], "constant");
            }
            TokenKind::Char => {
                let ch = token.lexeme.chars().next().unwrap_or('\0');
                (self.types.char_ty(), ConstValue::Char(ch))
            }
            TokenKind::Bool => (
                self.types.bool_ty(),
                ConstValue::Bool(token.lexeme == "true"),
            ),
            other => {
                return Err(self.err(
                    format!("Unknown literal kind {}", other.describe()),
                    node,
                ))
            }
        };
        let id = self.consts.intern(ty, value);
        self.emit(OpKind::Constant, ty, vec![ValueRef::Const(id)], "constant")
    }

    /// Elements lower left-to-right, each exactly once; the result is a
    /// `create_array` of the common element type.
    fn visit_array_literal(&mut self, node: &Node) -> Result<ValueRef> {
        let elements: Vec<&Node> = match node.child(Tag::Exprs) {
            Some(list) => list.children().collect(),
            None => {
                return Err(self.err("Cannot infer the type of an empty array literal", node))
            }
        };

        let mut values = Vec::with_capacity(elements.len());
        let mut elem_ty: Option<Ty<'t>> = None;
        for element in &elements {
            let value = self.visit_whole(element)?;
            let ty = self.type_of(value)?;
            match elem_ty {
                None => elem_ty = Some(ty),
                Some(expected) if self.types_match(expected, ty) => {}
                Some(expected) => {
                    return Err(self.err(
                        format!(
                            "Array elements must share one type, found {} and {}",
                            expected, ty
                        ),
                        element,
                    ))
                }
            }
            values.push(value);
        }

        let elem_ty = elem_ty.expect("non-empty array literal");
        let array_ty = self.types.array_of(elem_ty, values.len() as u64);
        self.emit(OpKind::CreateArray, array_ty, values, "create-array")
    }

    fn visit_assign(&mut self, node: &Node) -> Result<ValueRef> {
        let target = node
            .child(Tag::Identifier)
            .ok_or_else(|| self.err("Assignment without a target", node))?;
        let op_kind = node
            .child(Tag::Op)
            .and_then(|n| n.content())
            .map(|t| t.kind)
            .ok_or_else(|| self.err("Assignment without an operator", node))?;
        let value_node = node
            .child(Tag::HeadExpr)
            .ok_or_else(|| self.err("Assignment without a value", node))?;

        let value = self.visit_whole(value_node)?;
        let (addr, target_ty) = self.lower_identifier(target, AccessMode::Address)?;
        let void = self.types.void_ty();

        let stored = match op_kind {
            TokenKind::Assign => value,
            compound => {
                let arith = match compound {
                    TokenKind::PlusAssign => OpKind::Add,
                    TokenKind::MinusAssign => OpKind::Sub,
                    TokenKind::StarAssign => OpKind::Mul,
                    TokenKind::SlashAssign => OpKind::Div,
                    other => {
                        return Err(self.err(
                            format!("Unknown assignment operator {}", other.describe()),
                            node,
                        ))
                    }
                };
                let loaded = self.emit(OpKind::Load, target_ty, vec![addr], "load")?;
                let ty = self.unify_operands(loaded, value, node)?;
                self.emit(arith, ty, vec![loaded, value], arith.mnemonic())?
            }
        };

        let stored_ty = self.type_of(stored)?;
        if !self.types_match(stored_ty, target_ty) {
            return Err(self.err(
                format!("Cannot assign a {} value to a {} target", stored_ty, target_ty),
                node,
            ));
        }
        self.emit(OpKind::Assign, void, vec![addr, stored], "assign")?;
        Ok(stored)
    }

    fn visit_identifier_read(&mut self, node: &Node) -> Result<ValueRef> {
        // Pre-increment/decrement rewrites the slot and yields the new value.
        if let Some(step) = node.child(Tag::PreOp).and_then(|n| n.content()) {
            let step_kind = step.kind;
            let (addr, ty) = self.simple_slot(node)?;
            let loaded = self.emit(OpKind::Load, ty, vec![addr], "load")?;
            let one = self.one_const(ty, node)?;
            let op = if step_kind == TokenKind::PlusPlus {
                OpKind::Add
            } else {
                OpKind::Sub
            };
            let new = self.emit(op, ty, vec![loaded, one], op.mnemonic())?;
            let void = self.types.void_ty();
            self.emit(OpKind::Assign, void, vec![addr, new], "assign")?;
            return self.apply_not(node, new);
        }

        let (value, _) = self.lower_identifier(node, AccessMode::Load)?;
        self.apply_not(node, value)
    }
}

impl<'t> IrBuilder<'t> {
    /// Left-folds a chain node (`Exprs` interleaved with `Ops`).
    fn fold_chain(
        &mut self,
        node: &Node,
        mut leaf: impl FnMut(&mut Self, &Node) -> Result<ValueRef>,
        mut combine: impl FnMut(
            &mut Self,
            TokenKind,
            ValueRef,
            ValueRef,
            &Node,
        ) -> Result<ValueRef>,
    ) -> Result<ValueRef> {
        let exprs: Vec<&Node> = match node.child(Tag::Exprs) {
            Some(list) => list.children().collect(),
            None => return Err(self.err("Empty expression chain", node)),
        };
        let mut value = leaf(self, exprs[0])?;

        if let Some(ops) = node.child(Tag::Ops) {
            for (i, op) in ops.children().enumerate() {
                let op_kind = op
                    .content()
                    .map(|t| t.kind)
                    .ok_or_else(|| self.err("Malformed operator node", node))?;
                let rhs = leaf(self, exprs[i + 1])?;
                value = combine(self, op_kind, value, rhs, exprs[i + 1])?;
            }
        }
        Ok(value)
    }

    fn unify_operands(&mut self, lhs: ValueRef, rhs: ValueRef, node: &Node) -> Result<Ty<'t>> {
        let (lty, rty) = (self.type_of(lhs)?, self.type_of(rhs)?);
        self.unify_arithmetic(lty, rty, node)
    }

    fn apply_not(&mut self, node: &Node, value: ValueRef) -> Result<ValueRef> {
        if node.child(Tag::Op).and_then(|n| n.content()).map(|t| t.kind) == Some(TokenKind::Not) {
            self.expect_bool(value, node)?;
            let bool_ty = self.types.bool_ty();
            return self.emit(OpKind::LgcNot, bool_ty, vec![value], "lgc_not");
        }
        Ok(value)
    }

    /// The slot behind a bare, op-free identifier (for `++`/`--` and
    /// compound targets).
    fn simple_slot(&mut self, node: &Node) -> Result<(ValueRef, Ty<'t>)> {
        let atoms: Vec<&Node> = node
            .child(Tag::Exprs)
            .map(|l| l.children().collect())
            .unwrap_or_default();
        let [atom] = atoms[..] else {
            return Err(self.err("Step operators require a plain identifier", node));
        };
        if atom.child(Tag::Ops).is_some() {
            return Err(self.err("Step operators require a plain identifier", node));
        }
        let name = atom
            .child(Tag::Identifier)
            .and_then(|n| n.content())
            .ok_or_else(|| self.err("Identifier without a name", node))?
            .lexeme
            .clone();
        let entry = self.lookup_symbol(&name, node)?;
        Ok((entry.address, entry.ty))
    }

    /// Walks an identifier expression: scope lookup, then calls, indexing,
    /// and member access in source order. In `Load` mode trailing addresses
    /// are loaded through; in `Address` mode the final address is returned
    /// for a store.
    pub(crate) fn lower_identifier(
        &mut self,
        node: &Node,
        mode: AccessMode,
    ) -> Result<(ValueRef, Ty<'t>)> {
        if mode == AccessMode::Address
            && (node.child(Tag::Op).is_some() || node.child(Tag::PreOp).is_some())
        {
            return Err(self.err("Invalid assignment target", node));
        }

        let atoms: Vec<&Node> = node
            .child(Tag::Exprs)
            .map(|l| l.children().collect())
            .unwrap_or_default();
        if atoms.is_empty() {
            return Err(self.err("Empty identifier expression", node));
        }

        let name = atoms[0]
            .child(Tag::Identifier)
            .and_then(|n| n.content())
            .ok_or_else(|| self.err("Identifier without a name", node))?
            .lexeme
            .clone();
        let entry = self.lookup_symbol(&name, node)?;

        let mut value = entry.address;
        let mut ty = entry.ty;
        // Slot addresses and gmem results want a trailing load in read
        // context; call and indexing results are already values.
        let mut holds_address = !matches!(value, ValueRef::Func(_));
        let mut last_was_call = false;

        for (i, atom) in atoms.iter().enumerate() {
            if i > 0 {
                let member = atom
                    .child(Tag::Identifier)
                    .and_then(|n| n.content())
                    .ok_or_else(|| self.err("Member access without a name", node))?;
                let str_ty = self.types.pointer_to(self.types.char_ty());
                let member_const = self.consts.intern_str(str_ty, &member.lexeme);
                value = self.emit(
                    OpKind::Gmem,
                    ty,
                    vec![value, ValueRef::Const(member_const)],
                    "gmem",
                )?;
                holds_address = true;
                last_was_call = false;
            }

            if let Some(ops) = atom.child(Tag::Ops) {
                for op in ops.children() {
                    match op.tag() {
                        Tag::CallingOp => {
                            (value, ty) = self.lower_call(op, value, ty, node)?;
                            holds_address = false;
                            last_was_call = true;
                        }
                        Tag::IndexOp => {
                            (value, ty) = self.lower_index(op, value, ty, node)?;
                            holds_address = false;
                            last_was_call = false;
                        }
                        other => {
                            return Err(self.err(
                                format!("Unexpected operator node {:?}", other),
                                node,
                            ))
                        }
                    }
                }
            }
        }

        match mode {
            AccessMode::Load => {
                if holds_address {
                    value = self.emit(OpKind::Load, ty, vec![value], format!("load.{}", name))?;
                }
                Ok((value, ty))
            }
            AccessMode::Address => {
                if last_was_call {
                    return Err(self.err("Cannot assign to the result of a call", node));
                }
                if matches!(value, ValueRef::Func(_)) {
                    return Err(self.err("Cannot assign to a function", node));
                }
                Ok((value, ty))
            }
        }
    }

    fn lower_call(
        &mut self,
        op: &Node,
        callee: ValueRef,
        callee_ty: Ty<'t>,
        at: &Node,
    ) -> Result<(ValueRef, Ty<'t>)> {
        let TypeKind::Function { ret, params } = *callee_ty else {
            return Err(self.err(
                format!("Call target of type {} is not a function", callee_ty),
                at,
            ));
        };
        let expected: Vec<Ty<'t>> = params.to_vec();

        let mut operands = vec![callee];
        let mut arg_count = 0usize;
        if let Some(args) = op.child(Tag::Exprs) {
            for arg in args.children() {
                let value = self.visit_whole(arg)?;
                let ty = self.type_of(value)?;
                match expected.get(arg_count) {
                    Some(&want) if self.types_match(want, ty) => {}
                    Some(&want) => {
                        return Err(self.err(
                            format!("Argument {} has type {}, expected {}", arg_count + 1, ty, want),
                            arg,
                        ))
                    }
                    None => {}
                }
                operands.push(value);
                arg_count += 1;
            }
        }
        if arg_count != expected.len() {
            return Err(self.err(
                format!(
                    "Call expects {} argument(s), found {}",
                    expected.len(),
                    arg_count
                ),
                at,
            ));
        }

        let name = match callee {
            ValueRef::Func(fid) => {
                format!("call.{}", self.program.cur_module().func(fid).name())
            }
            _ => "call".to_string(),
        };
        let result = self.emit(OpKind::Call, ret, operands, name)?;
        Ok((result, ret))
    }

    fn lower_index(
        &mut self,
        op: &Node,
        target: ValueRef,
        target_ty: Ty<'t>,
        at: &Node,
    ) -> Result<(ValueRef, Ty<'t>)> {
        let TypeKind::Array { elem, .. } = *target_ty else {
            return Err(self.err(
                format!("Cannot index into a value of type {}", target_ty),
                at,
            ));
        };
        let index_node = op
            .child(Tag::HeadExpr)
            .ok_or_else(|| self.err("Index operator without an index", at))?;
        let index = self.visit_add(index_node)?;
        let index_ty = self.type_of(index)?;
        if !index_ty.is_int() {
            return Err(self.err(
                format!("Array index must be an integer, found {}", index_ty),
                at,
            ));
        }
        let result = self.emit(OpKind::Indexing, elem, vec![target, index], "indexing")?;
        Ok((result, elem))
    }
}
