//! The AST-to-IR builder.
//!
//! One depth-first pass over the syntax tree. The builder owns the program
//! under construction, the constant pool, and the counters that keep
//! generated names (`tbv.N`, `and.rhsK`, ...) unique. The module/function/
//! block cursors live in the containment tree itself; the builder moves them
//! as it wires control flow.
//!
//! Expression lowering lives in [`expr`] and statement lowering in [`stmt`],
//! each a trait implemented on [`IrBuilder`], so the facets read separately
//! but share one state.
//!
//! Top-level statements outside any `func` land in an implicit module
//! function `__init`, created on first use. [`IrBuilder::finish`] seals every
//! block left unterminated: `ret` for void functions, `ret 0`-of-the-right-
//! type for value-returning ones (the post-`ret` merge blocks ifs produce).

pub mod expr;
pub mod stmt;


pub use expr::ExprLowering;
pub use stmt::StmtLowering;

use crate::constant::{ConstPool, ConstValue};
use crate::function::Function;
use crate::instruction::OpKind;
use crate::program::Program;
use crate::scope::SymbolEntry;
use crate::types::{Ty, TypeInterner, TypeKind};
use crate::value::{BlockId, ValueRef};
use sakura_base::{CompileError, Result, Stage};
use sakura_syntax::ast::{Node, Tag};
use sakura_syntax::token::TokenKind;

pub struct IrBuilder<'t> {
    pub(crate) types: &'t TypeInterner<'t>,
    pub consts: ConstPool<'t>,
    pub program: Program<'t>,
    pub(crate) init_func: Option<crate::value::FuncId>,
    pub(crate) tbv_counter: u32,
    pub(crate) and_counter: u32,
    pub(crate) or_counter: u32,
    pub(crate) riv_counter: u32,
}

impl<'t> IrBuilder<'t> {
    pub fn new(types: &'t TypeInterner<'t>, program_id: &str) -> Self {
        Self {
            types,
            consts: ConstPool::new(),
            program: Program::new(program_id),
            init_func: None,
            tbv_counter: 0,
            and_counter: 0,
            or_counter: 0,
            riv_counter: 0,
        }
    }

    /// Lowers one top-level statement.
    ///
    /// Function definitions become module functions; anything else goes into
    /// the implicit `__init` function.
    pub fn visit_toplevel(&mut self, node: &Node) -> Result<()> {
        let inner = if node.tag() == Tag::Stmt {
            node.children()
                .next()
                .ok_or_else(|| CompileError::new(Stage::System, "Empty statement wrapper"))?
        } else {
            node
        };

        if inner.tag() == Tag::FuncDefineStmt {
            self.visit_func_define(inner)?;
            return Ok(());
        }
        self.ensure_init_function()?;
        self.visit_stmt_node(inner)?;
        Ok(())
    }

    /// Seals every unterminated block and validates the result.
    pub fn finish(&mut self) -> Result<()> {
        let void = self.types.void_ty();
        let mut pending: Vec<(usize, BlockId, Ty<'t>, String)> = Vec::new();

        for (fidx, func) in self.program.cur_module().functions().iter().enumerate() {
            for block in func.blocks() {
                if !block.is_terminated() {
                    pending.push((fidx, block.id(), func.ret_ty(), func.name().to_string()));
                }
            }
        }

        for (fidx, bid, ret_ty, fname) in pending {
            let operands = if matches!(ret_ty, TypeKind::Void) {
                vec![]
            } else {
                let zero = self.zero_const(ret_ty).ok_or_else(|| {
                    CompileError::new(
                        Stage::Ir,
                        format!("Function '{}' has a path that does not return a value", fname),
                    )
                })?;
                vec![ValueRef::Const(zero)]
            };
            let func = self
                .program
                .cur_module_mut()
                .func_mut(crate::value::FuncId(fidx as u32));
            func.block_mut(bid).append(OpKind::Ret, void, operands, "ret")?;
        }
        log::debug!(
            "ir build finished: {} function(s), {} constant(s)",
            self.program.cur_module().functions().len(),
            self.consts.len()
        );
        Ok(())
    }

    pub(crate) fn ensure_init_function(&mut self) -> Result<()> {
        match self.init_func {
            Some(fid) => self.program.cur_module_mut().move_cursor(fid),
            None => {
                let void = self.types.void_ty();
                let fn_ty = self.types.function(void, &[]);
                let fid = self
                    .program
                    .cur_module_mut()
                    .build_function("__init", void, fn_ty, vec![]);
                self.init_func = Some(fid);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Cursor and emission helpers
    // ------------------------------------------------------------------

    pub(crate) fn cur_func(&self) -> Result<&Function<'t>> {
        self.program.cur_module().cur_func()
    }

    pub(crate) fn cur_block_id(&self) -> Result<BlockId> {
        Ok(self.cur_func()?.cur_block_id())
    }

    pub(crate) fn build_block(&mut self, label: &str) -> Result<BlockId> {
        Ok(self
            .program
            .cur_module_mut()
            .cur_func_mut()?
            .build_block(label))
    }

    pub(crate) fn move_cursor(&mut self, target: BlockId) -> Result<()> {
        self.program.cur_module_mut().cur_func_mut()?.move_cursor(target)
    }

    /// Emits into the current block.
    pub(crate) fn emit(
        &mut self,
        op: OpKind,
        ty: Ty<'t>,
        operands: Vec<ValueRef>,
        name: impl Into<String>,
    ) -> Result<ValueRef> {
        let block = self.cur_block_id()?;
        self.emit_in(block, op, ty, operands, name)
    }

    /// Emits into an explicit block without moving the cursor.
    pub(crate) fn emit_in(
        &mut self,
        block: BlockId,
        op: OpKind,
        ty: Ty<'t>,
        operands: Vec<ValueRef>,
        name: impl Into<String>,
    ) -> Result<ValueRef> {
        let func = self.program.cur_module_mut().cur_func_mut()?;
        let inst = func.block_mut(block).append(op, ty, operands, name)?;
        Ok(ValueRef::Inst(block, inst))
    }

    /// Appends `br target` to `block` unless it already ends in a terminal.
    pub(crate) fn seal_with_br(&mut self, block: BlockId, target: BlockId) -> Result<()> {
        let void = self.types.void_ty();
        let func = self.program.cur_module_mut().cur_func_mut()?;
        if func.block(block).is_terminated() {
            return Ok(());
        }
        let name = format!("br.{}", func.block(target).label());
        func.block_mut(block)
            .append(OpKind::Br, void, vec![ValueRef::Block(target)], name)?;
        Ok(())
    }

    pub(crate) fn emit_cond_br(
        &mut self,
        block: BlockId,
        cond: ValueRef,
        then_block: BlockId,
        else_block: BlockId,
    ) -> Result<()> {
        let void = self.types.void_ty();
        self.emit_in(
            block,
            OpKind::CondBr,
            void,
            vec![cond, ValueRef::Block(then_block), ValueRef::Block(else_block)],
            "cond_br",
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Values, symbols, and types
    // ------------------------------------------------------------------

    /// Result type of any value reference, resolved against the current
    /// function.
    pub(crate) fn type_of(&self, value: ValueRef) -> Result<Ty<'t>> {
        match value {
            ValueRef::Const(id) => Ok(self.consts.ty(id)),
            ValueRef::Param(i) => self.cur_func()?.param_ty(i).ok_or_else(|| {
                CompileError::new(Stage::System, "Parameter index out of range")
            }),
            ValueRef::Inst(block, inst) => Ok(self.cur_func()?.block(block).inst(inst).ty),
            ValueRef::Block(_) => Ok(self.types.block_ty()),
            ValueRef::Func(fid) => Ok(self.program.cur_module().func(fid).value_ty()),
        }
    }

    /// Innermost binding: function scope first, then module scope.
    pub(crate) fn lookup_symbol(&self, name: &str, node: &Node) -> Result<SymbolEntry<'t>> {
        if let Ok(func) = self.cur_func() {
            if let Some(entry) = func.scope.lookup(name) {
                return Ok(entry.clone());
            }
        }
        if let Some(entry) = self.program.cur_module().scope.lookup(name) {
            return Ok(entry.clone());
        }
        Err(self.err(format!("Use of undeclared symbol '{}'", name), node))
    }

    /// Emits a `declare` (slot + optional init) and installs the symbol.
    pub(crate) fn declare_symbol(
        &mut self,
        name: &str,
        ty: Ty<'t>,
        init: Option<ValueRef>,
        node: &Node,
    ) -> Result<ValueRef> {
        let operands: Vec<ValueRef> = init.into_iter().collect();
        let addr = self.emit(OpKind::Declare, ty, operands, format!("declare.{}", name))?;
        let position = node.position();
        let func = self.program.cur_module_mut().cur_func_mut()?;
        func.scope.declare(name, addr, ty).map_err(|err| match position {
            Some(pos) => err.at(pos),
            None => err,
        })?;
        Ok(addr)
    }

    pub(crate) fn scope_enter(&mut self) -> Result<()> {
        self.program.cur_module_mut().cur_func_mut()?.scope.enter();
        Ok(())
    }

    pub(crate) fn scope_leave(&mut self) -> Result<()> {
        self.program.cur_module_mut().cur_func_mut()?.scope.leave();
        Ok(())
    }

    pub(crate) fn err(&self, message: impl Into<String>, node: &Node) -> CompileError {
        let err = CompileError::new(Stage::Ir, message);
        match node.position() {
            Some(pos) => err.at(pos),
            None => err,
        }
    }

    /// Two interned types match iff they are the same pointer.
    pub(crate) fn types_match(&self, a: Ty<'t>, b: Ty<'t>) -> bool {
        std::ptr::eq(a, b)
    }

    /// Arithmetic unification: equal int types stay; anything touching a
    /// float widens to float; everything else is a build error.
    pub(crate) fn unify_arithmetic(&self, a: Ty<'t>, b: Ty<'t>, node: &Node) -> Result<Ty<'t>> {
        if a.is_int() && b.is_int() && self.types_match(a, b) {
            return Ok(a);
        }
        if (a.is_int() || a.is_float()) && (b.is_int() || b.is_float()) && (a.is_float() || b.is_float())
        {
            return Ok(self.types.float_ty());
        }
        Err(self.err(
            format!("Cannot unify operand types {} and {}", a, b),
            node,
        ))
    }

    /// Comparisons accept numeric pairs and same-element pointers.
    pub(crate) fn check_comparable(&self, a: Ty<'t>, b: Ty<'t>, node: &Node) -> Result<()> {
        if a.is_numeric() && b.is_numeric() {
            return Ok(());
        }
        if let (TypeKind::Pointer(pa), TypeKind::Pointer(pb)) = (*a, *b) {
            if self.types_match(pa, pb) {
                return Ok(());
            }
        }
        Err(self.err(
            format!("Cannot compare values of types {} and {}", a, b),
            node,
        ))
    }

    pub(crate) fn expect_bool(&self, value: ValueRef, node: &Node) -> Result<()> {
        let ty = self.type_of(value)?;
        if ty.is_bool() {
            Ok(())
        } else {
            Err(self.err(format!("Expected a bool value, found {}", ty), node))
        }
    }

    /// The constant `1` of an arithmetic type (for `++`/`--`).
    pub(crate) fn one_const(&mut self, ty: Ty<'t>, node: &Node) -> Result<ValueRef> {
        let value = match ty {
            TypeKind::Int { .. } => ConstValue::Int(1),
            TypeKind::Float => ConstValue::Float(1.0),
            _ => return Err(self.err(format!("Cannot step a value of type {}", ty), node)),
        };
        Ok(ValueRef::Const(self.consts.intern(ty, value)))
    }

    /// The zero constant used to seal value-returning dead blocks.
    pub(crate) fn zero_const(&mut self, ty: Ty<'t>) -> Option<crate::constant::ConstId> {
        let value = match ty {
            TypeKind::Int { bits: 1, .. } => ConstValue::Bool(false),
            TypeKind::Int { bits: 8, .. } => ConstValue::Char('\0'),
            TypeKind::Int { .. } => ConstValue::Int(0),
            TypeKind::Float => ConstValue::Float(0.0),
            _ => return None,
        };
        Some(self.consts.intern(ty, value))
    }

    // ------------------------------------------------------------------
    // Type annotations
    // ------------------------------------------------------------------

    /// Resolves a `TypeModifier` subtree to an interned type.
    pub(crate) fn resolve_type(&mut self, node: &Node) -> Result<Ty<'t>> {
        if let Some(basic) = node.child(Tag::BasicTypeModifier) {
            return self.resolve_basic_type(basic);
        }
        if let Some(array) = node.child(Tag::ArrayTypeModifier) {
            let base = array
                .child(Tag::HeadExpr)
                .ok_or_else(|| self.err("Array type is missing its element type", node))?;
            let mut ty = self.resolve_basic_type(base)?;

            let mut dims = Vec::new();
            if let Some(exprs) = array.child(Tag::Exprs) {
                for dim in exprs.children() {
                    dims.push(self.const_int(dim)?);
                }
            }
            // [N][M]T reads left-to-right as array(array(T, M), N).
            for &dim in dims.iter().rev() {
                if dim < 0 {
                    return Err(self.err("Array dimensions cannot be negative", node));
                }
                ty = self.types.array_of(ty, dim as u64);
            }
            return Ok(ty);
        }
        Err(self.err("Unknown type modifier", node))
    }

    fn resolve_basic_type(&mut self, node: &Node) -> Result<Ty<'t>> {
        let keyword = node
            .child(Tag::Keyword)
            .and_then(|n| n.content())
            .ok_or_else(|| self.err("Type modifier is missing its keyword", node))?;
        match keyword.kind {
            TokenKind::KwInt => Ok(self.types.int32_ty()),
            TokenKind::KwChar => Ok(self.types.char_ty()),
            TokenKind::KwFloat => Ok(self.types.float_ty()),
            TokenKind::KwBool => Ok(self.types.bool_ty()),
            _ => Err(self.err(
                format!("Unknown type keyword '{}'", keyword.lexeme),
                node,
            )),
        }
    }

    /// Folds an `AddExpr` subtree that must be a bare integer literal
    /// (array type dimensions).
    pub(crate) fn const_int(&self, node: &Node) -> Result<i64> {
        let mut cur = node;
        loop {
            match cur.tag() {
                Tag::AddExpr | Tag::MulExpr => {
                    if cur.child(Tag::Ops).is_some() {
                        break;
                    }
                    match cur.child(Tag::Exprs).and_then(|e| e.children().next()) {
                        Some(next) => cur = next,
                        None => break,
                    }
                }
                Tag::PrimExpr => match cur.child(Tag::Literal) {
                    Some(lit) => cur = lit,
                    None => break,
                },
                Tag::Literal => {
                    let token = cur.child(Tag::Literal).and_then(|n| n.content());
                    if let Some(tok) = token {
                        if tok.kind == TokenKind::Int {
                            return tok.lexeme.parse::<i64>().map_err(|_| {
                                self.err(
                                    format!("Invalid integer literal '{}'", tok.lexeme),
                                    node,
                                )
                            });
                        }
                    }
                    break;
                }
                _ => break,
            }
        }
        Err(self.err("Array dimensions must be constant integer literals", node))
    }
}
