//! Deterministic text rendering of SakIR (the `-sakir` dump).
//!
//! ```text
//! $__main {
//!   #add(a: i32, b: i32) -> i32 {
//!     @add.init:
//!       %b0.0 = declare i32 %arg0            ; declare.a
//!       ...
//!     @fn.add:
//!       %b1.2 = add i32 %b1.0, %b1.1         ; add
//!       ret %b1.2
//!   }
//! }
//! ```
//!
//! Instruction handles print as `%b<block>.<index>`, parameters as
//! `%arg<n>`, constants inline, block targets as `@label`, functions as
//! `#name`.

use crate::constant::ConstPool;
use crate::function::Function;
use crate::module::Module;
use crate::program::Program;
use crate::value::ValueRef;
use std::fmt::Write as _;

pub fn render_program(program: &Program<'_>, pool: &ConstPool<'_>) -> String {
    let mut out = String::new();
    for module in program.modules() {
        render_module(module, pool, &mut out);
    }
    out
}

fn render_module(module: &Module<'_>, pool: &ConstPool<'_>, out: &mut String) {
    let _ = writeln!(out, "${} {{", module.id());
    for func in module.functions() {
        render_function(module, func, pool, out);
    }
    out.push_str("}\n");
}

fn render_function(
    module: &Module<'_>,
    func: &Function<'_>,
    pool: &ConstPool<'_>,
    out: &mut String,
) {
    let _ = write!(out, "  #{}(", func.name());
    for (i, (name, ty)) in func.params().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}: {}", name, ty);
    }
    let _ = writeln!(out, ") -> {} {{", func.ret_ty());

    for block in func.blocks() {
        let _ = writeln!(out, "    @{}:", block.label());
        for (i, inst) in block.instructions().iter().enumerate() {
            let _ = write!(out, "      ");
            if inst.op.is_terminal() {
                let _ = write!(out, "{}", inst.op.mnemonic());
            } else {
                let _ = write!(
                    out,
                    "%b{}.{} = {} {}",
                    block.id().index(),
                    i,
                    inst.op.mnemonic(),
                    inst.ty
                );
            }
            for (j, operand) in inst.operands.iter().enumerate() {
                out.push_str(if j == 0 { " " } else { ", " });
                render_operand(module, func, *operand, pool, out);
            }
            let _ = writeln!(out, "\t; {}", inst.name);
        }
    }
    out.push_str("  }\n");
}

fn render_operand(
    module: &Module<'_>,
    func: &Function<'_>,
    operand: ValueRef,
    pool: &ConstPool<'_>,
    out: &mut String,
) {
    match operand {
        ValueRef::Const(id) => {
            let _ = write!(out, "{} {}", pool.ty(id), pool.render(id));
        }
        ValueRef::Param(i) => {
            let _ = write!(out, "%arg{}", i);
        }
        ValueRef::Inst(block, inst) => {
            let _ = write!(out, "%b{}.{}", block.index(), inst.index());
        }
        ValueRef::Block(id) => {
            let _ = write!(out, "@{}", func.block(id).label());
        }
        ValueRef::Func(id) => {
            let _ = write!(out, "#{}", module.func(id).name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IrBuilder;
    use crate::types::TypeInterner;
    use bumpalo::Bump;
    use sakura_syntax::{parse_program, Lexer};

    #[test]
    fn dump_contains_blocks_functions_and_instructions() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let mut builder = IrBuilder::new(&types, "__main");

        let tokens = Lexer::new("func add(a: int, b: int) -> int { return a + b; }").tokenize();
        for stmt in parse_program(&tokens).unwrap() {
            builder.visit_toplevel(&stmt).unwrap();
        }
        builder.finish().unwrap();

        let dump = render_program(&builder.program, &builder.consts);
        assert!(dump.contains("$__main {"));
        assert!(dump.contains("#add(a: i32, b: i32) -> i32 {"));
        assert!(dump.contains("@add.init:"));
        assert!(dump.contains("@fn.add:"));
        assert!(dump.contains("add i32"));
        assert!(dump.contains("ret"));
    }

    #[test]
    fn dump_is_deterministic() {
        let render = || {
            let arena = Bump::new();
            let types = TypeInterner::new(&arena);
            let mut builder = IrBuilder::new(&types, "__main");
            let tokens = Lexer::new("let x: int = 1 + 2;").tokenize();
            for stmt in parse_program(&tokens).unwrap() {
                builder.visit_toplevel(&stmt).unwrap();
            }
            builder.finish().unwrap();
            render_program(&builder.program, &builder.consts)
        };
        assert_eq!(render(), render());
    }
}
