//! Three-address instructions.
//!
//! An instruction is `(opcode, result type, operands, parent block, name)`.
//! The name is symbolic ("add", "call.main", "br.if.merge") and only feeds
//! the dump. `br`, `cond_br` and `ret` are terminal: a block refuses to grow
//! past one of them.

use crate::types::Ty;
use crate::value::{BlockId, ValueRef};

/// The closed opcode set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Constant,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    LgcEqual,
    LgcNotEqual,
    LgcLsThan,
    LgcMrThan,
    LgcEqLsThan,
    LgcEqMrThan,
    LgcNot,
    /// Stack slot allocation with optional initial store.
    Declare,
    /// Store to an address.
    Assign,
    Load,
    /// Element address + load in one step.
    Indexing,
    /// Member address computation.
    Gmem,
    CreateArray,
    Call,
    Br,
    CondBr,
    Ret,
}

impl OpKind {
    /// Terminals end a block; nothing may be appended after one.
    pub fn is_terminal(self) -> bool {
        matches!(self, OpKind::Br | OpKind::CondBr | OpKind::Ret)
    }

    /// The mnemonic used in the IR dump.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpKind::Constant => "constant",
            OpKind::Add => "add",
            OpKind::Sub => "sub",
            OpKind::Mul => "mul",
            OpKind::Div => "div",
            OpKind::Mod => "mod",
            OpKind::LgcEqual => "lgc_equal",
            OpKind::LgcNotEqual => "lgc_not_equal",
            OpKind::LgcLsThan => "lgc_ls_than",
            OpKind::LgcMrThan => "lgc_mr_than",
            OpKind::LgcEqLsThan => "lgc_eq_ls_than",
            OpKind::LgcEqMrThan => "lgc_eq_mr_than",
            OpKind::LgcNot => "lgc_not",
            OpKind::Declare => "declare",
            OpKind::Assign => "assign",
            OpKind::Load => "load",
            OpKind::Indexing => "indexing",
            OpKind::Gmem => "gmem",
            OpKind::CreateArray => "create_array",
            OpKind::Call => "call",
            OpKind::Br => "br",
            OpKind::CondBr => "cond_br",
            OpKind::Ret => "ret",
        }
    }
}

/// One emitted instruction.
#[derive(Debug, Clone)]
pub struct Instruction<'t> {
    pub op: OpKind,
    pub ty: Ty<'t>,
    pub operands: Vec<ValueRef>,
    /// Back-pointer to the containing block.
    pub block: BlockId,
    pub name: String,
}

impl Instruction<'_> {
    pub fn is_terminal(&self) -> bool {
        self.op.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_branches_and_returns_are_terminal() {
        assert!(OpKind::Br.is_terminal());
        assert!(OpKind::CondBr.is_terminal());
        assert!(OpKind::Ret.is_terminal());
        assert!(!OpKind::Add.is_terminal());
        assert!(!OpKind::Call.is_terminal());
        assert!(!OpKind::Assign.is_terminal());
    }

    #[test]
    fn mnemonics_match_the_dump_vocabulary() {
        assert_eq!(OpKind::LgcEqLsThan.mnemonic(), "lgc_eq_ls_than");
        assert_eq!(OpKind::CreateArray.mnemonic(), "create_array");
    }
}
