//! Basic blocks.
//!
//! A block owns an ordered instruction sequence and enforces the terminal
//! rule at append time: once a `br`/`cond_br`/`ret` lands, the block is
//! sealed and any further append is an internal error.

use crate::instruction::{Instruction, OpKind};
use crate::types::Ty;
use crate::value::{BlockId, FuncId, InstId, ValueRef};
use sakura_base::{CompileError, Result, Stage};

pub struct Block<'t> {
    label: String,
    instructions: Vec<Instruction<'t>>,
    id: BlockId,
    parent: FuncId,
}

impl<'t> Block<'t> {
    pub(crate) fn new(label: impl Into<String>, id: BlockId, parent: FuncId) -> Self {
        Self {
            label: label.into(),
            instructions: Vec::new(),
            id,
            parent,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn parent(&self) -> FuncId {
        self.parent
    }

    /// Appends an instruction, refusing if the block is already terminated.
    pub fn append(
        &mut self,
        op: OpKind,
        ty: Ty<'t>,
        operands: Vec<ValueRef>,
        name: impl Into<String>,
    ) -> Result<InstId> {
        if self.is_terminated() {
            return Err(CompileError::new(
                Stage::System,
                "Cannot append any instruction after a terminal",
            ));
        }
        let id = InstId(self.instructions.len() as u32);
        self.instructions.push(Instruction {
            op,
            ty,
            operands,
            block: self.id,
            name: name.into(),
        });
        Ok(id)
    }

    pub fn is_terminated(&self) -> bool {
        self.instructions
            .last()
            .map(|inst| inst.is_terminal())
            .unwrap_or(false)
    }

    pub fn terminator(&self) -> Option<&Instruction<'t>> {
        self.instructions.last().filter(|inst| inst.is_terminal())
    }

    pub fn inst(&self, id: InstId) -> &Instruction<'t> {
        &self.instructions[id.index()]
    }

    pub fn instructions(&self) -> &[Instruction<'t>] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeInterner;
    use bumpalo::Bump;

    #[test]
    fn append_after_terminal_is_refused() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let mut block = Block::new("entry", BlockId(0), FuncId(0));

        block
            .append(OpKind::Ret, types.void_ty(), vec![], "ret")
            .unwrap();
        let err = block
            .append(OpKind::Add, types.int32_ty(), vec![], "add")
            .unwrap_err();
        assert_eq!(err.stage, Stage::System);
        assert!(err.message.contains("after a terminal"));
    }

    #[test]
    fn terminator_is_the_last_instruction_or_nothing() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let mut block = Block::new("entry", BlockId(0), FuncId(0));
        assert!(block.terminator().is_none());

        block
            .append(OpKind::Br, types.void_ty(), vec![ValueRef::Block(BlockId(1))], "br")
            .unwrap();
        assert!(block.is_terminated());
        assert_eq!(block.terminator().unwrap().op, OpKind::Br);
    }
}
