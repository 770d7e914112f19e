//! Functions: block containers with an emission cursor.
//!
//! The cursor names "the block being emitted into". Builders move it
//! explicitly when wiring control flow; moving it to a block that does not
//! exist is an internal error.

use crate::block::Block;
use crate::scope::Scope;
use crate::types::Ty;
use crate::value::{BlockId, FuncId};
use sakura_base::{CompileError, Result, Stage};

pub struct Function<'t> {
    name: String,
    ret_ty: Ty<'t>,
    /// The function's own value type (`fn(params) -> ret`).
    value_ty: Ty<'t>,
    params: Vec<(String, Ty<'t>)>,
    blocks: Vec<Block<'t>>,
    cursor: usize,
    pub scope: Scope<'t>,
    id: FuncId,
}

impl<'t> Function<'t> {
    pub(crate) fn new(
        id: FuncId,
        name: impl Into<String>,
        ret_ty: Ty<'t>,
        value_ty: Ty<'t>,
        params: Vec<(String, Ty<'t>)>,
    ) -> Self {
        Self {
            name: name.into(),
            ret_ty,
            value_ty,
            params,
            blocks: Vec::new(),
            cursor: 0,
            scope: Scope::new(),
            id,
        }
    }

    pub fn id(&self) -> FuncId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ret_ty(&self) -> Ty<'t> {
        self.ret_ty
    }

    pub fn value_ty(&self) -> Ty<'t> {
        self.value_ty
    }

    pub fn params(&self) -> &[(String, Ty<'t>)] {
        &self.params
    }

    pub fn param_ty(&self, index: u32) -> Option<Ty<'t>> {
        self.params.get(index as usize).map(|(_, ty)| *ty)
    }

    /// Creates a block and moves the cursor onto it.
    pub fn build_block(&mut self, label: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::new(label, id, self.id));
        self.cursor = id.index();
        id
    }

    /// Moves the cursor to an existing block.
    pub fn move_cursor(&mut self, target: BlockId) -> Result<()> {
        if target.index() >= self.blocks.len() {
            return Err(CompileError::new(
                Stage::System,
                "Cannot move cursor to an unknown place",
            ));
        }
        self.cursor = target.index();
        Ok(())
    }

    pub fn cur_block_id(&self) -> BlockId {
        BlockId(self.cursor as u32)
    }

    pub fn cur_block(&self) -> &Block<'t> {
        &self.blocks[self.cursor]
    }

    pub fn cur_block_mut(&mut self) -> &mut Block<'t> {
        &mut self.blocks[self.cursor]
    }

    pub fn block(&self, id: BlockId) -> &Block<'t> {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block<'t> {
        &mut self.blocks[id.index()]
    }

    pub fn blocks(&self) -> &[Block<'t>] {
        &self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeInterner;
    use bumpalo::Bump;

    #[test]
    fn build_block_advances_the_cursor() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let void = types.void_ty();
        let mut func = Function::new(FuncId(0), "main", void, void, vec![]);

        let entry = func.build_block("main.init");
        assert_eq!(func.cur_block_id(), entry);
        let body = func.build_block("fn.main");
        assert_eq!(func.cur_block_id(), body);

        func.move_cursor(entry).unwrap();
        assert_eq!(func.cur_block().label(), "main.init");
    }

    #[test]
    fn moving_to_an_unknown_block_is_a_system_error() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let void = types.void_ty();
        let mut func = Function::new(FuncId(0), "main", void, void, vec![]);
        func.build_block("main.init");

        let err = func.move_cursor(BlockId(7)).unwrap_err();
        assert_eq!(err.stage, Stage::System);
        assert!(err.message.contains("unknown place"));
    }
}
