//! Modules: function containers with a module-global scope.

use crate::function::Function;
use crate::scope::Scope;
use crate::types::Ty;
use crate::value::FuncId;
use sakura_base::{CompileError, Result, Stage};

pub struct Module<'t> {
    id: String,
    /// Module-global bindings (function names). Has no parent.
    pub scope: Scope<'t>,
    functions: Vec<Function<'t>>,
    cursor: Option<usize>,
}

impl<'t> Module<'t> {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scope: Scope::new(),
            functions: Vec::new(),
            cursor: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Creates a function with its `<name>.init` entry block and moves the
    /// module cursor onto it.
    pub fn build_function(
        &mut self,
        name: &str,
        ret_ty: Ty<'t>,
        value_ty: Ty<'t>,
        params: Vec<(String, Ty<'t>)>,
    ) -> FuncId {
        let id = FuncId(self.functions.len() as u32);
        let mut func = Function::new(id, name, ret_ty, value_ty, params);
        func.build_block(format!("{}.init", name));
        self.functions.push(func);
        self.cursor = Some(id.index());
        id
    }

    pub fn move_cursor(&mut self, target: FuncId) -> Result<()> {
        if target.index() >= self.functions.len() {
            return Err(CompileError::new(
                Stage::System,
                "Cannot move cursor to an unknown place",
            ));
        }
        self.cursor = Some(target.index());
        Ok(())
    }

    pub fn cur_func(&self) -> Result<&Function<'t>> {
        self.cursor
            .map(|i| &self.functions[i])
            .ok_or_else(|| CompileError::new(Stage::System, "No function is being emitted into"))
    }

    pub fn cur_func_mut(&mut self) -> Result<&mut Function<'t>> {
        match self.cursor {
            Some(i) => Ok(&mut self.functions[i]),
            None => Err(CompileError::new(
                Stage::System,
                "No function is being emitted into",
            )),
        }
    }

    pub fn func(&self, id: FuncId) -> &Function<'t> {
        &self.functions[id.index()]
    }

    pub fn func_mut(&mut self, id: FuncId) -> &mut Function<'t> {
        &mut self.functions[id.index()]
    }

    pub fn functions(&self) -> &[Function<'t>] {
        &self.functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeInterner;
    use bumpalo::Bump;

    #[test]
    fn build_function_creates_the_entry_block() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let mut module = Module::new("__main");
        let void = types.void_ty();

        let id = module.build_function("add", void, void, vec![]);
        let func = module.func(id);
        assert_eq!(func.blocks().len(), 1);
        assert_eq!(func.blocks()[0].label(), "add.init");
        assert_eq!(module.cur_func().unwrap().name(), "add");
    }

    #[test]
    fn cur_func_without_any_function_is_an_error() {
        let module: Module<'_> = Module::new("__main");
        assert!(module.cur_func().is_err());
    }
}
