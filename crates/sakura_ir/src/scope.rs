//! Lexical scope stack for the IR builder.
//!
//! A scope is a stack of symbol tables: `enter` pushes, `leave` pops,
//! `declare` installs into the top table, and `lookup` walks innermost-first.
//! Redeclaring a name in the *same* table is an error; shadowing an outer
//! binding is fine. The builder chains a function scope to its module scope
//! on lookup misses; the module scope has no parent.

use crate::types::Ty;
use crate::value::ValueRef;
use rustc_hash::FxHashMap;
use sakura_base::{CompileError, Result, Stage};

/// A named storage location (or function) visible to the program.
#[derive(Debug, Clone)]
pub struct SymbolEntry<'t> {
    pub name: String,
    /// The value representing the allocated storage (or the function).
    pub address: ValueRef,
    pub ty: Ty<'t>,
}

pub struct Scope<'t> {
    tables: Vec<FxHashMap<String, SymbolEntry<'t>>>,
}

impl<'t> Scope<'t> {
    /// Creates a scope with its root table in place.
    pub fn new() -> Self {
        Self {
            tables: vec![FxHashMap::default()],
        }
    }

    pub fn enter(&mut self) {
        self.tables.push(FxHashMap::default());
    }

    pub fn leave(&mut self) {
        debug_assert!(self.tables.len() > 1, "cannot leave the root scope");
        if self.tables.len() > 1 {
            self.tables.pop();
        }
    }

    /// Installs a binding in the innermost table.
    pub fn declare(&mut self, name: &str, address: ValueRef, ty: Ty<'t>) -> Result<()> {
        let top = self.tables.last_mut().expect("scope stack is never empty");
        if top.contains_key(name) {
            return Err(CompileError::new(
                Stage::Ir,
                format!("Symbol '{}' is already declared in this scope", name),
            ));
        }
        top.insert(
            name.to_string(),
            SymbolEntry {
                name: name.to_string(),
                address,
                ty,
            },
        );
        Ok(())
    }

    /// Innermost binding for `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry<'t>> {
        self.tables.iter().rev().find_map(|table| table.get(name))
    }

    pub fn depth(&self) -> usize {
        self.tables.len()
    }
}

impl Default for Scope<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeInterner;
    use crate::value::ValueRef;
    use bumpalo::Bump;

    #[test]
    fn inner_binding_shadows_then_unshadows() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let mut scope = Scope::new();

        scope
            .declare("x", ValueRef::Param(0), types.int32_ty())
            .unwrap();
        scope.enter();
        scope
            .declare("x", ValueRef::Param(1), types.float_ty())
            .unwrap();
        assert_eq!(scope.lookup("x").unwrap().address, ValueRef::Param(1));

        scope.leave();
        assert_eq!(scope.lookup("x").unwrap().address, ValueRef::Param(0));
    }

    #[test]
    fn redeclaring_in_the_same_table_is_an_error() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let mut scope = Scope::new();

        scope
            .declare("x", ValueRef::Param(0), types.int32_ty())
            .unwrap();
        let err = scope
            .declare("x", ValueRef::Param(1), types.int32_ty())
            .unwrap_err();
        assert!(err.message.contains("already declared"));
    }

    #[test]
    fn lookup_misses_return_none() {
        let scope = Scope::new();
        assert!(scope.lookup("ghost").is_none());
    }
}
