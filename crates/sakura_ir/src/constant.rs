//! Interned constants.
//!
//! Constants are deduplicated by `(type, value)`: interning the same pair
//! twice returns the same [`ConstId`]. String payloads go through the
//! [`Interner`] from `sakura-base`, so equal string literals share storage
//! and compare by handle.

use crate::types::Ty;
use rustc_hash::FxHashMap;
use sakura_base::{Interner, Symbol};

/// Handle to an interned constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstId(u32);

impl ConstId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A literal payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue<'t> {
    Int(i64),
    Float(f64),
    /// An interned string literal.
    Str(Symbol),
    Char(char),
    Bool(bool),
    /// A reified type token.
    TypeInfo(Ty<'t>),
}

/// Hashable mirror of `ConstValue`; floats keyed by bit pattern, types by
/// their interned address.
#[derive(PartialEq, Eq, Hash)]
enum ConstKey {
    Int(i64),
    Float(u64),
    Str(Symbol),
    Char(char),
    Bool(bool),
    TypeInfo(usize),
}

impl ConstKey {
    fn of(value: ConstValue<'_>) -> Self {
        match value {
            ConstValue::Int(v) => ConstKey::Int(v),
            ConstValue::Float(v) => ConstKey::Float(v.to_bits()),
            ConstValue::Str(s) => ConstKey::Str(s),
            ConstValue::Char(c) => ConstKey::Char(c),
            ConstValue::Bool(b) => ConstKey::Bool(b),
            ConstValue::TypeInfo(t) => ConstKey::TypeInfo(t as *const _ as usize),
        }
    }
}

/// The per-compile constant pool.
pub struct ConstPool<'t> {
    entries: Vec<(Ty<'t>, ConstValue<'t>)>,
    map: FxHashMap<(usize, ConstKey), ConstId>,
    pub strings: Interner,
}

impl<'t> ConstPool<'t> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            map: FxHashMap::default(),
            strings: Interner::new(),
        }
    }

    /// Interns `(ty, value)`, returning the existing id when already present.
    pub fn intern(&mut self, ty: Ty<'t>, value: ConstValue<'t>) -> ConstId {
        let key = (ty as *const _ as usize, ConstKey::of(value));
        if let Some(&id) = self.map.get(&key) {
            return id;
        }
        let id = ConstId(self.entries.len() as u32);
        self.entries.push((ty, value));
        self.map.insert(key, id);
        id
    }

    /// Interns a string literal, sharing storage with equal literals.
    pub fn intern_str(&mut self, ty: Ty<'t>, text: &str) -> ConstId {
        let sym = self.strings.intern(text);
        self.intern(ty, ConstValue::Str(sym))
    }

    pub fn ty(&self, id: ConstId) -> Ty<'t> {
        self.entries[id.index()].0
    }

    pub fn value(&self, id: ConstId) -> ConstValue<'t> {
        self.entries[id.index()].1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Literal rendering for the IR dump.
    pub fn render(&self, id: ConstId) -> String {
        match self.value(id) {
            ConstValue::Int(v) => v.to_string(),
            ConstValue::Float(v) => format!("{:?}", v),
            ConstValue::Str(s) => format!("{:?}", self.strings.resolve(s)),
            ConstValue::Char(c) => format!("{:?}", c),
            ConstValue::Bool(b) => b.to_string(),
            ConstValue::TypeInfo(t) => format!("typeinfo({})", t),
        }
    }
}

impl Default for ConstPool<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeInterner;
    use bumpalo::Bump;

    #[test]
    fn interning_twice_returns_the_same_id() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let mut pool = ConstPool::new();
        let a = pool.intern(types.int32_ty(), ConstValue::Int(42));
        let b = pool.intern(types.int32_ty(), ConstValue::Int(42));
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn same_value_different_type_is_a_different_constant() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let mut pool = ConstPool::new();
        let a = pool.intern(types.int32_ty(), ConstValue::Int(1));
        let b = pool.intern(types.int64_ty(), ConstValue::Int(1));
        assert_ne!(a, b);
    }

    #[test]
    fn string_literals_share_symbols() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let str_ty = types.pointer_to(types.char_ty());
        let mut pool = ConstPool::new();
        let a = pool.intern_str(str_ty, "hello");
        let b = pool.intern_str(str_ty, "hello");
        assert_eq!(a, b);
        assert_eq!(pool.strings.len(), 2);
    }

    #[test]
    fn float_constants_are_keyed_by_bits() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let mut pool = ConstPool::new();
        let a = pool.intern(types.float_ty(), ConstValue::Float(1.5));
        let b = pool.intern(types.float_ty(), ConstValue::Float(1.5));
        let c = pool.intern(types.float_ty(), ConstValue::Float(2.5));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn type_info_constants_intern_by_type_identity() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let mut pool = ConstPool::new();
        let ti = types.type_info_ty();
        let a = pool.intern(ti, ConstValue::TypeInfo(types.int32_ty()));
        let b = pool.intern(ti, ConstValue::TypeInfo(types.int32_ty()));
        let c = pool.intern(ti, ConstValue::TypeInfo(types.float_ty()));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
