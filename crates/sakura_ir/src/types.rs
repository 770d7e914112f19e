//! Interned IR types.
//!
//! A [`Ty`] is a reference into the interner's bump arena. Interning is
//! structural: requesting the same shape twice returns the same pointer, so
//! type equality anywhere in the IR is pointer equality. `bool` is the 1-bit
//! integer and `char` the 8-bit integer, matching how the backend sees them.
//!
//! The interner is created next to its arena and passed by reference:
//!
//! ```
//! use bumpalo::Bump;
//! use sakura_ir::types::TypeInterner;
//!
//! let arena = Bump::new();
//! let types = TypeInterner::new(&arena);
//! let a = types.array_of(types.int32_ty(), 4);
//! let b = types.array_of(types.int32_ty(), 4);
//! assert!(std::ptr::eq(a, b));
//! ```

use bumpalo::Bump;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;

/// A handle to an interned type. Pointer identity implies structural equality.
pub type Ty<'t> = &'t TypeKind<'t>;

/// The structural shape of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind<'t> {
    Void,
    /// `bool` is `Int { bits: 1 }`, `char` is `Int { bits: 8 }`.
    Int { bits: u32, signed: bool },
    Float,
    Pointer(Ty<'t>),
    Array { elem: Ty<'t>, len: u64 },
    Function { ret: Ty<'t>, params: &'t [Ty<'t>] },
    /// The label type carried by block values.
    Block,
    /// A reified type token, usable as a constant payload.
    TypeInfo,
}

impl<'t> TypeKind<'t> {
    pub fn is_int(&self) -> bool {
        matches!(self, TypeKind::Int { .. })
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, TypeKind::Int { bits: 1, .. })
    }

    pub fn is_float(&self) -> bool {
        matches!(self, TypeKind::Float)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_int() || self.is_float()
    }
}

impl fmt::Display for TypeKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Void => write!(f, "void"),
            TypeKind::Int { bits, signed: true } => write!(f, "i{}", bits),
            TypeKind::Int {
                bits,
                signed: false,
            } => write!(f, "u{}", bits),
            TypeKind::Float => write!(f, "f32"),
            TypeKind::Pointer(elem) => write!(f, "ptr<{}>", elem),
            TypeKind::Array { elem, len } => write!(f, "[{} x {}]", len, elem),
            TypeKind::Function { ret, params } => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            TypeKind::Block => write!(f, "block"),
            TypeKind::TypeInfo => write!(f, "typeinfo"),
        }
    }
}

/// Structural deduplication of [`TypeKind`] values in a bump arena.
pub struct TypeInterner<'t> {
    arena: &'t Bump,
    map: RefCell<FxHashMap<TypeKind<'t>, Ty<'t>>>,
}

impl<'t> TypeInterner<'t> {
    pub fn new(arena: &'t Bump) -> Self {
        Self {
            arena,
            map: RefCell::new(FxHashMap::default()),
        }
    }

    /// Interns a shape, returning the canonical pointer for it.
    pub fn intern(&self, kind: TypeKind<'t>) -> Ty<'t> {
        if let Some(&ty) = self.map.borrow().get(&kind) {
            return ty;
        }
        let ty: Ty<'t> = &*self.arena.alloc(kind);
        self.map.borrow_mut().insert(kind, ty);
        ty
    }

    pub fn void_ty(&self) -> Ty<'t> {
        self.intern(TypeKind::Void)
    }

    pub fn bool_ty(&self) -> Ty<'t> {
        self.int_n(1)
    }

    pub fn char_ty(&self) -> Ty<'t> {
        self.int_n(8)
    }

    pub fn int32_ty(&self) -> Ty<'t> {
        self.int_n(32)
    }

    pub fn int64_ty(&self) -> Ty<'t> {
        self.int_n(64)
    }

    pub fn uint32_ty(&self) -> Ty<'t> {
        self.uint_n(32)
    }

    pub fn uint64_ty(&self) -> Ty<'t> {
        self.uint_n(64)
    }

    pub fn int_n(&self, bits: u32) -> Ty<'t> {
        self.intern(TypeKind::Int { bits, signed: true })
    }

    pub fn uint_n(&self, bits: u32) -> Ty<'t> {
        self.intern(TypeKind::Int {
            bits,
            signed: false,
        })
    }

    pub fn float_ty(&self) -> Ty<'t> {
        self.intern(TypeKind::Float)
    }

    pub fn pointer_to(&self, elem: Ty<'t>) -> Ty<'t> {
        self.intern(TypeKind::Pointer(elem))
    }

    pub fn array_of(&self, elem: Ty<'t>, len: u64) -> Ty<'t> {
        self.intern(TypeKind::Array { elem, len })
    }

    pub fn function(&self, ret: Ty<'t>, params: &[Ty<'t>]) -> Ty<'t> {
        let params = &*self.arena.alloc_slice_copy(params);
        self.intern(TypeKind::Function { ret, params })
    }

    pub fn block_ty(&self) -> Ty<'t> {
        self.intern(TypeKind::Block)
    }

    pub fn type_info_ty(&self) -> Ty<'t> {
        self.intern(TypeKind::TypeInfo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_gives_pointer_identity() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        assert!(std::ptr::eq(types.int32_ty(), types.int32_ty()));
        assert!(std::ptr::eq(
            types.pointer_to(types.char_ty()),
            types.pointer_to(types.char_ty())
        ));
    }

    #[test]
    fn structural_equality_iff_identity() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let a = types.array_of(types.int32_ty(), 3);
        let b = types.array_of(types.int32_ty(), 3);
        let c = types.array_of(types.int32_ty(), 4);
        assert_eq!(a, b);
        assert!(std::ptr::eq(a, b));
        assert_ne!(a, c);
        assert!(!std::ptr::eq(a, c));
    }

    #[test]
    fn function_types_intern_by_signature() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let i32t = types.int32_ty();
        let a = types.function(i32t, &[i32t, i32t]);
        let b = types.function(i32t, &[i32t, i32t]);
        let c = types.function(i32t, &[i32t]);
        assert!(std::ptr::eq(a, b));
        assert!(!std::ptr::eq(a, c));
    }

    #[test]
    fn bool_is_the_one_bit_integer() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        assert!(types.bool_ty().is_bool());
        assert!(std::ptr::eq(types.bool_ty(), types.int_n(1)));
        assert_eq!(types.bool_ty().to_string(), "i1");
    }

    #[test]
    fn signedness_distinguishes_int_types() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        assert!(!std::ptr::eq(types.int32_ty(), types.uint32_ty()));
        assert_eq!(types.uint64_ty().to_string(), "u64");
    }

    #[test]
    fn nested_array_types_display_inside_out() {
        let arena = Bump::new();
        let types = TypeInterner::new(&arena);
        let row = types.array_of(types.int32_ty(), 3);
        let grid = types.array_of(row, 2);
        assert_eq!(grid.to_string(), "[2 x [3 x i32]]");
    }
}
