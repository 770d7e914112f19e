//! SakIR: a typed, three-address, block-structured intermediate form.
//!
//! The containment tree is `Program → Module → Function → Block →
//! Instruction`; operands are lightweight [`ValueRef`] handles into that
//! tree, so ownership is strictly top-down and parent/child access is O(1).
//!
//! Types are interned in a bump arena ([`types::TypeInterner`]): two
//! structurally-equal types are the *same pointer*. Constants are interned by
//! `(type, value)` in the [`constant::ConstPool`].
//!
//! The [`builder::IrBuilder`] walks the syntax tree from `sakura-syntax` in a
//! single depth-first pass, lowering expressions, short-circuit booleans, and
//! structured control flow into terminated blocks.

pub mod block;
pub mod builder;
pub mod constant;
pub mod display;
pub mod function;
pub mod instruction;
pub mod module;
pub mod program;
pub mod scope;
pub mod types;
pub mod value;

pub use block::Block;
pub use builder::IrBuilder;
pub use constant::{ConstId, ConstPool, ConstValue};
pub use function::Function;
pub use instruction::{Instruction, OpKind};
pub use module::Module;
pub use program::Program;
pub use scope::{Scope, SymbolEntry};
pub use types::{Ty, TypeInterner, TypeKind};
pub use value::{BlockId, FuncId, InstId, ValueRef};
