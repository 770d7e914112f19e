//! Structural atoms shared by every sakura crate.
//!
//! This crate has no dependencies and no opinions about the language being
//! compiled. It provides the three things every stage of the pipeline needs:
//!
//! - [`Span`] / [`Position`]: source locations for diagnostics
//! - [`CompileError`] / [`Result`]: the error currency of the whole compiler
//! - [`Interner`] / [`Symbol`]: O(1) string equality via integer handles

pub mod error;
pub mod intern;
pub mod span;

pub use error::{CompileError, Result, Stage};
pub use intern::{Interner, Symbol};
pub use span::{Position, Span};
