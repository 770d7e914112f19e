//! The sakura driver crate: configuration, CLI, and the interactive shell.
//!
//! The heavy lifting lives in the workspace crates:
//!
//! - `sakura-base`: spans, errors, interning
//! - `sakura-syntax`: lexer, grammar combinators, AST
//! - `sakura-ir`: types, SakIR, the AST-to-IR builder
//! - `sakura-runtime`: the GC and C-ABI support calls

pub mod cli;
pub mod config;
pub mod shell;
