//! Error types with source location tracking.
//!
//! Every failure in the pipeline is a [`CompileError`]: the stage that raised
//! it, a human-readable message, and (when known) the line/column it points
//! at. Errors unwind to the shell, which renders them with
//! [`CompileError::display_with_source`] when the source text is at hand.
//!
//! # Example
//!
//! ```
//! use sakura_base::{CompileError, Position, Stage};
//!
//! let err = CompileError::new(Stage::Parser, "Expected Ident, but got Assign")
//!     .at(Position::new(1, 5));
//! assert!(err.to_string().contains("line 1"));
//! ```

use crate::span::Position;
use std::fmt;

/// The pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lexer,
    Parser,
    Ast,
    Ir,
    System,
    Runtime,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lexer => "lex",
            Stage::Parser => "parse",
            Stage::Ast => "ast",
            Stage::Ir => "ir",
            Stage::System => "system",
            Stage::Runtime => "runtime",
        };
        f.write_str(name)
    }
}

/// A structured compile error: `(stage, message, position)`.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub stage: Stage,
    pub message: String,
    pub position: Option<Position>,
}

impl CompileError {
    /// Creates an error without a source position.
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            position: None,
        }
    }

    /// Attaches a source position.
    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Renders the error with the offending source line and a caret underline.
    ///
    /// Falls back to the plain `Display` form when the position is unknown or
    /// out of range.
    pub fn display_with_source(&self, source: &str) -> String {
        let Some(pos) = self.position else {
            return self.to_string();
        };
        let Some(line) = source.lines().nth(pos.line as usize - 1) else {
            return self.to_string();
        };

        let col = (pos.column as usize).saturating_sub(1).min(line.len());
        let underline = format!("{}^", " ".repeat(col));

        format!(
            "{} error: {}\n\n{:4} | {}\n     | {}",
            self.stage, self.message, pos.line, line, underline
        )
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.stage, self.message)?;
        if let Some(pos) = self.position {
            write!(f, " (line {}, column {})", pos.line, pos.column)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// Alias for `std::result::Result<T, CompileError>`.
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_stage_and_position() {
        let err = CompileError::new(Stage::Ir, "type mismatch").at(Position::new(3, 7));
        let text = err.to_string();
        assert!(text.contains("ir error"));
        assert!(text.contains("line 3"));
        assert!(text.contains("column 7"));
    }

    #[test]
    fn display_without_position_omits_location() {
        let err = CompileError::new(Stage::System, "cursor out of range");
        assert_eq!(err.to_string(), "system error: cursor out of range");
    }

    #[test]
    fn display_with_source_underlines_the_column() {
        let source = "let x = 1;\nlet = 5;\n";
        let err = CompileError::new(Stage::Parser, "Expected Ident, but got Assign")
            .at(Position::new(2, 5));
        let rendered = err.display_with_source(source);
        assert!(rendered.contains("let = 5;"));
        assert!(rendered.contains("    ^"));
    }

    #[test]
    fn display_with_source_survives_bad_positions() {
        let err = CompileError::new(Stage::Parser, "boom").at(Position::new(99, 1));
        let rendered = err.display_with_source("one line");
        assert!(rendered.contains("boom"));
    }
}
