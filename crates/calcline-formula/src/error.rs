//! Parse error types

use calcline_core::{Error as CoreError, ErrorKind};
use thiserror::Error;

/// Result type for parse operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Structural failures while turning tokens into components.
///
/// These abort the current line only; they convert into [`calcline_core::Error`]
/// when the line's result is recorded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// `(` without `)` or the reverse
    #[error("Unmatched parenthesis at offset {0}")]
    UnmatchedParenthesis(usize),

    /// `()` outside a function call
    #[error("Empty parenthesis group at offset {0}")]
    EmptyGroup(usize),

    /// Argument with a misplaced `:` or a non-identifier name
    #[error("Invalid named argument in {function}: '{argument}'")]
    InvalidNamedArgument { function: String, argument: String },

    /// Token kind not allowed where it appears
    #[error("Unexpected {found} '{text}' at offset {offset}")]
    UnexpectedToken {
        found: String,
        text: String,
        offset: usize,
    },

    /// Number-shaped token that is not a valid literal, e.g. `2024-02-30`
    #[error("Invalid literal '{text}' at offset {offset}")]
    InvalidLiteral { text: String, offset: usize },

    /// Conversion keyword with a right-hand side that is not a unit, currency or `%`
    #[error("Unknown conversion target '{0}'")]
    UnknownConversionTarget(String),
}

impl FormulaError {
    /// Taxonomy bucket of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormulaError::UnknownConversionTarget(_) => ErrorKind::Semantic,
            _ => ErrorKind::Parse,
        }
    }
}

impl From<FormulaError> for CoreError {
    fn from(err: FormulaError) -> Self {
        match err.kind() {
            ErrorKind::Semantic => CoreError::Semantic(err.to_string()),
            _ => CoreError::Parse(err.to_string()),
        }
    }
}
