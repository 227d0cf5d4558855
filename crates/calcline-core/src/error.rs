//! Error types for calcline-core

use std::fmt;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of every [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed token sequence or unit expression
    Parse,
    /// Operator/operand combination with no entry in the compatibility table
    Type,
    /// Empty expression, invalid component shape, unknown conversion target
    Semantic,
    /// Missing FX rate or incompatible dimensions
    Conversion,
    /// Division by zero, circular dependency, unresolved identifier
    Runtime,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Parse => "parseError",
            ErrorKind::Type => "typeError",
            ErrorKind::Semantic => "semanticError",
            ErrorKind::Conversion => "conversionError",
            ErrorKind::Runtime => "runtimeError",
        };
        f.write_str(name)
    }
}

/// Errors produced while parsing, type-checking or evaluating an expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed input
    #[error("Parse error: {0}")]
    Parse(String),

    /// Incompatible operand types
    #[error("Type error: {0}")]
    Type(String),

    /// Structurally invalid expression
    #[error("Semantic error: {0}")]
    Semantic(String),

    /// Unit or currency conversion failure
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Generic evaluation failure
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Division by a zero amount
    #[error("Division by zero")]
    DivisionByZero,

    /// Identifier with no value at evaluation time
    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    /// Variable lies on a dependency cycle
    #[error("Circular dependency: {}", path.join(" -> "))]
    CircularDependency { path: Vec<String> },
}

impl Error {
    /// The taxonomy bucket this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(_) => ErrorKind::Parse,
            Error::Type(_) => ErrorKind::Type,
            Error::Semantic(_) => ErrorKind::Semantic,
            Error::Conversion(_) => ErrorKind::Conversion,
            Error::Runtime(_)
            | Error::DivisionByZero
            | Error::UndefinedVariable(_)
            | Error::CircularDependency { .. } => ErrorKind::Runtime,
        }
    }

    /// Create a parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a conversion error
    pub fn conversion<S: Into<String>>(msg: S) -> Self {
        Error::Conversion(msg.into())
    }

    /// Create a semantic error
    pub fn semantic<S: Into<String>>(msg: S) -> Self {
        Error::Semantic(msg.into())
    }

    /// Type error for an operator applied to an unsupported pair of operand types.
    ///
    /// The type resolver and the value system both build their messages through
    /// this constructor so the two passes report identical errors.
    pub fn incompatible(op: &str, left: impl fmt::Display, right: impl fmt::Display) -> Self {
        Error::Type(format!("cannot apply '{op}' to {left} and {right}"))
    }

    /// Type error for a unary operator or conversion on an unsupported operand
    pub fn unsupported(op: &str, operand: impl fmt::Display) -> Self {
        Error::Type(format!("cannot apply '{op}' to {operand}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Error::DivisionByZero.kind(), ErrorKind::Runtime);
        assert_eq!(Error::UndefinedVariable("x".into()).kind(), ErrorKind::Runtime);
        assert_eq!(Error::parse("bad").kind(), ErrorKind::Parse);
        assert_eq!(ErrorKind::Conversion.to_string(), "conversionError");
    }

    #[test]
    fn test_circular_message() {
        let err = Error::CircularDependency {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Circular dependency: a -> b -> a");
    }

    #[test]
    fn test_incompatible_names_both_types() {
        let err = Error::incompatible("+", "Currency", "Unit");
        assert_eq!(err.to_string(), "Type error: cannot apply '+' to Currency and Unit");
    }
}
