//! # calcline-formula
//!
//! Expression front end and evaluator for calcline.
//!
//! This crate provides:
//! - A tolerant lexer (text → tokens)
//! - Component parsing (tokens → component tree)
//! - Static type resolution against an operator compatibility table
//! - Evaluation over semantic values, with unit and currency conversion
//! - Built-in functions and constants
//! - Dependency tracking between variable definitions
//!
//! ## Example
//!
//! ```rust
//! use calcline_formula::{evaluate_expression, EvaluationContext};
//!
//! let ctx = EvaluationContext::simple();
//! let value = evaluate_expression("10% of 155N", &ctx).unwrap();
//! assert_eq!(value.to_string(), "15.5 N");
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod postfix;
pub mod types;

pub use ast::{Argument, Component, ConversionTarget, Operator};
pub use dependency::{DependencyGraph, DependencyGraphNode, Tokenizer};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, evaluate_expression, EvaluationContext};
pub use lexer::{opens_call, tokenize, Token, TokenKind};
pub use parser::{normalize_name, parse, parse_expression};
pub use types::{resolve_type, ResolveMode, TypeEnvironment, TypeResolver};
