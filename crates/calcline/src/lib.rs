//! # calcline
//!
//! A semantic calculator engine for plain-text documents.
//!
//! Calcline evaluates lines such as `2km + 300m`, `10% of 155N` or
//! `$500 / $0.15/h` into typed values that keep their units and currencies.
//!
//! ## Features
//!
//! - Numbers, percentages, money, physical quantities, dates and durations
//! - Unit algebra with dimensional analysis and conversions (`10 km to mi`)
//! - Currency conversion from in-document rates or a host-supplied snapshot
//! - Variables with forward references and circular dependency detection
//! - Static type checking before evaluation
//!
//! ## Example
//!
//! ```rust
//! use calcline::prelude::*;
//!
//! let mut engine = Engine::new(EngineOptions::default());
//! let snapshot = engine.run("distance = 2km + 300m\ndistance to m\n23*PI");
//!
//! assert_eq!(snapshot.lines[0].display.as_deref(), Some("2.3 km"));
//! assert_eq!(snapshot.lines[1].display.as_deref(), Some("2300 m"));
//! assert_eq!(snapshot.lines[2].display.as_deref(), Some("72.256631"));
//! ```

pub mod calculation;
pub mod prelude;
pub mod store;

// Re-export calculation types
pub use calculation::{
    classify_line, run_document, CalculationStats, DocumentSnapshot, Engine, EngineOptions,
    EquationEntry, LineKind, LineResult,
};
pub use store::{RecalcOptions, RecalcStats, Variable, VariableStore};

// Re-export core types
pub use calcline_core::{
    parse_literal, ArithmeticOptions, CompositeUnit, Dimension, Error, ErrorKind, FormatOptions,
    FxProvider, FxRatesSnapshot, Result, SemanticValue, TypeTag,
};

// Re-export formula types
pub use calcline_formula::{
    evaluate, evaluate_expression, parse_expression, resolve_type, Component, DependencyGraph,
    EvaluationContext, FormulaError, ResolveMode, TypeResolver,
};
