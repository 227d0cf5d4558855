//! # calcline-core
//!
//! Value system for the calcline expression engine.
//!
//! This crate provides the typed values every expression evaluates to:
//! - [`SemanticValue`] - Numbers, percentages, money, physical quantities, dates, durations
//! - [`CompositeUnit`] and [`Dimension`] - Unit algebra and dimensional analysis
//! - [`parse_literal`] - Literal text such as `155N`, `$0.15/h` or `2024-03-01`
//! - [`FxResolver`] - Currency conversion over in-document and cached exchange rates
//!
//! ## Example
//!
//! ```rust
//! use calcline_core::{parse_literal, ArithmeticOptions};
//!
//! let distance = parse_literal("2km").unwrap();
//! let extra = parse_literal("300m").unwrap();
//! let total = distance.add(&extra).unwrap();
//! assert_eq!(total.to_string(), "2.3 km");
//!
//! let budget = parse_literal("$500").unwrap();
//! let rate = parse_literal("$0.15/h").unwrap();
//! let hours = budget.divide(&rate, &ArithmeticOptions::default()).unwrap();
//! assert_eq!(hours.to_string(), "3333.33 h");
//! ```

pub mod currency;
pub mod error;
pub mod literal;
pub mod numeric;
pub mod unit;
pub mod value;

// Re-exports for convenience
pub use currency::{FxProvider, FxRatesSnapshot, FxResolver, ManualRates, RateSource};
pub use error::{Error, ErrorKind, Result};
pub use literal::parse_literal;
pub use unit::{convert_amount, BaseDimension, CompositeUnit, Dimension, UnitDef};
pub use value::{ArithmeticOptions, BinaryOp, FormatOptions, SemanticValue, TypeTag};
