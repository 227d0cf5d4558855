//! Prelude module - common imports for calcline users
//!
//! ```rust
//! use calcline::prelude::*;
//! ```

pub use crate::{
    // Configuration
    ArithmeticOptions,
    // Document types
    DocumentSnapshot,
    Engine,
    EngineOptions,
    EquationEntry,
    // Error types
    Error,
    ErrorKind,
    FormatOptions,
    FxRatesSnapshot,
    LineKind,
    LineResult,
    ResolveMode,
    Result,

    // Values
    SemanticValue,
    TypeTag,
    Variable,
    VariableStore,
};
