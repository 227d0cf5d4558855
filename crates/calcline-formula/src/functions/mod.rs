//! Built-in functions

pub mod math;

use crate::ast::Argument;
use crate::evaluator::EvaluationContext;
use ahash::AHashMap;
use calcline_core::{Error, Result, SemanticValue, TypeTag};
use std::sync::OnceLock;

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Shared registry of built-in functions
pub fn get_function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Function implementation signature.
///
/// Arguments arrive in parameter order; optional trailing parameters that were
/// not supplied are absent from the slice.
pub type FunctionImpl = fn(&[SemanticValue], &EvaluationContext) -> Result<SemanticValue>;

/// Function definition
pub struct FunctionDef {
    /// Function name (lowercase)
    pub name: &'static str,
    /// Parameter names, used to bind named arguments (`round(x, digits: 2)`)
    pub params: &'static [&'static str],
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Declared result kind
    pub return_type: TypeTag,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// Parameter position of every argument.
    ///
    /// Positional arguments fill parameters left to right and may not follow a
    /// named one; a named argument takes the parameter of that name.
    pub fn bind(&self, names: &[Option<&str>]) -> Result<Vec<usize>> {
        let mut slots = Vec::with_capacity(names.len());
        let mut seen_named = false;

        for (index, name) in names.iter().enumerate() {
            let slot = match name {
                None if seen_named => {
                    return Err(Error::semantic(format!(
                        "{}: positional argument after a named argument",
                        self.name
                    )))
                }
                None => index,
                Some(name) => {
                    seen_named = true;
                    self.params
                        .iter()
                        .position(|param| param.eq_ignore_ascii_case(name))
                        .ok_or_else(|| {
                            Error::semantic(format!("{}: unknown parameter '{name}'", self.name))
                        })?
                }
            };
            if slots.contains(&slot) {
                return Err(Error::semantic(format!(
                    "{}: parameter '{}' given twice",
                    self.name,
                    self.params.get(slot).copied().unwrap_or("?")
                )));
            }
            slots.push(slot);
        }

        let count = slots.iter().map(|slot| slot + 1).max().unwrap_or(0);
        if count != slots.len() {
            return Err(Error::semantic(format!(
                "{}: missing argument before a named argument",
                self.name
            )));
        }
        self.check_count(count)?;
        Ok(slots)
    }

    /// Validate argument count and names of a call
    pub fn check_arguments(&self, args: &[Argument]) -> Result<()> {
        let names: Vec<Option<&str>> = args.iter().map(|arg| arg.name.as_deref()).collect();
        self.bind(&names).map(|_| ())
    }

    fn check_count(&self, count: usize) -> Result<()> {
        if count < self.min_args {
            return Err(Error::semantic(format!(
                "{} expects at least {} argument(s), got {count}",
                self.name, self.min_args
            )));
        }
        if let Some(max) = self.max_args {
            if count > max {
                return Err(Error::semantic(format!(
                    "{} expects at most {max} argument(s), got {count}",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_math_functions();
        registry.register_aggregate_functions();

        registry
    }

    /// Look up a function by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_lowercase())
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_lowercase(), def);
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.values().map(|def| def.name).collect();
        names.sort_unstable();
        names
    }

    fn register_unary(&mut self, name: &'static str, implementation: FunctionImpl) {
        self.register(FunctionDef {
            name,
            params: &["x"],
            min_args: 1,
            max_args: Some(1),
            return_type: TypeTag::Number,
            implementation,
        });
    }

    fn register_math_functions(&mut self) {
        self.register_unary("sqrt", math::fn_sqrt);
        self.register_unary("cbrt", math::fn_cbrt);
        self.register_unary("abs", math::fn_abs);
        self.register_unary("floor", math::fn_floor);
        self.register_unary("ceil", math::fn_ceil);
        self.register_unary("trunc", math::fn_trunc);
        self.register_unary("ln", math::fn_ln);
        self.register_unary("exp", math::fn_exp);
        self.register_unary("sin", math::fn_sin);
        self.register_unary("cos", math::fn_cos);
        self.register_unary("tan", math::fn_tan);
        self.register_unary("asin", math::fn_asin);
        self.register_unary("acos", math::fn_acos);
        self.register_unary("atan", math::fn_atan);

        // ROUND
        self.register(FunctionDef {
            name: "round",
            params: &["x", "digits"],
            min_args: 1,
            max_args: Some(2),
            return_type: TypeTag::Number,
            implementation: math::fn_round,
        });

        // LOG
        self.register(FunctionDef {
            name: "log",
            params: &["x", "base"],
            min_args: 1,
            max_args: Some(2),
            return_type: TypeTag::Number,
            implementation: math::fn_log,
        });
    }

    fn register_aggregate_functions(&mut self) {
        for (name, implementation) in [
            ("sum", math::fn_sum as FunctionImpl),
            ("min", math::fn_min),
            ("max", math::fn_max),
            ("avg", math::fn_average),
            ("average", math::fn_average),
        ] {
            self.register(FunctionDef {
                name,
                params: &[],
                min_args: 1,
                max_args: None,
                return_type: TypeTag::Number,
                implementation,
            });
        }
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup_ignores_case() {
        let registry = get_function_registry();
        assert!(registry.get("SQRT").is_some());
        assert!(registry.get("Round").is_some());
        assert!(registry.get("frobnicate").is_none());
        assert_eq!(registry.names().len(), 21);
    }

    #[test]
    fn test_bind_named_arguments() {
        let round = get_function_registry().get("round").unwrap();
        assert_eq!(round.bind(&[None]).unwrap(), vec![0]);
        assert_eq!(round.bind(&[None, Some("digits")]).unwrap(), vec![0, 1]);
        assert_eq!(round.bind(&[Some("digits"), Some("x")]).unwrap(), vec![1, 0]);
        assert!(round.bind(&[Some("places"), None]).is_err());
        assert!(round.bind(&[Some("digits")]).is_err());
        assert!(round.bind(&[None, Some("x")]).is_err());
        assert!(round.bind(&[None, None, None]).is_err());
    }

    #[test]
    fn test_variadic_arity() {
        let sum = get_function_registry().get("sum").unwrap();
        assert!(sum.bind(&[]).is_err());
        assert!(sum.bind(&[None; 5]).is_ok());
        assert!(sum.bind(&[Some("x")]).is_err());
    }
}
