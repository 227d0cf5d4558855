//! Reactive variable store
//!
//! Owns the variables of one document together with the dependency graph
//! between their definitions, and recomputes every variable in dependency
//! order.

use ahash::AHashMap;
use calcline_core::{
    parse_literal, ArithmeticOptions, Error, FxRatesSnapshot, SemanticValue, TypeTag,
};
use calcline_formula::{
    evaluate, normalize_name, parse_expression, DependencyGraph, EvaluationContext, ResolveMode,
    TypeResolver,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A named value and the definition it was computed from
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Normalized name
    pub name: String,
    pub value: SemanticValue,
    /// Definition text as written
    pub raw_value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Settings for one recalculation pass
#[derive(Debug, Clone, Copy, Default)]
pub struct RecalcOptions<'a> {
    pub arithmetic: ArithmeticOptions,
    pub fx_snapshot: Option<&'a FxRatesSnapshot>,
}

/// Statistics from a recalculation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecalcStats {
    /// Number of variables recomputed
    pub variables_calculated: usize,
    /// Number of variables on a dependency cycle
    pub circular_references: usize,
    /// Number of variables left symbolic (forward references)
    pub symbolic: usize,
    /// Number of variables holding an error
    pub errors: usize,
}

/// Variables plus the dependency graph between them
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    variables: BTreeMap<String, Variable>,
    graph: DependencyGraph,
}

impl VariableStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or redefine `name` as `raw_value`.
    ///
    /// The value is computed by the next [`recalculate_variables`] call; until
    /// then a new variable holds its definition as a symbolic value. A definition
    /// that closes a dependency cycle is stored and the cycle is returned.
    ///
    /// [`recalculate_variables`]: VariableStore::recalculate_variables
    pub fn set(&mut self, name: &str, raw_value: &str) -> Result<(), Error> {
        let name = normalize_name(name);
        let now = Utc::now();
        let raw_value = raw_value.trim();

        self.variables
            .entry(name.clone())
            .and_modify(|variable| {
                variable.raw_value = raw_value.to_string();
                variable.updated_at = now;
            })
            .or_insert_with(|| Variable {
                name: name.clone(),
                value: SemanticValue::Symbolic(raw_value.to_string()),
                raw_value: raw_value.to_string(),
                created_at: now,
                updated_at: now,
            });

        self.graph.add_node(&name, raw_value)
    }

    /// Look up a variable
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(&normalize_name(name))
    }

    /// Current value of a variable
    pub fn value(&self, name: &str) -> Option<&SemanticValue> {
        self.get(name).map(|variable| &variable.value)
    }

    /// Remove a variable.
    ///
    /// Graph edges stay in place, so dependents turn symbolic on the next
    /// recalculation and a later definition reconnects them.
    pub fn delete(&mut self, name: &str) -> Option<Variable> {
        self.variables.remove(&normalize_name(name))
    }

    /// Remove every variable and the whole graph
    pub fn clear(&mut self) {
        self.variables.clear();
        self.graph.clear();
    }

    /// Variables sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// The dependency graph between definitions
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Values usable during evaluation: everything except symbolic
    /// placeholders. Error values are included so references to them propagate
    /// the error.
    pub fn numeric_context(&self) -> AHashMap<String, SemanticValue> {
        self.variables
            .values()
            .filter(|variable| !matches!(variable.value, SemanticValue::Symbolic(_)))
            .map(|variable| (variable.name.clone(), variable.value.clone()))
            .collect()
    }

    /// Current type of every variable
    pub fn type_context(&self) -> AHashMap<String, TypeTag> {
        self.variables
            .values()
            .map(|variable| (variable.name.clone(), variable.value.type_tag()))
            .collect()
    }

    /// Recompute every variable, dependencies first.
    ///
    /// Failures are isolated per variable: a failing definition stores an error
    /// value and the pass continues.
    pub fn recalculate_variables(&mut self, options: &RecalcOptions) -> RecalcStats {
        let mut stats = RecalcStats::default();
        let mut context = self.numeric_context();
        let order = self.graph.get_update_order();
        tracing::debug!(nodes = order.len(), "recalculating variables");

        for name in order {
            let Some(raw_value) = self.variables.get(&name).map(|v| v.raw_value.clone()) else {
                // Deleted variable whose node is still in the graph
                continue;
            };

            let value = if self.graph.is_circular(&name) {
                stats.circular_references += 1;
                let path = self
                    .graph
                    .find_cycle(&name)
                    .unwrap_or_else(|| vec![name.clone(), name.clone()]);
                SemanticValue::Error(Error::CircularDependency { path })
            } else {
                compute(&raw_value, &context, options)
            };

            match &value {
                SemanticValue::Symbolic(_) => stats.symbolic += 1,
                SemanticValue::Error(_) => stats.errors += 1,
                _ => {}
            }
            tracing::debug!(variable = %name, value = %value, "recalculated");

            if matches!(value, SemanticValue::Symbolic(_)) {
                context.remove(&name);
            } else {
                context.insert(name.clone(), value.clone());
            }
            if let Some(variable) = self.variables.get_mut(&name) {
                variable.value = value;
                variable.updated_at = Utc::now();
            }
            stats.variables_calculated += 1;
        }

        stats
    }
}

/// Value of one definition: a literal directly, otherwise an evaluated
/// expression. An undefined reference defers the variable as symbolic.
fn compute(
    raw_value: &str,
    context: &AHashMap<String, SemanticValue>,
    options: &RecalcOptions,
) -> SemanticValue {
    if let Ok(value) = parse_literal(raw_value) {
        return value;
    }
    let components = match parse_expression(raw_value) {
        Ok(components) => components,
        Err(e) => return SemanticValue::Error(e.into()),
    };

    let resolver = TypeResolver::new(ResolveMode::AllowUnknownVariables, options.arithmetic);
    match resolver.resolve(&components, context) {
        Ok(Some(_)) => {}
        Ok(None) => return SemanticValue::Symbolic(raw_value.to_string()),
        Err(e) => return SemanticValue::Error(e),
    }

    let ctx = EvaluationContext::new(context, options.fx_snapshot, options.arithmetic);
    match evaluate(&components, &ctx) {
        Ok(value) => value,
        Err(Error::UndefinedVariable(_)) => SemanticValue::Symbolic(raw_value.to_string()),
        Err(e) => SemanticValue::Error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shown(store: &VariableStore, name: &str) -> String {
        store.value(name).unwrap().to_string()
    }

    #[test]
    fn test_set_and_recalculate() {
        let mut store = VariableStore::new();
        store.set("total", "price * qty").unwrap();
        store.set("price", "$2.50").unwrap();
        store.set("qty", "4").unwrap();

        let stats = store.recalculate_variables(&RecalcOptions::default());
        assert_eq!(stats.variables_calculated, 3);
        assert_eq!(stats.errors, 0);
        assert_eq!(shown(&store, "total"), "$10.00");
    }

    #[test]
    fn test_names_are_normalized() {
        let mut store = VariableStore::new();
        store.set("  monthly   rent ", "$1200").unwrap();
        store.recalculate_variables(&RecalcOptions::default());
        assert_eq!(store.get("monthly rent").unwrap().name, "monthly rent");
        assert_eq!(shown(&store, "monthly  rent"), "$1200.00");
    }

    #[test]
    fn test_forward_reference_is_symbolic() {
        let mut store = VariableStore::new();
        store.set("a", "b + 1").unwrap();
        let stats = store.recalculate_variables(&RecalcOptions::default());
        assert_eq!(stats.symbolic, 1);
        assert_eq!(
            store.value("a"),
            Some(&SemanticValue::Symbolic("b + 1".into()))
        );

        store.set("b", "2").unwrap();
        store.recalculate_variables(&RecalcOptions::default());
        assert_eq!(store.value("a"), Some(&SemanticValue::Number(3.0)));
    }

    #[test]
    fn test_circular_variables_get_errors() {
        let mut store = VariableStore::new();
        store.set("a", "2 b").unwrap();
        assert!(store.set("b", "3 a").is_err());

        let stats = store.recalculate_variables(&RecalcOptions::default());
        assert_eq!(stats.circular_references, 2);
        for name in ["a", "b"] {
            assert!(matches!(
                store.value(name),
                Some(SemanticValue::Error(Error::CircularDependency { .. }))
            ));
        }
    }

    #[test]
    fn test_failure_is_isolated() {
        let mut store = VariableStore::new();
        store.set("bad", "1 / 0").unwrap();
        store.set("uses bad", "bad + 1").unwrap();
        store.set("fine", "2 + 2").unwrap();

        let stats = store.recalculate_variables(&RecalcOptions::default());
        assert_eq!(stats.errors, 2);
        assert_eq!(store.value("bad"), Some(&SemanticValue::Error(Error::DivisionByZero)));
        assert_eq!(
            store.value("uses bad"),
            Some(&SemanticValue::Error(Error::DivisionByZero))
        );
        assert_eq!(store.value("fine"), Some(&SemanticValue::Number(4.0)));
    }

    #[test]
    fn test_definitions_are_type_checked() {
        let mut store = VariableStore::new();
        store.set("d", "2024-01-01 * 2").unwrap();
        store.set("e", "start * 2").unwrap();
        store.set("start", "2024-01-01").unwrap();
        store.set("f", "later * 2024-01-01").unwrap();

        let stats = store.recalculate_variables(&RecalcOptions::default());
        for name in ["d", "e"] {
            assert_eq!(
                store.value(name),
                Some(&SemanticValue::Error(Error::Type(
                    "cannot apply '*' to Date and Number".into()
                ))),
                "{name}"
            );
        }
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.symbolic, 1);
    }

    #[test]
    fn test_delete_keeps_edges() {
        let mut store = VariableStore::new();
        store.set("x", "5").unwrap();
        store.set("y", "x * 2").unwrap();
        store.recalculate_variables(&RecalcOptions::default());

        assert!(store.delete("x").is_some());
        assert!(store.graph().contains("x"));
        store.recalculate_variables(&RecalcOptions::default());
        assert!(matches!(store.value("y"), Some(SemanticValue::Symbolic(_))));

        store.set("x", "7").unwrap();
        store.recalculate_variables(&RecalcOptions::default());
        assert_eq!(store.value("y"), Some(&SemanticValue::Number(14.0)));
    }

    #[test]
    fn test_recalculation_is_idempotent() {
        let mut store = VariableStore::new();
        store.set("speed", "60 km/h").unwrap();
        store.set("trip", "speed * 90 min").unwrap();
        store.set("cost", "$0.20/km * trip").unwrap();

        store.recalculate_variables(&RecalcOptions::default());
        let first: Vec<_> = store.iter().map(|v| v.value.clone()).collect();
        store.recalculate_variables(&RecalcOptions::default());
        let second: Vec<_> = store.iter().map(|v| v.value.clone()).collect();
        assert_eq!(first, second);
        assert_eq!(shown(&store, "trip"), "90 km");
        assert_eq!(shown(&store, "cost"), "$18.00");
    }

    #[test]
    fn test_contexts() {
        let mut store = VariableStore::new();
        store.set("a", "5 km").unwrap();
        store.set("b", "later").unwrap();
        store.recalculate_variables(&RecalcOptions::default());

        let numeric = store.numeric_context();
        assert!(numeric.contains_key("a"));
        assert!(!numeric.contains_key("b"));

        let types = store.type_context();
        assert_eq!(types.get("a"), Some(&TypeTag::Unit));
        assert_eq!(types.get("b"), Some(&TypeTag::Symbolic));
    }
}
