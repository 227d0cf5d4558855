//! Document calculation engine
//!
//! Runs a whole document through the expression engine. Every pass starts from
//! an empty variable store, registers the document's assignments, recomputes
//! the variables in dependency order and then produces one result per line.
//!
//! # Example
//!
//! ```rust
//! use calcline::{Engine, EngineOptions};
//!
//! let mut engine = Engine::new(EngineOptions::default());
//! let snapshot = engine.run("rate = $0.15/h\nbudget = $500\nbudget / rate");
//! assert_eq!(snapshot.lines[2].display.as_deref(), Some("3333.33 h"));
//! ```

use crate::store::{RecalcOptions, Variable, VariableStore};
use calcline_core::{
    ArithmeticOptions, Error, FormatOptions, FxRatesSnapshot, SemanticValue,
};
use calcline_formula::{
    evaluate, normalize_name, parse_expression, EvaluationContext, ResolveMode, TypeResolver,
};
use lazy_regex::regex_captures;

/// Options for document calculation
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub arithmetic: ArithmeticOptions,
    /// Precision used for `LineResult::display`
    pub format: FormatOptions,
    /// How undefined variables are treated while checking types
    pub resolve_mode: ResolveMode,
    /// Exchange rates supplied by the host, used when the document declares none
    pub fx_snapshot: Option<FxRatesSnapshot>,
}

/// What a document line contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    /// `# ...` or `// ...`
    Comment,
    /// `name = expression`
    Assignment { name: String, expression: String },
    Expression(String),
}

/// Classify one line of a document
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.starts_with('#') || trimmed.starts_with("//") {
        return LineKind::Comment;
    }
    match regex_captures!(r"^([\p{L}_][\p{L}\p{N}_ ]*?)\s*=\s*(.*)$", trimmed) {
        Some((_, name, expression)) => LineKind::Assignment {
            name: normalize_name(name),
            expression: expression.trim().to_string(),
        },
        None => LineKind::Expression(trimmed.to_string()),
    }
}

/// An assignment found in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquationEntry {
    /// 1-based line number
    pub line_number: usize,
    pub variable_name: String,
    pub expression_text: String,
}

/// Result of one document line
#[derive(Debug, Clone, PartialEq)]
pub struct LineResult {
    /// 1-based line number
    pub line_number: usize,
    pub text: String,
    pub kind: LineKind,
    /// None for blank and comment lines
    pub value: Option<SemanticValue>,
    /// `value` rendered with the engine's format options
    pub display: Option<String>,
}

/// Statistics from a document pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Total number of lines
    pub line_count: usize,
    /// Number of assignment lines
    pub assignments: usize,
    /// Number of expression lines
    pub expressions: usize,
    /// Number of variables recomputed
    pub variables_calculated: usize,
    /// Number of variables on a dependency cycle
    pub circular_references: usize,
    /// Number of lines whose value is an error
    pub errors: usize,
    /// Number of lines left symbolic
    pub symbolic: usize,
}

/// Immutable result of a document pass
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub lines: Vec<LineResult>,
    /// Final variables, sorted by name
    pub variables: Vec<Variable>,
    /// Assignments in document order
    pub equations: Vec<EquationEntry>,
    pub stats: CalculationStats,
}

impl DocumentSnapshot {
    /// Final variable by name
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        let name = normalize_name(name);
        self.variables.iter().find(|variable| variable.name == name)
    }

    /// Value of a 1-based line
    pub fn value_at(&self, line_number: usize) -> Option<&SemanticValue> {
        self.lines
            .get(line_number.checked_sub(1)?)
            .and_then(|line| line.value.as_ref())
    }
}

/// The document calculation engine
#[derive(Debug, Default)]
pub struct Engine {
    options: EngineOptions,
    store: VariableStore,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            store: VariableStore::new(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Variables left by the last pass
    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    /// Calculate a whole document
    pub fn run(&mut self, document: &str) -> DocumentSnapshot {
        let mut stats = CalculationStats::default();

        // Phase 1: Clear the store, classify lines and register assignments
        self.store.clear();
        let mut classified = Vec::new();
        let mut equations = Vec::new();
        for (index, text) in document.lines().enumerate() {
            let kind = classify_line(text);
            match &kind {
                LineKind::Assignment { name, expression } => {
                    stats.assignments += 1;
                    if let Err(e) = self.store.set(name, expression) {
                        tracing::debug!(line = index + 1, error = %e, "assignment rejected");
                    }
                    equations.push(EquationEntry {
                        line_number: index + 1,
                        variable_name: name.clone(),
                        expression_text: expression.clone(),
                    });
                }
                LineKind::Expression(_) => stats.expressions += 1,
                LineKind::Blank | LineKind::Comment => {}
            }
            classified.push((text, kind));
        }
        stats.line_count = classified.len();
        tracing::debug!(
            lines = stats.line_count,
            assignments = stats.assignments,
            "document classified"
        );

        // Phase 2: Recompute variables in dependency order
        let recalc = self.store.recalculate_variables(&RecalcOptions {
            arithmetic: self.options.arithmetic,
            fx_snapshot: self.options.fx_snapshot.as_ref(),
        });
        stats.variables_calculated = recalc.variables_calculated;
        stats.circular_references = recalc.circular_references;

        // Phase 3: One result per line against the final variables
        let mut lines = Vec::with_capacity(classified.len());
        for (index, (text, kind)) in classified.into_iter().enumerate() {
            let value = match &kind {
                LineKind::Blank | LineKind::Comment => None,
                LineKind::Assignment { name, expression } => {
                    Some(self.assignment_value(name, expression))
                }
                LineKind::Expression(expression) => Some(self.evaluate_line(expression)),
            };
            match &value {
                Some(SemanticValue::Error(_)) => stats.errors += 1,
                Some(SemanticValue::Symbolic(_)) => stats.symbolic += 1,
                _ => {}
            }
            let display = value
                .as_ref()
                .map(|value| value.display_with(&self.options.format));
            lines.push(LineResult {
                line_number: index + 1,
                text: text.to_string(),
                kind,
                value,
                display,
            });
        }

        tracing::debug!(
            variables = stats.variables_calculated,
            errors = stats.errors,
            "document pass finished"
        );

        DocumentSnapshot {
            lines,
            variables: self.store.iter().cloned().collect(),
            equations,
            stats,
        }
    }

    /// Evaluate one expression against the variables of the last pass.
    ///
    /// The expression is parsed, type-checked and only then evaluated; failures
    /// come back as [`SemanticValue::Error`].
    pub fn evaluate_line(&self, expression: &str) -> SemanticValue {
        let components = match parse_expression(expression) {
            Ok(components) => components,
            Err(e) => return SemanticValue::Error(e.into()),
        };

        let resolver = TypeResolver::new(self.options.resolve_mode, self.options.arithmetic);
        match resolver.resolve(&components, &self.store.type_context()) {
            Ok(Some(_)) => {}
            Ok(None) => return SemanticValue::Symbolic(expression.to_string()),
            Err(e) => return SemanticValue::Error(e),
        }

        let variables = self.store.numeric_context();
        let ctx = EvaluationContext::new(
            &variables,
            self.options.fx_snapshot.as_ref(),
            self.options.arithmetic,
        );
        match evaluate(&components, &ctx) {
            Ok(value) => value,
            Err(Error::UndefinedVariable(_))
                if self.options.resolve_mode == ResolveMode::AllowUnknownVariables =>
            {
                SemanticValue::Symbolic(expression.to_string())
            }
            Err(e) => SemanticValue::Error(e),
        }
    }

    /// Value shown on an assignment line: the variable's final value, except
    /// that strict mode reports a deferred variable as an error
    fn assignment_value(&self, name: &str, expression: &str) -> SemanticValue {
        match self.store.value(name) {
            Some(SemanticValue::Symbolic(_)) if self.options.resolve_mode == ResolveMode::Strict => {
                match self.evaluate_line(expression) {
                    SemanticValue::Symbolic(_) => {
                        SemanticValue::Error(Error::UndefinedVariable(name.to_string()))
                    }
                    other => other,
                }
            }
            Some(value) => value.clone(),
            None => SemanticValue::Error(Error::UndefinedVariable(name.to_string())),
        }
    }
}

/// Calculate a document with a fresh engine
pub fn run_document(document: &str, options: EngineOptions) -> DocumentSnapshot {
    Engine::new(options).run(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn displays(snapshot: &DocumentSnapshot) -> Vec<Option<String>> {
        snapshot.lines.iter().map(|line| line.display.clone()).collect()
    }

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line("   "), LineKind::Blank);
        assert_eq!(classify_line("# note"), LineKind::Comment);
        assert_eq!(classify_line("  // note"), LineKind::Comment);
        assert_eq!(
            classify_line("monthly  rent = $1200"),
            LineKind::Assignment {
                name: "monthly rent".into(),
                expression: "$1200".into()
            }
        );
        assert_eq!(
            classify_line("2km + 300m"),
            LineKind::Expression("2km + 300m".into())
        );
        assert_eq!(classify_line("(a) = 1"), LineKind::Expression("(a) = 1".into()));
    }

    #[test]
    fn test_simple_document() {
        let snapshot = run_document(
            "# trip\nspeed = 60 km/h\ntime = 90 min\nspeed * time\n",
            EngineOptions::default(),
        );
        assert_eq!(
            displays(&snapshot),
            vec![
                None,
                Some("60 km/h".to_string()),
                Some("90 min".to_string()),
                Some("90 km".to_string()),
            ]
        );
        assert_eq!(snapshot.stats.line_count, 4);
        assert_eq!(snapshot.stats.assignments, 2);
        assert_eq!(snapshot.stats.expressions, 1);
        assert_eq!(snapshot.stats.errors, 0);
    }

    #[test]
    fn test_forward_reference_resolves() {
        let snapshot = run_document("total = price * 3\nprice = $4\ntotal", EngineOptions::default());
        assert_eq!(snapshot.value_at(1), Some(&SemanticValue::currency("USD", 12.0)));
        assert_eq!(snapshot.lines[2].display.as_deref(), Some("$12.00"));
    }

    #[test]
    fn test_undefined_variable_modes() {
        let relaxed = run_document("x + 1", EngineOptions::default());
        assert_eq!(relaxed.value_at(1), Some(&SemanticValue::Symbolic("x + 1".into())));
        assert_eq!(relaxed.stats.symbolic, 1);

        let strict = run_document(
            "y = x + 1\nx + 1",
            EngineOptions {
                resolve_mode: ResolveMode::Strict,
                ..Default::default()
            },
        );
        assert!(matches!(
            strict.value_at(1),
            Some(SemanticValue::Error(Error::UndefinedVariable(_)))
        ));
        assert_eq!(
            strict.value_at(2),
            Some(&SemanticValue::Error(Error::UndefinedVariable("x".into())))
        );
    }

    #[test]
    fn test_type_error_skips_evaluation() {
        let snapshot = run_document("$5 + 3 m", EngineOptions::default());
        let line = &snapshot.lines[0];
        assert_eq!(
            line.display.as_deref(),
            Some("Type error: cannot apply '+' to Currency and Unit")
        );
        assert_eq!(snapshot.stats.errors, 1);
    }

    #[test]
    fn test_equations_and_variables() {
        let snapshot = run_document("a = 1\n\nb = a + 1\na + b", EngineOptions::default());
        assert_eq!(
            snapshot.equations,
            vec![
                EquationEntry {
                    line_number: 1,
                    variable_name: "a".into(),
                    expression_text: "1".into(),
                },
                EquationEntry {
                    line_number: 3,
                    variable_name: "b".into(),
                    expression_text: "a + 1".into(),
                },
            ]
        );
        let names: Vec<_> = snapshot.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(snapshot.value_at(4), Some(&SemanticValue::Number(3.0)));
    }

    #[test]
    fn test_passes_start_from_scratch() {
        let mut engine = Engine::default();
        engine.run("a = 1\nb = 2");
        assert_eq!(engine.store().len(), 2);

        let snapshot = engine.run("a + b");
        assert!(engine.store().is_empty());
        assert_eq!(snapshot.value_at(1), Some(&SemanticValue::Symbolic("a + b".into())));
    }

    #[test]
    fn test_manual_rate_overrides_snapshot() {
        let snapshot = FxRatesSnapshot::new(
            "USD",
            [("EUR".to_string(), 0.5)].into_iter().collect(),
        );
        let options = EngineOptions {
            fx_snapshot: Some(snapshot),
            ..Default::default()
        };

        let cached = run_document("€10 to USD", options.clone());
        assert_eq!(cached.lines[0].display.as_deref(), Some("$20.00"));

        let declared = run_document("EUR = $1.10\n€10 to USD", options);
        assert_eq!(declared.lines[1].display.as_deref(), Some("$11.00"));
    }

    #[test]
    fn test_format_options() {
        let options = EngineOptions {
            format: FormatOptions {
                number_decimals: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        let snapshot = run_document("1 / 3", options);
        assert_eq!(snapshot.lines[0].display.as_deref(), Some("0.33"));
    }
}
