//! Tests for whole-document passes

use calcline::prelude::*;
use calcline::run_document;
use pretty_assertions::assert_eq;

fn displays(document: &str) -> Vec<String> {
    run_document(document, EngineOptions::default())
        .lines
        .into_iter()
        .map(|line| line.display.unwrap_or_default())
        .collect()
}

/// Test a budgeting document with phrase names and percentages
#[test]
fn test_budget_document() {
    let document = "\
# monthly budget
monthly rent = $1200
utilities = $180
total = monthly rent + utilities
total + 10%
total * 12";

    assert_eq!(
        displays(document),
        vec![
            "",
            "$1200.00",
            "$180.00",
            "$1380.00",
            "$1518.00",
            "$16560.00",
        ]
    );
}

/// Test that definitions may appear after their use
#[test]
fn test_definitions_in_any_order() {
    let snapshot = run_document(
        "cost = rate * hours\nhours = 37.5 h\nrate = $40/h\ncost",
        EngineOptions::default(),
    );
    assert_eq!(snapshot.lines[0].display.as_deref(), Some("$1500.00"));
    assert_eq!(snapshot.lines[3].display.as_deref(), Some("$1500.00"));
    assert_eq!(snapshot.stats.symbolic, 0);
}

/// Test that one failing line does not affect the others
#[test]
fn test_errors_are_isolated_per_line() {
    let snapshot = run_document(
        "a = 10\nb = a / 0\nc = a * 2\n(1 + \nc + 1",
        EngineOptions::default(),
    );
    assert_eq!(snapshot.value_at(1), Some(&SemanticValue::Number(10.0)));
    assert_eq!(
        snapshot.value_at(2),
        Some(&SemanticValue::Error(Error::DivisionByZero))
    );
    assert_eq!(snapshot.value_at(3), Some(&SemanticValue::Number(20.0)));
    assert_eq!(
        snapshot.value_at(4).and_then(SemanticValue::as_error).map(Error::kind),
        Some(ErrorKind::Parse)
    );
    assert_eq!(snapshot.value_at(5), Some(&SemanticValue::Number(21.0)));
    assert_eq!(snapshot.stats.errors, 2);
}

/// Test that a redefinition later in the document wins
#[test]
fn test_redefinition() {
    let snapshot = run_document("x = 1\nx = 2\nx * 10", EngineOptions::default());
    assert_eq!(snapshot.equations.len(), 2);
    assert_eq!(snapshot.variables.len(), 1);
    assert_eq!(snapshot.value_at(3), Some(&SemanticValue::Number(20.0)));
}

/// Test currencies declared in the document
#[test]
fn test_document_exchange_rates() {
    let lines = displays("EUR = $1.10\nprice = €20\nprice to USD\nprice + $8");
    assert_eq!(lines[2], "$22.00");
    assert_eq!(lines[3], "€27.27");
}

/// Test that a rate declared after its use still applies
#[test]
fn test_rate_declared_after_use() {
    assert_eq!(
        displays("Cost = €10 to USD\nEUR = $1.10\nCost\nfee = €5 + $1\nfee to USD"),
        vec!["$11.00", "$1.10", "$11.00", "€5.91", "$6.50"]
    );
}

/// Test that a space before a parenthesis means multiplication, not a call
#[test]
fn test_spaced_group_multiplies_variable() {
    assert_eq!(
        displays("price = $10\nprice (1 + 2)\nsqrt(16)"),
        vec!["$10.00", "$30.00", "4"]
    );
}

/// Test that impossible dates are reported instead of truncated
#[test]
fn test_invalid_date_is_an_error() {
    let snapshot = run_document("due = 2024-02-30\n2024-13-45 + 1", EngineOptions::default());
    for line in [1, 2] {
        assert_eq!(
            snapshot.value_at(line).and_then(SemanticValue::as_error).map(Error::kind),
            Some(ErrorKind::Parse)
        );
    }
}

/// Test that an ill-typed definition names both operand types
#[test]
fn test_ill_typed_definition() {
    let lines = displays("d = 2024-01-01 * 2\nd");
    assert_eq!(lines[0], "Type error: cannot apply '*' to Date and Number");
    assert_eq!(lines[1], lines[0]);
}

/// Test that missing rates surface as conversion errors
#[test]
fn test_missing_exchange_rate() {
    let snapshot = run_document("€20 to JPY", EngineOptions::default());
    assert_eq!(
        snapshot.value_at(1).and_then(SemanticValue::as_error).map(Error::kind),
        Some(ErrorKind::Conversion)
    );
}

/// Test recomputation order across a chain of variables
#[test]
fn test_update_order_follows_dependencies() {
    let mut store = VariableStore::new();
    store.set("d", "c + 1").unwrap();
    store.set("c", "b + 1").unwrap();
    store.set("b", "a + 1").unwrap();
    store.set("a", "1").unwrap();

    let order = store.graph().get_update_order();
    let position = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert!(position("a") < position("b"));
    assert!(position("b") < position("c"));
    assert!(position("c") < position("d"));

    store.recalculate_variables(&Default::default());
    assert_eq!(store.value("d"), Some(&SemanticValue::Number(4.0)));
}

/// Test conversions inside a document
#[test]
fn test_conversions() {
    assert_eq!(
        displays("run = 10 km\nrun to mi\n0.25 to %\n$60/h to min"),
        vec!["10 km", "6.21371 mi", "25%", "$1.00/min"]
    );
}
