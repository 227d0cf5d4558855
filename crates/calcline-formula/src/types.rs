//! Static type resolution
//!
//! Checks operator/operand compatibility against a declarative table before
//! anything is evaluated, so evaluation never starts on an expression whose
//! shape is already known to fail.

use crate::ast::{Component, ConversionTarget, Operator};
use crate::evaluator::is_constant;
use crate::functions::get_function_registry;
use crate::postfix::{to_postfix, PostfixItem, UnaryOperator};
use ahash::AHashMap;
use calcline_core::{ArithmeticOptions, Error, Result, SemanticValue, TypeTag};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};

/// How references to undefined variables are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// An undefined variable is an error
    Strict,
    /// Any reference to an undefined (or still symbolic) variable makes the whole
    /// expression provisionally valid without a concrete type. Type errors
    /// elsewhere in the same expression are not reported in this mode.
    #[default]
    AllowUnknownVariables,
}

/// Current type of each variable in scope
pub trait TypeEnvironment {
    fn type_of(&self, name: &str) -> Option<TypeTag>;
}

impl<S: std::hash::BuildHasher> TypeEnvironment for HashMap<String, TypeTag, S> {
    fn type_of(&self, name: &str) -> Option<TypeTag> {
        self.get(name).copied()
    }
}

impl TypeEnvironment for AHashMap<String, TypeTag> {
    fn type_of(&self, name: &str) -> Option<TypeTag> {
        self.get(name).copied()
    }
}

impl TypeEnvironment for BTreeMap<String, TypeTag> {
    fn type_of(&self, name: &str) -> Option<TypeTag> {
        self.get(name).copied()
    }
}

/// Values in scope, typed by their current kind
impl TypeEnvironment for AHashMap<String, SemanticValue> {
    fn type_of(&self, name: &str) -> Option<TypeTag> {
        self.get(name).map(SemanticValue::type_tag)
    }
}

const ALL_TAGS: [TypeTag; 9] = [
    TypeTag::Number,
    TypeTag::Percentage,
    TypeTag::Currency,
    TypeTag::Unit,
    TypeTag::CurrencyUnit,
    TypeTag::Date,
    TypeTag::Duration,
    TypeTag::Symbolic,
    TypeTag::Error,
];

/// Small set of type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct TypeSet(u16);

impl TypeSet {
    fn bit(tag: TypeTag) -> u16 {
        let index = ALL_TAGS.iter().position(|t| *t == tag).unwrap_or(0);
        1 << index
    }

    fn of(tags: &[TypeTag]) -> Self {
        let mut set = TypeSet::default();
        for &tag in tags {
            set.insert(tag);
        }
        set
    }

    fn insert(&mut self, tag: TypeTag) {
        self.0 |= Self::bit(tag);
    }

    fn union(self, other: TypeSet) -> TypeSet {
        TypeSet(self.0 | other.0)
    }

    fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn iter(self) -> impl Iterator<Item = TypeTag> {
        ALL_TAGS
            .into_iter()
            .filter(move |tag| self.0 & Self::bit(*tag) != 0)
    }
}

/// A table entry or an intermediate result.
///
/// `primary` is the kind an operation usually produces; `possible` also holds
/// the kinds it produces when units cancel (`3 m * 2 /m` is a Number).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Resolved {
    primary: TypeTag,
    possible: TypeSet,
}

impl Resolved {
    fn exact(tag: TypeTag) -> Self {
        Self {
            primary: tag,
            possible: TypeSet::of(&[tag]),
        }
    }

    fn either(primary: TypeTag, also: TypeTag) -> Self {
        Self {
            primary,
            possible: TypeSet::of(&[primary, also]),
        }
    }
}

type Key = (TypeTag, TypeTag, Operator);

/// `(left, right, operator) -> result` compatibility table
static COMPATIBILITY: Lazy<AHashMap<Key, Resolved>> = Lazy::new(|| {
    use Operator::*;
    use TypeTag::*;

    let mut table = AHashMap::new();
    let mut add = |left: TypeTag, right: TypeTag, ops: &[Operator], result: Resolved| {
        for &op in ops {
            table.insert((left, right, op), result);
        }
    };
    let exact = Resolved::exact;
    let unit_or_number = Resolved::either(Unit, Number);
    let rate_or_money = Resolved::either(CurrencyUnit, Currency);
    let additive = &[Add, Subtract][..];

    // Addition and subtraction
    add(Number, Number, additive, exact(Number));
    add(Percentage, Percentage, additive, exact(Percentage));
    for kind in [Number, Currency, Unit, CurrencyUnit] {
        add(kind, Percentage, additive, exact(kind));
    }
    add(Currency, Currency, additive, exact(Currency));
    add(Currency, Number, additive, exact(Currency));
    add(Number, Currency, additive, exact(Currency));
    add(Unit, Unit, additive, exact(Unit));
    add(CurrencyUnit, CurrencyUnit, additive, exact(CurrencyUnit));
    add(Date, Duration, additive, exact(Date));
    add(Date, Unit, additive, exact(Date));
    add(Duration, Date, &[Add], exact(Date));
    add(Date, Date, &[Subtract], exact(Duration));
    add(Duration, Duration, additive, exact(Duration));
    add(Duration, Unit, additive, exact(Duration));
    add(Unit, Duration, additive, exact(Unit));

    // Multiplication
    add(Number, Number, &[Multiply], exact(Number));
    add(Percentage, Percentage, &[Multiply], exact(Percentage));
    add(Number, Percentage, &[Multiply], exact(Number));
    add(Percentage, Number, &[Multiply], exact(Number));
    for kind in [Currency, Unit, CurrencyUnit, Duration] {
        add(kind, Percentage, &[Multiply], exact(kind));
        add(Percentage, kind, &[Multiply], exact(kind));
        add(kind, Number, &[Multiply], exact(kind));
        add(Number, kind, &[Multiply], exact(kind));
    }
    for (left, right) in [(Unit, Unit), (Duration, Unit), (Unit, Duration)] {
        add(left, right, &[Multiply], unit_or_number);
    }
    for (left, right) in [
        (Currency, Unit),
        (Unit, Currency),
        (CurrencyUnit, Unit),
        (Unit, CurrencyUnit),
        (Duration, Currency),
        (Currency, Duration),
        (Duration, CurrencyUnit),
        (CurrencyUnit, Duration),
    ] {
        add(left, right, &[Multiply], rate_or_money);
    }

    // Division
    add(Number, Number, &[Divide], exact(Number));
    add(Percentage, Percentage, &[Divide], exact(Number));
    add(Percentage, Number, &[Divide], exact(Percentage));
    add(Number, Percentage, &[Divide], exact(Number));
    for kind in [Currency, Unit, CurrencyUnit, Duration] {
        add(kind, Number, &[Divide], exact(kind));
        add(kind, Percentage, &[Divide], exact(kind));
    }
    add(Duration, Duration, &[Divide], exact(Number));
    for (left, right) in [
        (Number, Unit),
        (Unit, Unit),
        (Number, Duration),
        (Duration, Unit),
        (Unit, Duration),
    ] {
        add(left, right, &[Divide], unit_or_number);
    }
    for (left, right) in [
        (Currency, Unit),
        (CurrencyUnit, Unit),
        (Currency, Duration),
        (CurrencyUnit, Duration),
    ] {
        add(left, right, &[Divide], rate_or_money);
    }
    add(Currency, Currency, &[Divide], exact(Number));
    for (left, right) in [
        (Currency, CurrencyUnit),
        (CurrencyUnit, Currency),
        (CurrencyUnit, CurrencyUnit),
    ] {
        add(left, right, &[Divide], unit_or_number);
    }

    // Power
    add(Number, Number, &[Power], exact(Number));
    add(Unit, Number, &[Power], unit_or_number);

    // Percentage of
    for kind in [Number, Currency, Unit, CurrencyUnit, Duration, Percentage] {
        add(Percentage, kind, &[Of], exact(kind));
    }

    table
});

/// True when the currency codes cancel and what remains is governed by
/// [`ArithmeticOptions::dimensional_cancellation`]
fn cancels_currency(left: TypeTag, right: TypeTag, op: Operator) -> bool {
    use TypeTag::*;
    op == Operator::Divide
        && matches!(
            (left, right),
            (Currency, CurrencyUnit) | (CurrencyUnit, Currency) | (CurrencyUnit, CurrencyUnit)
        )
}

/// Usual result kind of `left op right`, or `None` when the table has no entry
pub fn binary_result(left: TypeTag, right: TypeTag, op: Operator) -> Option<TypeTag> {
    if left == TypeTag::Error || right == TypeTag::Error {
        return Some(TypeTag::Error);
    }
    COMPATIBILITY.get(&(left, right, op)).map(|entry| entry.primary)
}

fn unary_result(operand: TypeTag) -> Option<TypeTag> {
    match operand {
        TypeTag::Date | TypeTag::Symbolic => None,
        other => Some(other),
    }
}

fn conversion_result(operand: TypeTag, target: &ConversionTarget) -> Option<TypeTag> {
    use TypeTag::*;
    match (operand, target) {
        (Error, _) => Some(Error),
        (Number | Unit | Duration, ConversionTarget::Unit(_)) => Some(Unit),
        (CurrencyUnit, ConversionTarget::Unit(_)) => Some(CurrencyUnit),
        (Currency, ConversionTarget::Currency(_)) => Some(Currency),
        (CurrencyUnit, ConversionTarget::Currency(_)) => Some(CurrencyUnit),
        (Number | Percentage, ConversionTarget::Percent) => Some(Percentage),
        _ => None,
    }
}

/// Resolves the result type of component trees
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeResolver {
    pub mode: ResolveMode,
    pub arithmetic: ArithmeticOptions,
}

impl TypeResolver {
    /// Create a resolver
    pub fn new(mode: ResolveMode, arithmetic: ArithmeticOptions) -> Self {
        Self { mode, arithmetic }
    }

    /// Resolve the result type.
    ///
    /// `Ok(None)` means the expression references an undefined variable and the
    /// resolver runs in [`ResolveMode::AllowUnknownVariables`].
    pub fn resolve(
        &self,
        components: &[Component],
        env: &dyn TypeEnvironment,
    ) -> Result<Option<TypeTag>> {
        if self.mode == ResolveMode::AllowUnknownVariables && references_unknown(components, env)
        {
            return Ok(None);
        }
        self.resolve_components(components, env)
            .map(|resolved| Some(resolved.primary))
    }

    fn resolve_components(
        &self,
        components: &[Component],
        env: &dyn TypeEnvironment,
    ) -> Result<Resolved> {
        if let [single] = components {
            return self.resolve_operand(single, env);
        }

        let mut stack: Vec<Resolved> = Vec::new();
        for item in to_postfix(components)? {
            let resolved = match item {
                PostfixItem::Operand(component) => self.resolve_operand(component, env)?,
                PostfixItem::Binary(op) => {
                    let right = pop(&mut stack)?;
                    let left = pop(&mut stack)?;
                    self.binary(left, right, op)?
                }
                PostfixItem::Unary(op) => {
                    let operand = pop(&mut stack)?;
                    let symbol = match op {
                        UnaryOperator::Plus => "+",
                        UnaryOperator::Minus => "-",
                    };
                    map_possible(operand, unary_result)
                        .ok_or_else(|| Error::unsupported(symbol, operand.primary))?
                }
                PostfixItem::Convert(target) => {
                    let operand = pop(&mut stack)?;
                    map_possible(operand, |tag| conversion_result(tag, target)).ok_or_else(
                        || Error::unsupported(&format!("to {target}"), operand.primary),
                    )?
                }
            };
            stack.push(resolved);
        }
        pop(&mut stack)
    }

    fn binary(&self, left: Resolved, right: Resolved, op: Operator) -> Result<Resolved> {
        if left.primary == TypeTag::Error || right.primary == TypeTag::Error {
            return Ok(Resolved::exact(TypeTag::Error));
        }

        let lookup = |l: TypeTag, r: TypeTag| -> Option<Resolved> {
            let entry = *COMPATIBILITY.get(&(l, r, op))?;
            if cancels_currency(l, r, op) && !self.arithmetic.dimensional_cancellation {
                Some(Resolved::exact(TypeTag::Number))
            } else {
                Some(entry)
            }
        };

        let mut primary = lookup(left.primary, right.primary).map(|entry| entry.primary);
        let mut possible = TypeSet::default();
        for l in left.possible.iter() {
            for r in right.possible.iter() {
                if let Some(entry) = lookup(l, r) {
                    primary.get_or_insert(entry.primary);
                    possible = possible.union(entry.possible);
                }
            }
        }

        match primary {
            Some(primary) => Ok(Resolved { primary, possible }),
            None => Err(Error::incompatible(
                &op.to_string(),
                left.primary,
                right.primary,
            )),
        }
    }

    fn resolve_operand(
        &self,
        component: &Component,
        env: &dyn TypeEnvironment,
    ) -> Result<Resolved> {
        match component {
            Component::Literal { value, .. } => Ok(Resolved::exact(value.type_tag())),
            Component::Variable(name) => match env.type_of(name) {
                Some(TypeTag::Symbolic) => Err(Error::UndefinedVariable(name.clone())),
                Some(tag) => Ok(Resolved::exact(tag)),
                None if is_constant(name) => Ok(Resolved::exact(TypeTag::Number)),
                None => Err(Error::UndefinedVariable(name.clone())),
            },
            Component::Function { name, args } => {
                let def = get_function_registry()
                    .get(name)
                    .ok_or_else(|| Error::semantic(format!("unknown function '{name}'")))?;
                def.check_arguments(args)?;
                let mut result = Resolved::exact(def.return_type);
                for arg in args {
                    if self.resolve_components(&arg.components, env)?.primary == TypeTag::Error {
                        result = Resolved::exact(TypeTag::Error);
                    }
                }
                Ok(result)
            }
            Component::Group(children) => self.resolve_components(children, env),
            Component::Operator(op) => Err(Error::semantic(format!(
                "operator '{op}' cannot stand alone"
            ))),
            Component::Conversion(target) => Err(Error::semantic(format!(
                "conversion to {target} has nothing to convert"
            ))),
        }
    }
}

/// Apply a single-operand rule to every possible kind
fn map_possible(
    operand: Resolved,
    rule: impl Fn(TypeTag) -> Option<TypeTag>,
) -> Option<Resolved> {
    let mut possible = TypeSet::default();
    for tag in operand.possible.iter() {
        if let Some(result) = rule(tag) {
            possible.insert(result);
        }
    }
    if possible.is_empty() {
        return None;
    }
    let primary = rule(operand.primary).or_else(|| possible.iter().next())?;
    Some(Resolved { primary, possible })
}

fn pop(stack: &mut Vec<Resolved>) -> Result<Resolved> {
    stack
        .pop()
        .ok_or_else(|| Error::semantic("invalid expression shape"))
}

/// True if any variable in `components` has no concrete type in `env`
fn references_unknown(components: &[Component], env: &dyn TypeEnvironment) -> bool {
    components.iter().any(|component| match component {
        Component::Variable(name) => match env.type_of(name) {
            Some(tag) => tag == TypeTag::Symbolic,
            None => !is_constant(name),
        },
        Component::Function { args, .. } => args
            .iter()
            .any(|arg| references_unknown(&arg.components, env)),
        Component::Group(children) => references_unknown(children, env),
        _ => false,
    })
}

/// Resolve with default arithmetic options
pub fn resolve_type(
    components: &[Component],
    env: &dyn TypeEnvironment,
    mode: ResolveMode,
) -> Result<Option<TypeTag>> {
    TypeResolver::new(mode, ArithmeticOptions::default()).resolve(components, env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;
    use pretty_assertions::assert_eq;

    fn resolve(
        text: &str,
        env: &AHashMap<String, TypeTag>,
        mode: ResolveMode,
    ) -> Result<Option<TypeTag>> {
        resolve_type(&parse_expression(text).unwrap(), env, mode)
    }

    fn strict(text: &str) -> Result<Option<TypeTag>> {
        resolve(text, &AHashMap::new(), ResolveMode::Strict)
    }

    #[test]
    fn test_singleton_literal_types() {
        assert_eq!(strict("42").unwrap(), Some(TypeTag::Number));
        assert_eq!(strict("5%").unwrap(), Some(TypeTag::Percentage));
        assert_eq!(strict("$5").unwrap(), Some(TypeTag::Currency));
        assert_eq!(strict("5 km").unwrap(), Some(TypeTag::Unit));
        assert_eq!(strict("$5/h").unwrap(), Some(TypeTag::CurrencyUnit));
        assert_eq!(strict("2024-01-01").unwrap(), Some(TypeTag::Date));
    }

    #[test]
    fn test_binary_resolution() {
        assert_eq!(strict("2km + 300m").unwrap(), Some(TypeTag::Unit));
        assert_eq!(strict("10% of 155N").unwrap(), Some(TypeTag::Unit));
        assert_eq!(strict("23 * PI").unwrap(), Some(TypeTag::Number));
        assert_eq!(strict("$500 / $0.15/h").unwrap(), Some(TypeTag::Unit));
        assert_eq!(strict("(1 + 2) * 3 km").unwrap(), Some(TypeTag::Unit));
        assert_eq!(strict("sqrt(16) + 1").unwrap(), Some(TypeTag::Number));
        assert_eq!(strict("-5 km").unwrap(), Some(TypeTag::Unit));
    }

    #[test]
    fn test_cancelling_units_stay_valid() {
        // $50/h * 3 h is money at runtime, so adding money must type-check
        assert_eq!(strict("$50/h * 3 h + $5").unwrap(), Some(TypeTag::Currency));
        assert_eq!(strict("6 m / 2 m + 1").unwrap(), Some(TypeTag::Number));
    }

    #[test]
    fn test_cancellation_setting() {
        let resolver = TypeResolver::new(
            ResolveMode::Strict,
            ArithmeticOptions {
                dimensional_cancellation: false,
            },
        );
        let components = parse_expression("$500 / $0.15/h").unwrap();
        let env: AHashMap<String, TypeTag> = AHashMap::new();
        assert_eq!(
            resolver.resolve(&components, &env).unwrap(),
            Some(TypeTag::Number)
        );
    }

    #[test]
    fn test_mismatch_names_both_types() {
        let err = strict("$5 + 3 km").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type error: cannot apply '+' to Currency and Unit"
        );
        assert!(matches!(strict("$5 * $3"), Err(Error::Type(_))));
        assert!(matches!(strict("2024-01-01 * 2"), Err(Error::Type(_))));
    }

    #[test]
    fn test_variables() {
        let mut env = AHashMap::new();
        env.insert("price".to_string(), TypeTag::Currency);
        assert_eq!(
            resolve("price * 3", &env, ResolveMode::Strict).unwrap(),
            Some(TypeTag::Currency)
        );
        assert!(matches!(
            resolve("price * later", &env, ResolveMode::Strict),
            Err(Error::UndefinedVariable(_))
        ));

        env.insert("pi".to_string(), TypeTag::Currency);
        assert_eq!(
            resolve("pi + $1", &env, ResolveMode::Strict).unwrap(),
            Some(TypeTag::Currency)
        );
    }

    #[test]
    fn test_allow_unknown_variables_masks_errors() {
        let env = AHashMap::new();
        assert_eq!(
            resolve("later + 1", &env, ResolveMode::AllowUnknownVariables).unwrap(),
            None
        );
        assert_eq!(
            resolve("$5 + 3 km + later", &env, ResolveMode::AllowUnknownVariables).unwrap(),
            None
        );
        assert!(resolve("$5 + 3 km", &env, ResolveMode::AllowUnknownVariables).is_err());
    }

    #[test]
    fn test_functions() {
        assert!(matches!(strict("frobnicate(1)"), Err(Error::Semantic(_))));
        assert!(matches!(strict("sqrt(1, 2)"), Err(Error::Semantic(_))));
        assert_eq!(
            strict("ROUND(2.5, digits: 1)").unwrap(),
            Some(TypeTag::Number)
        );
    }

    #[test]
    fn test_conversion_types() {
        assert_eq!(strict("10 km to mi").unwrap(), Some(TypeTag::Unit));
        assert_eq!(strict("0.5 to %").unwrap(), Some(TypeTag::Percentage));
        assert!(matches!(strict("$5 to km"), Err(Error::Type(_))));
    }
}
