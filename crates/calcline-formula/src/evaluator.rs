//! Component tree evaluator

use crate::ast::{Component, ConversionTarget, Operator};
use crate::functions::get_function_registry;
use crate::parser::parse_expression;
use crate::postfix::{to_postfix, PostfixItem, UnaryOperator};
use crate::types::binary_result;
use ahash::AHashMap;
use calcline_core::{
    ArithmeticOptions, Error, FxRatesSnapshot, FxResolver, ManualRates, Result, SemanticValue,
};
use once_cell::sync::Lazy;
use std::f64::consts;

/// Golden ratio
const PHI: f64 = 1.618_033_988_749_895;

/// Built-in constants; a variable of the same name shadows them
const CONSTANTS: &[(&str, f64)] = &[
    ("PI", consts::PI),
    ("pi", consts::PI),
    ("E", consts::E),
    ("e", consts::E),
    ("TAU", consts::TAU),
    ("tau", consts::TAU),
    ("PHI", PHI),
    ("phi", PHI),
];

/// Value of a built-in constant
pub fn constant(name: &str) -> Option<f64> {
    CONSTANTS
        .iter()
        .find(|(constant, _)| *constant == name)
        .map(|(_, value)| *value)
}

/// True if `name` is a built-in constant
pub fn is_constant(name: &str) -> bool {
    constant(name).is_some()
}

static NO_VARIABLES: Lazy<AHashMap<String, SemanticValue>> = Lazy::new(AHashMap::new);

/// Context for expression evaluation
pub struct EvaluationContext<'a> {
    /// Variables in scope
    pub variables: &'a AHashMap<String, SemanticValue>,
    /// Exchange rates declared by variables named after a currency code
    pub manual_rates: ManualRates,
    /// Host-supplied exchange rates
    pub fx_snapshot: Option<&'a FxRatesSnapshot>,
    pub arithmetic: ArithmeticOptions,
}

impl<'a> EvaluationContext<'a> {
    /// Create a new evaluation context
    pub fn new(
        variables: &'a AHashMap<String, SemanticValue>,
        fx_snapshot: Option<&'a FxRatesSnapshot>,
        arithmetic: ArithmeticOptions,
    ) -> Self {
        let manual_rates =
            ManualRates::from_variables(variables.iter().map(|(name, value)| (name.as_str(), value)));
        Self {
            variables,
            manual_rates,
            fx_snapshot,
            arithmetic,
        }
    }

    /// Create a context with no variables and no exchange rates
    pub fn simple() -> EvaluationContext<'static> {
        EvaluationContext::new(&NO_VARIABLES, None, ArithmeticOptions::default())
    }

    /// Value bound to `name`: a variable, then a constant
    pub fn lookup(&self, name: &str) -> Result<SemanticValue> {
        match self.variables.get(name) {
            Some(SemanticValue::Symbolic(_)) => Err(Error::UndefinedVariable(name.to_string())),
            Some(SemanticValue::Error(e)) => Err(e.clone()),
            Some(value) => Ok(value.clone()),
            None => constant(name)
                .map(SemanticValue::Number)
                .ok_or_else(|| Error::UndefinedVariable(name.to_string())),
        }
    }

    /// Exchange-rate resolver over this context's rates
    pub fn fx(&self) -> FxResolver<'_> {
        FxResolver::new(&self.manual_rates, self.fx_snapshot)
    }
}

/// Evaluate a component tree
pub fn evaluate(components: &[Component], ctx: &EvaluationContext) -> Result<SemanticValue> {
    if let [single] = components {
        return evaluate_operand(single, ctx);
    }

    let mut stack: Vec<SemanticValue> = Vec::new();
    for item in to_postfix(components)? {
        let value = match item {
            PostfixItem::Operand(component) => evaluate_operand(component, ctx)?,
            PostfixItem::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                evaluate_binary(&left, op, &right, ctx)?
            }
            PostfixItem::Unary(UnaryOperator::Minus) => pop(&mut stack)?.negate()?,
            PostfixItem::Unary(UnaryOperator::Plus) => {
                let value = pop(&mut stack)?;
                if matches!(value, SemanticValue::Date(_) | SemanticValue::Symbolic(_)) {
                    return Err(Error::unsupported("+", value.type_tag()));
                }
                value
            }
            PostfixItem::Convert(target) => evaluate_conversion(&pop(&mut stack)?, target, ctx)?,
        };
        stack.push(value);
    }
    pop(&mut stack)
}

/// Parse and evaluate `text`
pub fn evaluate_expression(text: &str, ctx: &EvaluationContext) -> Result<SemanticValue> {
    let components = parse_expression(text)?;
    evaluate(&components, ctx)
}

fn pop(stack: &mut Vec<SemanticValue>) -> Result<SemanticValue> {
    stack
        .pop()
        .ok_or_else(|| Error::semantic("invalid expression shape"))
}

/// Apply a binary operator, first bringing a second currency into the left
/// operand's code
fn evaluate_binary(
    left: &SemanticValue,
    op: Operator,
    right: &SemanticValue,
    ctx: &EvaluationContext,
) -> Result<SemanticValue> {
    if let (Some(left_code), Some(right_code)) = (left.currency_code(), right.currency_code()) {
        if left_code != right_code
            && binary_result(left.type_tag(), right.type_tag(), op).is_some()
        {
            let converted = ctx.fx().convert(right, left_code)?;
            return left.apply(op.binary_op(), &converted, &ctx.arithmetic);
        }
    }
    left.apply(op.binary_op(), right, &ctx.arithmetic)
}

fn evaluate_conversion(
    value: &SemanticValue,
    target: &ConversionTarget,
    ctx: &EvaluationContext,
) -> Result<SemanticValue> {
    match target {
        ConversionTarget::Unit(unit) => value.convert_to_unit(unit),
        ConversionTarget::Currency(code) => ctx.fx().convert(value, code),
        ConversionTarget::Percent => value.to_percentage(),
    }
}

fn evaluate_operand(component: &Component, ctx: &EvaluationContext) -> Result<SemanticValue> {
    match component {
        Component::Literal { value, .. } => Ok(value.clone()),
        Component::Variable(name) => ctx.lookup(name),
        Component::Function { name, args } => evaluate_function(name, args, ctx),
        Component::Group(children) => evaluate(children, ctx),
        Component::Operator(op) => Err(Error::semantic(format!(
            "operator '{op}' cannot stand alone"
        ))),
        Component::Conversion(target) => Err(Error::semantic(format!(
            "conversion to {target} has nothing to convert"
        ))),
    }
}

/// Evaluate a function call
fn evaluate_function(
    name: &str,
    args: &[crate::ast::Argument],
    ctx: &EvaluationContext,
) -> Result<SemanticValue> {
    let registry = get_function_registry();

    let func = registry
        .get(name)
        .ok_or_else(|| Error::semantic(format!("unknown function '{name}'")))?;

    let names: Vec<Option<&str>> = args.iter().map(|arg| arg.name.as_deref()).collect();
    let slots = func.bind(&names)?;

    // Evaluate arguments into parameter order
    let mut ordered: Vec<Option<SemanticValue>> = vec![None; args.len()];
    for (arg, slot) in args.iter().zip(slots) {
        ordered[slot] = Some(evaluate(&arg.components, ctx)?);
    }
    let evaluated: Vec<SemanticValue> = ordered.into_iter().flatten().collect();

    // Call the function
    (func.implementation)(&evaluated, ctx)
}
