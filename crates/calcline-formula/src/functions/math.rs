//! Math functions
//!
//! Arguments are coerced to plain numbers through
//! [`SemanticValue::numeric_value`], so `sqrt(16 m)` is `4` and `round(12.5%)`
//! works on `0.125`.

use crate::evaluator::EvaluationContext;
use calcline_core::{Error, Result, SemanticValue};

fn number(value: &SemanticValue) -> Result<f64> {
    match value {
        SemanticValue::Error(e) => Err(e.clone()),
        SemanticValue::Symbolic(text) => Err(Error::UndefinedVariable(text.clone())),
        other => other.numeric_value().ok_or_else(|| {
            Error::Type(format!("expected a number, found {}", other.type_tag()))
        }),
    }
}

fn numbers(args: &[SemanticValue]) -> Result<Vec<f64>> {
    args.iter().map(number).collect()
}

fn result(name: &str, value: f64) -> Result<SemanticValue> {
    if value.is_finite() {
        Ok(SemanticValue::Number(value))
    } else {
        Err(Error::Runtime(format!("{name}: result is not a finite number")))
    }
}

fn unary(name: &str, args: &[SemanticValue], f: fn(f64) -> f64) -> Result<SemanticValue> {
    let x = args
        .first()
        .ok_or_else(|| Error::semantic(format!("{name} expects 1 argument")))?;
    result(name, f(number(x)?))
}

/// SQRT function
pub fn fn_sqrt(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    unary("sqrt", args, f64::sqrt)
}

/// CBRT function
pub fn fn_cbrt(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    unary("cbrt", args, f64::cbrt)
}

/// ABS function
pub fn fn_abs(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    unary("abs", args, f64::abs)
}

/// FLOOR function
pub fn fn_floor(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    unary("floor", args, f64::floor)
}

/// CEIL function
pub fn fn_ceil(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    unary("ceil", args, f64::ceil)
}

/// TRUNC function
pub fn fn_trunc(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    unary("trunc", args, f64::trunc)
}

/// LN function
pub fn fn_ln(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    unary("ln", args, f64::ln)
}

/// EXP function
pub fn fn_exp(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    unary("exp", args, f64::exp)
}

pub fn fn_sin(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    unary("sin", args, f64::sin)
}

pub fn fn_cos(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    unary("cos", args, f64::cos)
}

pub fn fn_tan(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    unary("tan", args, f64::tan)
}

pub fn fn_asin(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    unary("asin", args, f64::asin)
}

pub fn fn_acos(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    unary("acos", args, f64::acos)
}

pub fn fn_atan(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    unary("atan", args, f64::atan)
}

/// ROUND function: `round(x, digits: 0)`, half away from zero
pub fn fn_round(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    let values = numbers(args)?;
    let x = values.first().copied().unwrap_or(0.0);
    let digits = values.get(1).copied().unwrap_or(0.0).trunc();
    if digits.abs() > 15.0 {
        return Err(Error::Runtime(format!(
            "round: digits must be between -15 and 15, got {digits}"
        )));
    }
    let factor = 10f64.powi(digits as i32);
    result("round", (x * factor).round() / factor)
}

/// LOG function: `log(x, base: 10)`
pub fn fn_log(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    let values = numbers(args)?;
    let x = values.first().copied().unwrap_or(0.0);
    let base = values.get(1).copied().unwrap_or(10.0);
    if base <= 0.0 || base == 1.0 {
        return Err(Error::Runtime(format!("log: invalid base {base}")));
    }
    result("log", x.log(base))
}

/// SUM function
pub fn fn_sum(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    result("sum", numbers(args)?.into_iter().sum())
}

/// AVERAGE function
pub fn fn_average(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    let values = numbers(args)?;
    if values.is_empty() {
        return Err(Error::DivisionByZero);
    }
    let count = values.len() as f64;
    result("average", values.into_iter().sum::<f64>() / count)
}

/// MIN function
pub fn fn_min(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    let min = numbers(args)?.into_iter().fold(f64::INFINITY, f64::min);
    result("min", min)
}

/// MAX function
pub fn fn_max(args: &[SemanticValue], _ctx: &EvaluationContext) -> Result<SemanticValue> {
    let max = numbers(args)?.into_iter().fold(f64::NEG_INFINITY, f64::max);
    result("max", max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcline_core::CompositeUnit;

    fn n(value: f64) -> SemanticValue {
        SemanticValue::Number(value)
    }

    fn call(f: crate::functions::FunctionImpl, args: &[SemanticValue]) -> Result<SemanticValue> {
        f(args, &EvaluationContext::simple())
    }

    fn num(value: Result<SemanticValue>) -> f64 {
        value.unwrap().numeric_value().unwrap()
    }

    #[test]
    fn test_sqrt_and_cbrt() {
        assert_eq!(num(call(fn_sqrt, &[n(16.0)])), 4.0);
        assert!((num(call(fn_cbrt, &[n(27.0)])) - 3.0).abs() < 1e-12);
        assert!(matches!(call(fn_sqrt, &[n(-1.0)]), Err(Error::Runtime(_))));
    }

    #[test]
    fn test_coerces_semantic_values() {
        let metres = SemanticValue::quantity(16.0, CompositeUnit::single("m").unwrap());
        assert_eq!(num(call(fn_sqrt, &[metres])), 4.0);
        assert_eq!(num(call(fn_abs, &[SemanticValue::currency("USD", -3.5)])), 3.5);
        assert_eq!(num(call(fn_sum, &[SemanticValue::Percentage(50.0), n(1.0)])), 1.5);
    }

    #[test]
    fn test_round() {
        assert_eq!(num(call(fn_round, &[n(2.5)])), 3.0);
        assert_eq!(num(call(fn_round, &[n(-2.5)])), -3.0);
        assert_eq!(num(call(fn_round, &[n(3.14159), n(2.0)])), 3.14);
        assert_eq!(num(call(fn_round, &[n(1234.0), n(-2.0)])), 1200.0);
    }

    #[test]
    fn test_log() {
        assert!((num(call(fn_log, &[n(1000.0)])) - 3.0).abs() < 1e-12);
        assert!((num(call(fn_log, &[n(8.0), n(2.0)])) - 3.0).abs() < 1e-12);
        assert!(call(fn_log, &[n(8.0), n(1.0)]).is_err());
        assert!(call(fn_ln, &[n(0.0)]).is_err());
    }

    #[test]
    fn test_aggregates() {
        let args = [n(3.0), n(1.0), n(2.0)];
        assert_eq!(num(call(fn_sum, &args)), 6.0);
        assert_eq!(num(call(fn_average, &args)), 2.0);
        assert_eq!(num(call(fn_min, &args)), 1.0);
        assert_eq!(num(call(fn_max, &args)), 3.0);
    }

    #[test]
    fn test_error_arguments_propagate() {
        let err = SemanticValue::Error(Error::DivisionByZero);
        assert_eq!(call(fn_sum, &[n(1.0), err]), Err(Error::DivisionByZero));
    }
}
