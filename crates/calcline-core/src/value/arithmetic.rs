//! Kind-specific arithmetic on semantic values

use super::SemanticValue;
use crate::error::{Error, Result};
use crate::unit::{convert_amount, BaseDimension, CompositeUnit, Dimension, MAX_UNIT_POWER};
use chrono::{Months, NaiveDate};

/// Binary operators understood by the value system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    /// `P of X`
    Of,
}

impl BinaryOp {
    /// Source symbol of the operator
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Power => "^",
            BinaryOp::Of => "of",
        }
    }
}

/// Arithmetic behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArithmeticOptions {
    /// Same-code `Currency / Currency-Unit` keeps the leftover unit as a quantity
    /// (`$500 / $0.15/h` is `3333.33 h`) instead of collapsing to a plain number
    pub dimensional_cancellation: bool,
}

impl Default for ArithmeticOptions {
    fn default() -> Self {
        Self {
            dimensional_cancellation: true,
        }
    }
}

fn finite(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::Runtime("result is not a finite number".into()))
    }
}

fn seconds(duration: &chrono::Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}

fn duration_from_seconds(secs: f64) -> Result<chrono::Duration> {
    let ms = finite(secs * 1000.0)?.round();
    if ms.abs() > i64::MAX as f64 / 2.0 {
        return Err(Error::Runtime("duration out of range".into()));
    }
    Ok(chrono::Duration::milliseconds(ms as i64))
}

fn time_dimension() -> Dimension {
    Dimension::base(BaseDimension::Time)
}

fn second_unit() -> Result<CompositeUnit> {
    CompositeUnit::single("s")
}

fn check_codes(op: BinaryOp, left: &str, right: &str) -> Result<()> {
    if left == right {
        Ok(())
    } else {
        Err(Error::conversion(format!(
            "cannot apply '{}' to {left} and {right} without an exchange rate",
            op.symbol()
        )))
    }
}

/// Result of combining two units: a reduced unit and the amount in it.
///
/// An empty unit means every dimension cancelled.
fn combine_units(amount: f64, unit: &CompositeUnit) -> Result<(f64, CompositeUnit)> {
    let (scale, reduced) = unit.reduce()?;
    if !reduced.is_empty() && reduced.is_dimensionless() {
        return Ok((amount * scale * reduced.base_factor(), CompositeUnit::new()));
    }
    Ok((amount * scale, reduced))
}

fn quantity_or_number(amount: f64, unit: CompositeUnit) -> Result<SemanticValue> {
    let (amount, unit) = combine_units(amount, &unit)?;
    let amount = finite(amount)?;
    if unit.is_empty() {
        Ok(SemanticValue::Number(amount))
    } else {
        Ok(SemanticValue::Quantity { amount, unit })
    }
}

fn money_or_rate(code: &str, amount: f64, unit: CompositeUnit) -> Result<SemanticValue> {
    let (amount, unit) = combine_units(amount, &unit)?;
    let amount = finite(amount)?;
    if unit.is_empty() {
        Ok(SemanticValue::currency(code, amount))
    } else {
        Ok(SemanticValue::CurrencyUnit {
            code: code.to_string(),
            amount,
            unit,
        })
    }
}

fn add_calendar(date: NaiveDate, amount: f64, unit: &CompositeUnit) -> Result<NaiveDate> {
    let out_of_range = || Error::Runtime("date out of range".into());
    if let Some(def) = unit.as_single() {
        let months = match def.symbol {
            "month" => Some(amount),
            "year" => Some(amount * 12.0),
            _ => None,
        };
        if let Some(months) = months.filter(|m| m.fract() == 0.0 && m.abs() < u32::MAX as f64) {
            let count = Months::new(months.abs() as u32);
            return if months >= 0.0 {
                date.checked_add_months(count)
            } else {
                date.checked_sub_months(count)
            }
            .ok_or_else(out_of_range);
        }
    }
    let secs = amount * unit.base_factor();
    date.checked_add_signed(duration_from_seconds(secs)?)
        .ok_or_else(out_of_range)
}

impl SemanticValue {
    /// Apply a binary operator
    pub fn apply(
        &self,
        op: BinaryOp,
        rhs: &SemanticValue,
        options: &ArithmeticOptions,
    ) -> Result<SemanticValue> {
        match op {
            BinaryOp::Add => self.add(rhs),
            BinaryOp::Subtract => self.subtract(rhs),
            BinaryOp::Multiply => self.multiply(rhs),
            BinaryOp::Divide => self.divide(rhs, options),
            BinaryOp::Power => self.power(rhs),
            BinaryOp::Of => self.percent_of(rhs),
        }
    }

    /// `self + rhs`
    pub fn add(&self, rhs: &SemanticValue) -> Result<SemanticValue> {
        self.additive(rhs, BinaryOp::Add)
    }

    /// `self - rhs`
    pub fn subtract(&self, rhs: &SemanticValue) -> Result<SemanticValue> {
        use SemanticValue::*;
        match (self, rhs) {
            (Date(a), Date(b)) => Ok(Duration(a.signed_duration_since(*b))),
            _ => self.additive(rhs, BinaryOp::Subtract),
        }
    }

    fn additive(&self, rhs: &SemanticValue, op: BinaryOp) -> Result<SemanticValue> {
        use SemanticValue::*;
        let sign = if op == BinaryOp::Subtract { -1.0 } else { 1.0 };
        let incompatible =
            || crate::Error::incompatible(op.symbol(), self.type_tag(), rhs.type_tag());

        match (self, rhs) {
            (Error(e), _) | (_, Error(e)) => Err(e.clone()),
            (Number(a), Number(b)) => Ok(Number(finite(a + sign * b)?)),
            (Percentage(a), Percentage(b)) => Ok(Percentage(finite(a + sign * b)?)),
            (Number(_) | Currency { .. } | Quantity { .. } | CurrencyUnit { .. }, Percentage(p)) => {
                self.scale(1.0 + sign * p / 100.0)
            }
            (Currency { code, amount }, Currency { code: other, amount: b }) => {
                check_codes(op, code, other)?;
                Ok(SemanticValue::currency(code.clone(), finite(amount + sign * b)?))
            }
            (Currency { code, amount }, Number(b)) => {
                Ok(SemanticValue::currency(code.clone(), finite(amount + sign * b)?))
            }
            (Number(a), Currency { code, amount }) => {
                Ok(SemanticValue::currency(code.clone(), finite(a + sign * amount)?))
            }
            (Quantity { amount, unit }, Quantity { amount: b, unit: other }) => {
                let b = convert_amount(*b, other, unit)?;
                Ok(Quantity {
                    amount: finite(amount + sign * b)?,
                    unit: unit.clone(),
                })
            }
            (
                CurrencyUnit { code, amount, unit },
                CurrencyUnit {
                    code: other_code,
                    amount: b,
                    unit: other,
                },
            ) => {
                check_codes(op, code, other_code)?;
                if unit.dimension() != other.dimension() {
                    return Err(crate::Error::conversion(format!(
                        "cannot convert {other} to {unit}: incompatible dimensions"
                    )));
                }
                let b = b * other.base_factor() / unit.base_factor();
                Ok(CurrencyUnit {
                    code: code.clone(),
                    amount: finite(amount + sign * b)?,
                    unit: unit.clone(),
                })
            }
            (Date(date), Duration(d)) => date
                .checked_add_signed(if sign < 0.0 { -*d } else { *d })
                .map(Date)
                .ok_or_else(|| crate::Error::Runtime("date out of range".into())),
            (Duration(d), Date(date)) if sign > 0.0 => date
                .checked_add_signed(*d)
                .map(Date)
                .ok_or_else(|| crate::Error::Runtime("date out of range".into())),
            (Date(date), Quantity { amount, unit }) if unit.dimension() == time_dimension() => {
                add_calendar(*date, sign * amount, unit).map(Date)
            }
            (Duration(a), Duration(b)) => {
                duration_from_seconds(seconds(a) + sign * seconds(b)).map(Duration)
            }
            (Duration(d), Quantity { amount, unit }) if unit.dimension() == time_dimension() => {
                duration_from_seconds(seconds(d) + sign * amount * unit.base_factor()).map(Duration)
            }
            (Quantity { amount, unit }, Duration(d)) if unit.dimension() == time_dimension() => {
                let b = seconds(d) / unit.base_factor();
                Ok(Quantity {
                    amount: finite(amount + sign * b)?,
                    unit: unit.clone(),
                })
            }
            _ => Err(incompatible()),
        }
    }

    /// `self * rhs`
    pub fn multiply(&self, rhs: &SemanticValue) -> Result<SemanticValue> {
        use SemanticValue::*;
        let incompatible = || crate::Error::incompatible("*", self.type_tag(), rhs.type_tag());

        match (self, rhs) {
            (Error(e), _) | (_, Error(e)) => Err(e.clone()),
            (Date(_) | Symbolic(_), _) | (_, Date(_) | Symbolic(_)) => Err(incompatible()),
            (Number(a), Number(b)) => Ok(Number(finite(a * b)?)),
            (Percentage(a), Percentage(b)) => Ok(Percentage(finite(a * b / 100.0)?)),
            (Number(a), Percentage(p)) | (Percentage(p), Number(a)) => {
                Ok(Number(finite(a * p / 100.0)?))
            }
            (x, Percentage(p)) | (Percentage(p), x) => x.scale(p / 100.0),
            (x, Number(n)) | (Number(n), x) => x.scale(*n),
            (Duration(d), other @ (Quantity { .. } | Currency { .. } | CurrencyUnit { .. }))
            | (other @ (Quantity { .. } | Currency { .. } | CurrencyUnit { .. }), Duration(d)) => {
                let as_quantity = Quantity {
                    amount: seconds(d),
                    unit: second_unit()?,
                };
                other.multiply(&as_quantity)
            }
            (Quantity { amount: a, unit: u }, Quantity { amount: b, unit: v }) => {
                quantity_or_number(a * b, u.multiply(v)?)
            }
            (Currency { code, amount }, Quantity { amount: b, unit })
            | (Quantity { amount: b, unit }, Currency { code, amount }) => {
                money_or_rate(code, amount * b, unit.clone())
            }
            (CurrencyUnit { code, amount, unit }, Quantity { amount: b, unit: other })
            | (Quantity { amount: b, unit: other }, CurrencyUnit { code, amount, unit }) => {
                money_or_rate(code, amount * b, unit.multiply(other)?)
            }
            _ => Err(incompatible()),
        }
    }

    /// `self / rhs`
    pub fn divide(&self, rhs: &SemanticValue, options: &ArithmeticOptions) -> Result<SemanticValue> {
        use SemanticValue::*;
        let incompatible = || crate::Error::incompatible("/", self.type_tag(), rhs.type_tag());

        match (self, rhs) {
            (Error(e), _) | (_, Error(e)) => return Err(e.clone()),
            (Date(_) | Symbolic(_), _) | (_, Date(_) | Symbolic(_)) => return Err(incompatible()),
            _ => {}
        }
        if rhs.numeric_value() == Some(0.0) {
            return Err(crate::Error::DivisionByZero);
        }

        match (self, rhs) {
            (Number(a), Number(b)) => Ok(Number(finite(a / b)?)),
            (Percentage(a), Percentage(b)) => Ok(Number(finite(a / b)?)),
            (Percentage(p), Number(n)) => Ok(Percentage(finite(p / n)?)),
            (Number(a), Percentage(p)) => Ok(Number(finite(a * 100.0 / p)?)),
            (x @ (Currency { .. } | Quantity { .. } | CurrencyUnit { .. } | Duration(_)), Number(n)) => {
                x.scale(1.0 / n)
            }
            (x @ (Currency { .. } | Quantity { .. } | CurrencyUnit { .. } | Duration(_)), Percentage(p)) => {
                x.scale(100.0 / p)
            }
            (Duration(a), Duration(b)) => Ok(Number(finite(seconds(a) / seconds(b))?)),
            (Duration(d), other @ (Quantity { .. } | Currency { .. } | CurrencyUnit { .. })) => {
                let as_quantity = Quantity {
                    amount: seconds(d),
                    unit: second_unit()?,
                };
                as_quantity.divide(other, options)
            }
            (other @ (Number(_) | Quantity { .. } | Currency { .. } | CurrencyUnit { .. }), Duration(d)) => {
                let as_quantity = Quantity {
                    amount: seconds(d),
                    unit: second_unit()?,
                };
                other.divide(&as_quantity, options)
            }
            (Number(a), Quantity { amount, unit }) => quantity_or_number(a / amount, unit.inverse()),
            (Quantity { amount: a, unit: u }, Quantity { amount: b, unit: v }) => {
                quantity_or_number(a / b, u.divide(v)?)
            }
            (Currency { code, amount: a }, Currency { code: other, amount: b }) => {
                check_codes(BinaryOp::Divide, code, other)?;
                Ok(Number(finite(a / b)?))
            }
            (Currency { code, amount }, Quantity { amount: b, unit }) => {
                money_or_rate(code, amount / b, unit.inverse())
            }
            (CurrencyUnit { code, amount, unit }, Quantity { amount: b, unit: other }) => {
                money_or_rate(code, amount / b, unit.divide(other)?)
            }
            (Currency { code, amount: a }, CurrencyUnit { code: other, amount: b, unit }) => {
                check_codes(BinaryOp::Divide, code, other)?;
                self.cancel_currency(a / b, unit.inverse(), options)
            }
            (CurrencyUnit { code, amount: a, unit }, Currency { code: other, amount: b }) => {
                check_codes(BinaryOp::Divide, code, other)?;
                self.cancel_currency(a / b, unit.clone(), options)
            }
            (
                CurrencyUnit { code, amount: a, unit: u },
                CurrencyUnit { code: other, amount: b, unit: v },
            ) => {
                check_codes(BinaryOp::Divide, code, other)?;
                self.cancel_currency(a / b, u.divide(v)?, options)
            }
            _ => Err(incompatible()),
        }
    }

    /// Currency codes cancelled; what remains is `amount` in `unit`
    fn cancel_currency(
        &self,
        amount: f64,
        unit: CompositeUnit,
        options: &ArithmeticOptions,
    ) -> Result<SemanticValue> {
        if options.dimensional_cancellation {
            quantity_or_number(amount, unit)
        } else {
            Ok(SemanticValue::Number(finite(amount)?))
        }
    }

    /// `self ^ rhs`
    pub fn power(&self, rhs: &SemanticValue) -> Result<SemanticValue> {
        use SemanticValue::*;
        let exponent = match rhs {
            Error(e) => return Err(e.clone()),
            Number(n) => *n,
            _ => return Err(crate::Error::incompatible("^", self.type_tag(), rhs.type_tag())),
        };

        match self {
            Error(e) => Err(e.clone()),
            Number(base) => Ok(Number(finite(base.powf(exponent))?)),
            Quantity { amount, unit } => {
                if exponent.fract() != 0.0 {
                    return Err(crate::Error::Type(format!(
                        "cannot raise {unit} to non-integer power {exponent}"
                    )));
                }
                if exponent.abs() > MAX_UNIT_POWER as f64 {
                    return Err(crate::Error::Runtime(format!(
                        "unit power out of range in {unit}^{exponent} (limit is {MAX_UNIT_POWER})"
                    )));
                }
                let power = exponent as i32;
                quantity_or_number(amount.powi(power), unit.pow(power)?)
            }
            _ => Err(crate::Error::incompatible("^", self.type_tag(), rhs.type_tag())),
        }
    }

    /// Unary minus
    pub fn negate(&self) -> Result<SemanticValue> {
        match self {
            SemanticValue::Error(e) => Err(e.clone()),
            SemanticValue::Duration(d) => Ok(SemanticValue::Duration(-*d)),
            SemanticValue::Date(_) | SemanticValue::Symbolic(_) => {
                Err(Error::unsupported("-", self.type_tag()))
            }
            _ => self.scale(-1.0),
        }
    }

    /// `self of rhs`, where `self` is a Percentage
    pub fn percent_of(&self, rhs: &SemanticValue) -> Result<SemanticValue> {
        match (self, rhs) {
            (SemanticValue::Error(e), _) | (_, SemanticValue::Error(e)) => Err(e.clone()),
            (SemanticValue::Percentage(p), SemanticValue::Percentage(q)) => {
                Ok(SemanticValue::Percentage(finite(p * q / 100.0)?))
            }
            (
                SemanticValue::Percentage(p),
                SemanticValue::Number(_)
                | SemanticValue::Currency { .. }
                | SemanticValue::Quantity { .. }
                | SemanticValue::CurrencyUnit { .. }
                | SemanticValue::Duration(_),
            ) => rhs.scale(p / 100.0),
            _ => Err(Error::incompatible("of", self.type_tag(), rhs.type_tag())),
        }
    }

    /// Multiply the magnitude by `factor`, keeping the kind
    pub fn scale(&self, factor: f64) -> Result<SemanticValue> {
        use SemanticValue::*;
        Ok(match self {
            Number(n) => Number(finite(n * factor)?),
            Percentage(p) => Percentage(finite(p * factor)?),
            Currency { code, amount } => Currency {
                code: code.clone(),
                amount: finite(amount * factor)?,
            },
            Quantity { amount, unit } => Quantity {
                amount: finite(amount * factor)?,
                unit: unit.clone(),
            },
            CurrencyUnit { code, amount, unit } => CurrencyUnit {
                code: code.clone(),
                amount: finite(amount * factor)?,
                unit: unit.clone(),
            },
            Duration(d) => Duration(duration_from_seconds(seconds(d) * factor)?),
            Error(e) => return Err(e.clone()),
            Date(_) | Symbolic(_) => return Err(crate::Error::unsupported("*", self.type_tag())),
        })
    }

    /// Express this value in `target`.
    ///
    /// Quantities need an equal dimension; a Currency-Unit converts its unit part
    /// (`$50/h` to `min`); a Duration becomes a quantity; a bare Number adopts the unit.
    pub fn convert_to_unit(&self, target: &CompositeUnit) -> Result<SemanticValue> {
        use SemanticValue::*;
        match self {
            Error(e) => Err(e.clone()),
            Number(n) => Ok(Quantity {
                amount: *n,
                unit: target.clone(),
            }),
            Quantity { amount, unit } => Ok(Quantity {
                amount: finite(convert_amount(*amount, unit, target)?)?,
                unit: target.clone(),
            }),
            Duration(d) => {
                let secs = Quantity {
                    amount: seconds(d),
                    unit: second_unit()?,
                };
                secs.convert_to_unit(target)
            }
            CurrencyUnit { code, amount, unit } => {
                let new_unit = if target.dimension() == unit.dimension() {
                    target.clone()
                } else if target.dimension() == unit.inverse().dimension() {
                    target.inverse()
                } else {
                    return Err(crate::Error::conversion(format!(
                        "cannot convert {unit} to {target}: incompatible dimensions"
                    )));
                };
                Ok(CurrencyUnit {
                    code: code.clone(),
                    amount: finite(amount * unit.base_factor() / new_unit.base_factor())?,
                    unit: new_unit,
                })
            }
            _ => Err(crate::Error::conversion(format!(
                "cannot convert {} to {target}",
                self.type_tag()
            ))),
        }
    }

    /// Express a Number as a Percentage (`0.25` → `25%`)
    pub fn to_percentage(&self) -> Result<SemanticValue> {
        match self {
            SemanticValue::Error(e) => Err(e.clone()),
            SemanticValue::Number(n) => Ok(SemanticValue::Percentage(finite(n * 100.0)?)),
            SemanticValue::Percentage(_) => Ok(self.clone()),
            _ => Err(Error::unsupported("to %", self.type_tag())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn unit(text: &str) -> CompositeUnit {
        CompositeUnit::parse(text).unwrap()
    }

    fn qty(amount: f64, text: &str) -> SemanticValue {
        SemanticValue::quantity(amount, unit(text))
    }

    fn amount_of(value: &SemanticValue) -> f64 {
        value.numeric_value().unwrap()
    }

    #[test]
    fn test_quantity_addition_converts_right_operand() {
        let sum = qty(2.0, "km").add(&qty(300.0, "m")).unwrap();
        assert_eq!(sum.to_string(), "2.3 km");
    }

    #[test]
    fn test_quantity_addition_requires_dimension() {
        let err = qty(2.0, "km").add(&qty(3.0, "s")).unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn test_multiply_then_divide_restores() {
        let q1 = qty(3.0, "m");
        let q2 = qty(4.0, "s");
        let back = q1.multiply(&q2).unwrap().divide(&q2, &Default::default()).unwrap();
        assert_eq!(back, q1);
    }

    #[test]
    fn test_count_ratio_is_number() {
        let ratio = qty(24.0, "pcs")
            .divide(&qty(2.0, "dozen"), &Default::default())
            .unwrap();
        assert!(matches!(ratio, SemanticValue::Number(n) if (n - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_division_by_zero() {
        let err = qty(1.0, "m")
            .divide(&qty(0.0, "s"), &Default::default())
            .unwrap_err();
        assert_eq!(err, Error::DivisionByZero);
        let err = SemanticValue::Number(1.0)
            .divide(&SemanticValue::Number(0.0), &Default::default())
            .unwrap_err();
        assert_eq!(err, Error::DivisionByZero);
    }

    #[test]
    fn test_currency_over_rate() {
        let budget = SemanticValue::currency("USD", 500.0);
        let rate = SemanticValue::CurrencyUnit {
            code: "USD".into(),
            amount: 0.15,
            unit: unit("1/h"),
        };
        let hours = budget.divide(&rate, &ArithmeticOptions::default()).unwrap();
        assert_eq!(hours.to_string(), "3333.33 h");

        let plain = budget
            .divide(
                &rate,
                &ArithmeticOptions {
                    dimensional_cancellation: false,
                },
            )
            .unwrap();
        assert!(matches!(plain, SemanticValue::Number(_)));
    }

    #[test]
    fn test_rate_times_time_is_money() {
        let rate = SemanticValue::CurrencyUnit {
            code: "USD".into(),
            amount: 50.0,
            unit: unit("1/h"),
        };
        let cost = rate.multiply(&qty(30.0, "min")).unwrap();
        assert_eq!(cost.type_tag(), crate::value::TypeTag::Currency);
        assert!((amount_of(&cost) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_currency_codes_must_match() {
        let err = SemanticValue::currency("USD", 1.0)
            .add(&SemanticValue::currency("EUR", 1.0))
            .unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn test_percentage_rules() {
        let base = SemanticValue::Number(200.0);
        assert_eq!(
            base.add(&SemanticValue::Percentage(10.0)).unwrap(),
            SemanticValue::Number(220.0)
        );
        assert_eq!(
            base.subtract(&SemanticValue::Percentage(25.0)).unwrap(),
            SemanticValue::Number(150.0)
        );
        let of = SemanticValue::Percentage(10.0).percent_of(&qty(155.0, "N")).unwrap();
        assert_eq!(of.to_string(), "15.5 N");
        assert_eq!(
            SemanticValue::Percentage(50.0)
                .divide(&SemanticValue::Percentage(25.0), &Default::default())
                .unwrap(),
            SemanticValue::Number(2.0)
        );
    }

    #[test]
    fn test_power() {
        let area = qty(3.0, "m").power(&SemanticValue::Number(2.0)).unwrap();
        assert_eq!(area, qty(9.0, "m^2"));
        assert!(qty(3.0, "m").power(&SemanticValue::Number(0.5)).is_err());
        assert!(SemanticValue::currency("USD", 1.0)
            .power(&SemanticValue::Number(2.0))
            .is_err());
    }

    #[test]
    fn test_power_out_of_range() {
        let area = qty(3.0, "m^2");
        for exponent in [2.0e9, 33.0, -40.0] {
            let err = area.power(&SemanticValue::Number(exponent)).unwrap_err();
            assert!(matches!(err, Error::Runtime(_)), "{exponent}");
        }
        let largest = qty(1.0, "m^2").power(&SemanticValue::Number(32.0)).unwrap();
        assert_eq!(largest, qty(1.0, "m^64"));

        let big = qty(1.0, "m^40");
        assert!(matches!(big.multiply(&big), Err(Error::Runtime(_))));
        assert!(matches!(
            big.divide(&qty(1.0, "m^-40"), &Default::default()),
            Err(Error::Runtime(_))
        ));
    }

    #[test]
    fn test_dates() {
        let a = SemanticValue::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        let b = SemanticValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let span = a.subtract(&b).unwrap();
        assert_eq!(span, SemanticValue::Duration(chrono::Duration::days(30)));

        let next = a.add(&qty(1.0, "month")).unwrap();
        assert_eq!(
            next,
            SemanticValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        let later = b.add(&qty(2.0, "week")).unwrap();
        assert_eq!(
            later,
            SemanticValue::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
    }

    #[test]
    fn test_date_arithmetic_names_both_operands() {
        let date = SemanticValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(
            date.multiply(&SemanticValue::Number(2.0)).unwrap_err(),
            Error::Type("cannot apply '*' to Date and Number".into())
        );
        assert_eq!(
            SemanticValue::Percentage(50.0).multiply(&date).unwrap_err(),
            Error::Type("cannot apply '*' to Percentage and Date".into())
        );
        assert_eq!(
            date.divide(&SemanticValue::Number(0.0), &Default::default())
                .unwrap_err(),
            Error::Type("cannot apply '/' to Date and Number".into())
        );
    }

    #[test]
    fn test_duration_division() {
        let two_hours = SemanticValue::Duration(chrono::Duration::hours(2));
        assert_eq!(
            two_hours.divide(&SemanticValue::Number(4.0), &Default::default()).unwrap(),
            SemanticValue::Duration(chrono::Duration::minutes(30))
        );
        let speed = qty(10.0, "km")
            .divide(&two_hours, &Default::default())
            .unwrap();
        assert_eq!(speed.to_string(), "5 km/h");
    }

    #[test]
    fn test_convert_to_unit() {
        let miles = qty(10.0, "km").convert_to_unit(&unit("mi")).unwrap();
        assert!((amount_of(&miles) - 6.213712).abs() < 1e-6);

        let per_minute = SemanticValue::CurrencyUnit {
            code: "USD".into(),
            amount: 60.0,
            unit: unit("1/h"),
        }
        .convert_to_unit(&unit("min"))
        .unwrap();
        assert_eq!(per_minute.to_string(), "$1.00/min");

        let err = SemanticValue::currency("USD", 1.0)
            .convert_to_unit(&unit("m"))
            .unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn test_error_operands_propagate() {
        let err = SemanticValue::Error(Error::DivisionByZero)
            .add(&SemanticValue::Number(1.0))
            .unwrap_err();
        assert_eq!(err, Error::DivisionByZero);
    }
}
