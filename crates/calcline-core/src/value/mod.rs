//! Semantic value types

mod arithmetic;

use crate::currency;
use crate::error::Error;
use crate::numeric::{format_decimals, format_fixed, format_significant};
use crate::unit::CompositeUnit;
use chrono::NaiveDate;
use std::fmt;

pub use arithmetic::{ArithmeticOptions, BinaryOp};

/// Typed result of evaluating an expression or literal
#[derive(Debug, Clone, PartialEq)]
pub enum SemanticValue {
    /// Plain number
    Number(f64),
    /// Percentage, stored as written (5 means 5%)
    Percentage(f64),
    /// Money in one currency
    Currency { code: String, amount: f64 },
    /// Physical quantity
    Quantity { amount: f64, unit: CompositeUnit },
    /// Money combined with a physical unit, e.g. `$50/h`.
    ///
    /// `unit` carries signed powers: `$/h` stores `h^-1`.
    CurrencyUnit {
        code: String,
        amount: f64,
        unit: CompositeUnit,
    },
    /// Calendar date
    Date(NaiveDate),
    /// Signed span of time
    Duration(chrono::Duration),
    /// Deferred expression text that references a not-yet-defined variable
    Symbolic(String),
    /// Failed evaluation
    Error(Error),
}

/// Kind of a [`SemanticValue`], used by the type resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Number,
    Percentage,
    Currency,
    Unit,
    CurrencyUnit,
    Date,
    Duration,
    Symbolic,
    Error,
}

impl TypeTag {
    /// Name used in error messages
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Number => "Number",
            TypeTag::Percentage => "Percentage",
            TypeTag::Currency => "Currency",
            TypeTag::Unit => "Unit",
            TypeTag::CurrencyUnit => "CurrencyUnit",
            TypeTag::Date => "Date",
            TypeTag::Duration => "Duration",
            TypeTag::Symbolic => "Symbolic",
            TypeTag::Error => "Error",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Display precision settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Maximum fraction digits for plain numbers
    pub number_decimals: usize,
    /// Significant digits for quantities and percentages
    pub significant_digits: usize,
    /// Fixed fraction digits for money
    pub currency_decimals: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            number_decimals: 6,
            significant_digits: 6,
            currency_decimals: 2,
        }
    }
}

impl SemanticValue {
    /// Create a currency value
    pub fn currency<S: Into<String>>(code: S, amount: f64) -> Self {
        SemanticValue::Currency {
            code: code.into(),
            amount,
        }
    }

    /// Create a quantity value
    pub fn quantity(amount: f64, unit: CompositeUnit) -> Self {
        SemanticValue::Quantity { amount, unit }
    }

    /// Kind of this value
    pub fn type_tag(&self) -> TypeTag {
        match self {
            SemanticValue::Number(_) => TypeTag::Number,
            SemanticValue::Percentage(_) => TypeTag::Percentage,
            SemanticValue::Currency { .. } => TypeTag::Currency,
            SemanticValue::Quantity { .. } => TypeTag::Unit,
            SemanticValue::CurrencyUnit { .. } => TypeTag::CurrencyUnit,
            SemanticValue::Date(_) => TypeTag::Date,
            SemanticValue::Duration(_) => TypeTag::Duration,
            SemanticValue::Symbolic(_) => TypeTag::Symbolic,
            SemanticValue::Error(_) => TypeTag::Error,
        }
    }

    /// True for every kind that carries a concrete magnitude
    pub fn is_numeric(&self) -> bool {
        !matches!(self, SemanticValue::Symbolic(_) | SemanticValue::Error(_))
    }

    /// Magnitude as a plain number.
    ///
    /// Percentages coerce to their fraction (`5%` → `0.05`), dates to days since
    /// 1970-01-01, durations to seconds.
    pub fn numeric_value(&self) -> Option<f64> {
        match self {
            SemanticValue::Number(n) => Some(*n),
            SemanticValue::Percentage(p) => Some(p / 100.0),
            SemanticValue::Currency { amount, .. }
            | SemanticValue::Quantity { amount, .. }
            | SemanticValue::CurrencyUnit { amount, .. } => Some(*amount),
            SemanticValue::Date(date) => {
                let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
                Some(date.signed_duration_since(epoch).num_days() as f64)
            }
            SemanticValue::Duration(d) => Some(d.num_milliseconds() as f64 / 1000.0),
            SemanticValue::Symbolic(_) | SemanticValue::Error(_) => None,
        }
    }

    /// True if this is an error value
    pub fn is_error(&self) -> bool {
        matches!(self, SemanticValue::Error(_))
    }

    /// The error, if this is one
    pub fn as_error(&self) -> Option<&Error> {
        match self {
            SemanticValue::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Currency code of Currency and Currency-Unit values
    pub fn currency_code(&self) -> Option<&str> {
        match self {
            SemanticValue::Currency { code, .. } | SemanticValue::CurrencyUnit { code, .. } => {
                Some(code)
            }
            _ => None,
        }
    }

    /// True for a Currency-Unit whose unit sits entirely in the denominator (`$/h`)
    pub fn is_per_unit(&self) -> bool {
        match self {
            SemanticValue::CurrencyUnit { unit, .. } => {
                !unit.is_empty() && unit.factors().iter().all(|f| f.power < 0)
            }
            _ => false,
        }
    }

    /// Unit text of a Currency-Unit as written after the currency (`h` for `$/h`)
    pub fn unit_string(&self) -> Option<String> {
        match self {
            SemanticValue::CurrencyUnit { unit, .. } if self.is_per_unit() => {
                Some(unit.inverse().to_string())
            }
            SemanticValue::CurrencyUnit { unit, .. } | SemanticValue::Quantity { unit, .. } => {
                Some(unit.to_string())
            }
            _ => None,
        }
    }

    /// Render with explicit precision settings
    pub fn display_with(&self, options: &FormatOptions) -> String {
        match self {
            SemanticValue::Number(n) => format_decimals(*n, options.number_decimals),
            SemanticValue::Percentage(p) => {
                format!("{}%", format_significant(*p, options.significant_digits))
            }
            SemanticValue::Currency { code, amount } => format_money(code, *amount, options),
            SemanticValue::Quantity { amount, unit } => {
                let (amount, unit) = match unit.named_derived() {
                    Some(named) => (
                        amount * unit.base_factor() / named.factor,
                        named.symbol.to_string(),
                    ),
                    None => (*amount, unit.to_string()),
                };
                format!(
                    "{} {}",
                    format_significant(amount, options.significant_digits),
                    unit
                )
            }
            SemanticValue::CurrencyUnit { code, amount, unit } => {
                let money = format_money(code, *amount, options);
                if self.is_per_unit() {
                    let inverse = unit.inverse();
                    if inverse.factors().len() > 1 {
                        format!("{money}/({inverse})")
                    } else {
                        format!("{money}/{inverse}")
                    }
                } else {
                    format!("{money} {unit}")
                }
            }
            SemanticValue::Date(date) => date.format("%Y-%m-%d").to_string(),
            SemanticValue::Duration(d) => format_duration(*d),
            SemanticValue::Symbolic(text) => text.clone(),
            SemanticValue::Error(e) => e.to_string(),
        }
    }
}

fn format_money(code: &str, amount: f64, options: &FormatOptions) -> String {
    let digits = format_fixed(amount.abs(), options.currency_decimals);
    let sign = if amount < 0.0 && digits.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match currency::display_symbol(code) {
        Some(symbol) => format!("{sign}{symbol}{digits}"),
        None => format!("{sign}{digits} {code}"),
    }
}

fn format_duration(duration: chrono::Duration) -> String {
    let total_ms = duration.num_milliseconds();
    if total_ms == 0 {
        return "0 s".to_string();
    }
    let sign = if total_ms < 0 { "-" } else { "" };
    let mut ms = total_ms.unsigned_abs();
    let days = ms / 86_400_000;
    ms %= 86_400_000;
    let hours = ms / 3_600_000;
    ms %= 3_600_000;
    let minutes = ms / 60_000;
    ms %= 60_000;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{} {}", days, if days == 1 { "day" } else { "days" }));
    }
    if hours > 0 {
        parts.push(format!("{hours} h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes} min"));
    }
    if ms > 0 {
        parts.push(format!("{} s", format_decimals(ms as f64 / 1000.0, 3)));
    }
    format!("{sign}{}", parts.join(" "))
}

impl fmt::Display for SemanticValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_with(&FormatOptions::default()))
    }
}

impl From<f64> for SemanticValue {
    fn from(value: f64) -> Self {
        SemanticValue::Number(value)
    }
}

impl From<Error> for SemanticValue {
    fn from(error: Error) -> Self {
        SemanticValue::Error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(text: &str) -> CompositeUnit {
        CompositeUnit::parse(text).unwrap()
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(SemanticValue::Number(1.0).type_tag(), TypeTag::Number);
        assert_eq!(
            SemanticValue::quantity(1.0, unit("m")).type_tag(),
            TypeTag::Unit
        );
        assert!(!SemanticValue::Symbolic("x".into()).is_numeric());
        assert!(SemanticValue::Percentage(5.0).is_numeric());
    }

    #[test]
    fn test_numeric_value() {
        assert_eq!(SemanticValue::Percentage(5.0).numeric_value(), Some(0.05));
        assert_eq!(SemanticValue::currency("USD", 3.0).numeric_value(), Some(3.0));
        assert_eq!(
            SemanticValue::Duration(chrono::Duration::minutes(2)).numeric_value(),
            Some(120.0)
        );
        assert_eq!(SemanticValue::Symbolic("x".into()).numeric_value(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(SemanticValue::Number(72.25663103256524).to_string(), "72.256631");
        assert_eq!(SemanticValue::Percentage(10.0).to_string(), "10%");
        assert_eq!(SemanticValue::currency("USD", 3.5).to_string(), "$3.50");
        assert_eq!(SemanticValue::currency("CHF", -2.0).to_string(), "-2.00 CHF");
        assert_eq!(SemanticValue::quantity(2.3, unit("km")).to_string(), "2.3 km");
        assert_eq!(
            SemanticValue::quantity(6.0, unit("kg*m/s^2")).to_string(),
            "6 N"
        );
        assert_eq!(
            SemanticValue::quantity(1.0, unit("g*m/s^2")).to_string(),
            "0.001 N"
        );
    }

    #[test]
    fn test_currency_unit_display() {
        let rate = SemanticValue::CurrencyUnit {
            code: "USD".into(),
            amount: 0.15,
            unit: unit("1/h"),
        };
        assert!(rate.is_per_unit());
        assert_eq!(rate.unit_string().as_deref(), Some("h"));
        assert_eq!(rate.to_string(), "$0.15/h");
    }

    #[test]
    fn test_duration_display() {
        let d = chrono::Duration::days(3) + chrono::Duration::hours(4);
        assert_eq!(SemanticValue::Duration(d).to_string(), "3 days 4 h");
        assert_eq!(
            SemanticValue::Duration(chrono::Duration::zero()).to_string(),
            "0 s"
        );
    }
}
