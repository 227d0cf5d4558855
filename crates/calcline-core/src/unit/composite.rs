//! Composite units: products of unit symbols raised to integer powers

use super::dimension::{Dimension, BASE_DIMENSIONS};
use super::registry::{self, UnitDef, NAMED_DERIVED};
use crate::error::{Error, Result};
use std::fmt;

/// Largest absolute power a unit factor or a derived dimension may carry
pub const MAX_UNIT_POWER: i32 = 64;

fn power_out_of_range(unit: &CompositeUnit) -> Error {
    Error::Runtime(format!(
        "unit power out of range in {unit} (limit is {MAX_UNIT_POWER})"
    ))
}

/// One `symbol^power` term of a [`CompositeUnit`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitFactor {
    pub unit: &'static UnitDef,
    pub power: i32,
}

impl UnitFactor {
    /// Canonical symbol of the factor's unit
    pub fn symbol(&self) -> &'static str {
        self.unit.symbol
    }
}

/// Ordered product of unit factors, e.g. `kg*m/s^2`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositeUnit {
    factors: Vec<UnitFactor>,
}

impl CompositeUnit {
    /// The empty (dimensionless) unit
    pub fn new() -> Self {
        Self::default()
    }

    /// A single unit to the first power
    pub fn from_def(unit: &'static UnitDef) -> Self {
        Self {
            factors: vec![UnitFactor { unit, power: 1 }],
        }
    }

    /// A single unit looked up by symbol or alias
    pub fn single(symbol: &str) -> Result<Self> {
        registry::lookup(symbol)
            .map(Self::from_def)
            .ok_or_else(|| Error::parse(format!("unknown unit '{symbol}'")))
    }

    /// Parse a unit expression such as `kg*m/s^2` or `1/(h*m)`
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = UnitParser::new(text);
        let unit = parser.parse_expr().map_err(|e| match e {
            Error::Runtime(msg) => Error::Parse(msg),
            other => other,
        })?;
        parser.skip_whitespace();
        if !parser.is_at_end() {
            return Err(Error::parse(format!(
                "unexpected '{}' in unit '{}'",
                &parser.input[parser.pos..],
                text
            )));
        }
        Ok(unit)
    }

    /// Factors in order
    pub fn factors(&self) -> &[UnitFactor] {
        &self.factors
    }

    /// True when there are no factors
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Dimension derived from every factor
    pub fn dimension(&self) -> Dimension {
        let mut exponents = [0i8; BASE_DIMENSIONS];
        for (out, e) in exponents.iter_mut().zip(self.dimension_exponents()) {
            *out = e.clamp(i8::MIN as i32, i8::MAX as i32) as i8;
        }
        Dimension::from_exponents(exponents)
    }

    /// True when the derived dimension is dimensionless
    pub fn is_dimensionless(&self) -> bool {
        self.dimension().is_dimensionless()
    }

    /// Scalar that converts an amount in this unit to coherent SI
    pub fn base_factor(&self) -> f64 {
        self.factors
            .iter()
            .map(|f| f.unit.factor.powi(f.power))
            .product()
    }

    /// Product of two units, simplified
    pub fn multiply(&self, other: &CompositeUnit) -> Result<CompositeUnit> {
        let mut factors = self.factors.clone();
        factors.extend(other.factors.iter().copied());
        Self::from_factors(factors)
    }

    /// Quotient of two units, simplified
    pub fn divide(&self, other: &CompositeUnit) -> Result<CompositeUnit> {
        self.multiply(&other.inverse())
    }

    /// Every factor's power multiplied by `power`
    pub fn pow(&self, power: i32) -> Result<CompositeUnit> {
        let factors = self
            .factors
            .iter()
            .map(|f| {
                f.power
                    .checked_mul(power)
                    .map(|p| UnitFactor { unit: f.unit, power: p })
                    .ok_or_else(|| power_out_of_range(self))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_factors(factors)
    }

    /// Reciprocal unit (`h` becomes `1/h`)
    pub fn inverse(&self) -> CompositeUnit {
        CompositeUnit {
            factors: self
                .factors
                .iter()
                .map(|f| UnitFactor {
                    unit: f.unit,
                    power: -f.power,
                })
                .collect(),
        }
    }

    /// Collapse factors sharing a symbol and drop zero powers.
    ///
    /// Every unit leaving this function has factor powers and dimension
    /// exponents within [`MAX_UNIT_POWER`].
    fn from_factors(factors: Vec<UnitFactor>) -> Result<CompositeUnit> {
        let overflow = || power_out_of_range(&CompositeUnit { factors: factors.clone() });
        let mut out: Vec<UnitFactor> = Vec::with_capacity(factors.len());
        for factor in &factors {
            match out.iter_mut().find(|f| f.unit.symbol == factor.unit.symbol) {
                Some(existing) => {
                    existing.power = existing.power.checked_add(factor.power).ok_or_else(overflow)?;
                }
                None => out.push(*factor),
            }
        }
        out.retain(|f| f.power != 0);
        let unit = CompositeUnit { factors: out };

        let in_range = |e: i32| e.abs() <= MAX_UNIT_POWER;
        if !unit.factors.iter().all(|f| in_range(f.power))
            || !unit.dimension_exponents().into_iter().all(in_range)
        {
            return Err(power_out_of_range(&unit));
        }
        Ok(unit)
    }

    /// Dimension exponents summed without narrowing
    fn dimension_exponents(&self) -> [i32; BASE_DIMENSIONS] {
        let mut exponents = [0i32; BASE_DIMENSIONS];
        for factor in &self.factors {
            for (total, e) in exponents.iter_mut().zip(factor.unit.dimension.exponents()) {
                *total = total.saturating_add((e as i32).saturating_mul(factor.power));
            }
        }
        exponents
    }

    /// Merge factors whose units measure the same single base dimension.
    ///
    /// `km*min/h` becomes `km` with scale `1/60`. The returned scale multiplies
    /// the amount so that `amount * scale` in the reduced unit equals `amount`
    /// in `self`.
    pub fn reduce(&self) -> Result<(f64, CompositeUnit)> {
        let mut scale = 1.0;
        let mut out: Vec<UnitFactor> = Vec::with_capacity(self.factors.len());
        for factor in &self.factors {
            let target = match factor.unit.dimension.single_base() {
                Some(_) => out
                    .iter_mut()
                    .find(|f| f.unit.dimension == factor.unit.dimension),
                None => out.iter_mut().find(|f| f.unit.symbol == factor.unit.symbol),
            };
            match target {
                Some(existing) => {
                    scale *= (factor.unit.factor / existing.unit.factor).powi(factor.power);
                    existing.power = existing
                        .power
                        .checked_add(factor.power)
                        .ok_or_else(|| power_out_of_range(self))?;
                }
                None => out.push(*factor),
            }
        }
        out.retain(|f| f.power != 0);
        Ok((scale, CompositeUnit { factors: out }))
    }

    /// The factor's definition when this unit is exactly one symbol to the first power
    pub fn as_single(&self) -> Option<&'static UnitDef> {
        match self.factors.as_slice() {
            [UnitFactor { unit, power: 1 }] => Some(unit),
            _ => None,
        }
    }

    /// A named derived unit (N, J, W, ...) with the same dimension, for composites of two or more factors
    pub fn named_derived(&self) -> Option<&'static UnitDef> {
        if self.factors.len() < 2 {
            return None;
        }
        let dimension = self.dimension();
        NAMED_DERIVED
            .iter()
            .filter_map(|symbol| registry::lookup(symbol))
            .find(|def| def.dimension == dimension)
    }
}

/// Convert an amount between two units of equal dimension.
///
/// Single-symbol temperature units honour their offsets; composites convert by
/// base factor alone.
pub fn convert_amount(amount: f64, from: &CompositeUnit, to: &CompositeUnit) -> Result<f64> {
    if from.dimension() != to.dimension() {
        return Err(Error::conversion(format!(
            "cannot convert {from} to {to}: incompatible dimensions"
        )));
    }
    if let (Some(f), Some(t)) = (from.as_single(), to.as_single()) {
        if f.is_affine() || t.is_affine() {
            let base = amount * f.factor + f.offset;
            return Ok((base - t.offset) / t.factor);
        }
    }
    Ok(amount * from.base_factor() / to.base_factor())
}

fn format_factors(factors: &[&UnitFactor]) -> String {
    factors
        .iter()
        .map(|f| match f.power.abs() {
            1 => f.unit.symbol.to_string(),
            p => format!("{}^{}", f.unit.symbol, p),
        })
        .collect::<Vec<_>>()
        .join("*")
}

impl fmt::Display for CompositeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let positive: Vec<&UnitFactor> = self.factors.iter().filter(|x| x.power > 0).collect();
        let negative: Vec<&UnitFactor> = self.factors.iter().filter(|x| x.power < 0).collect();

        let numerator = if positive.is_empty() {
            "1".to_string()
        } else {
            format_factors(&positive)
        };
        match negative.len() {
            0 => f.write_str(&numerator),
            1 => write!(f, "{}/{}", numerator, format_factors(&negative)),
            _ => write!(f, "{}/({})", numerator, format_factors(&negative)),
        }
    }
}

/// Recursive descent parser for the unit grammar:
///
/// ```text
/// expr    := factor (("*" | "/") factor)*
/// factor  := primary ("^" signedInteger)?
/// primary := symbol | "(" expr ")" | "1"
/// ```
struct UnitParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> UnitParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_expr(&mut self) -> Result<CompositeUnit> {
        let mut unit = self.parse_factor()?;
        loop {
            self.skip_whitespace();
            match self.peek_char() {
                Some('*') | Some('·') => {
                    self.advance();
                    let rhs = self.parse_factor()?;
                    unit = unit.multiply(&rhs)?;
                }
                Some('/') => {
                    self.advance();
                    let rhs = self.parse_factor()?;
                    unit = unit.divide(&rhs)?;
                }
                _ => break,
            }
        }
        Ok(unit)
    }

    fn parse_factor(&mut self) -> Result<CompositeUnit> {
        let primary = self.parse_primary()?;
        self.skip_whitespace();
        match self.peek_char() {
            Some('^') => {
                self.advance();
                let power = self.parse_signed_integer()?;
                primary.pow(power)
            }
            Some('²') => {
                self.advance();
                primary.pow(2)
            }
            Some('³') => {
                self.advance();
                primary.pow(3)
            }
            _ => Ok(primary),
        }
    }

    fn parse_primary(&mut self) -> Result<CompositeUnit> {
        self.skip_whitespace();
        match self.peek_char() {
            Some('(') => {
                self.advance();
                let inner = self.parse_expr()?;
                self.skip_whitespace();
                if self.peek_char() != Some(')') {
                    return Err(Error::parse(format!("unmatched '(' in unit '{}'", self.input)));
                }
                self.advance();
                Ok(inner)
            }
            Some('1') => {
                self.advance();
                Ok(CompositeUnit::new())
            }
            Some(c) if is_symbol_char(c) => {
                let start = self.pos;
                while self.peek_char().is_some_and(is_symbol_char) {
                    self.advance();
                }
                CompositeUnit::single(&self.input[start..self.pos])
            }
            Some(c) => Err(Error::parse(format!(
                "unexpected '{c}' in unit '{}'",
                self.input
            ))),
            None => Err(Error::parse(format!("incomplete unit '{}'", self.input))),
        }
    }

    fn parse_signed_integer(&mut self) -> Result<i32> {
        self.skip_whitespace();
        let start = self.pos;
        if matches!(self.peek_char(), Some('-') | Some('+')) {
            self.advance();
        }
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| Error::parse(format!("invalid exponent in unit '{}'", self.input)))
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

/// Characters allowed inside a unit symbol
pub fn is_symbol_char(c: char) -> bool {
    c.is_alphabetic() || matches!(c, '°' | 'µ' | 'Ω' | '_')
}
