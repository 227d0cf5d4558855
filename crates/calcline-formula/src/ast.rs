//! Semantic component tree

use calcline_core::{BinaryOp, CompositeUnit, SemanticValue};
use std::fmt;

/// One parsed syntactic unit of an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    /// Literal with its source text and parsed value
    Literal { text: String, value: SemanticValue },
    /// Infix operator
    Operator(Operator),
    /// Variable reference (normalized name)
    Variable(String),
    /// Function call
    Function { name: String, args: Vec<Argument> },
    /// Parenthesized sub-expression; never empty
    Group(Vec<Component>),
    /// Postfix conversion such as `to km` or `in EUR`
    Conversion(ConversionTarget),
}

impl Component {
    /// True for components that produce a value on their own
    pub fn is_operand(&self) -> bool {
        matches!(
            self,
            Component::Literal { .. }
                | Component::Variable(_)
                | Component::Function { .. }
                | Component::Group(_)
        )
    }
}

/// One function-call argument, optionally bound by name (`digits: 2`)
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub components: Vec<Component>,
}

/// Operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Of,
}

impl Operator {
    /// Operator for a token's text
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => Operator::Add,
            "-" => Operator::Subtract,
            "*" => Operator::Multiply,
            "/" => Operator::Divide,
            "^" => Operator::Power,
            "of" => Operator::Of,
            _ => return None,
        })
    }

    /// Binary precedence: `^` 3, `* / of` 2, `+ -` 1
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Add | Operator::Subtract => 1,
            Operator::Multiply | Operator::Divide | Operator::Of => 2,
            Operator::Power => 3,
        }
    }

    /// Matching value-system operation
    pub fn binary_op(self) -> BinaryOp {
        match self {
            Operator::Add => BinaryOp::Add,
            Operator::Subtract => BinaryOp::Subtract,
            Operator::Multiply => BinaryOp::Multiply,
            Operator::Divide => BinaryOp::Divide,
            Operator::Power => BinaryOp::Power,
            Operator::Of => BinaryOp::Of,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_op().symbol())
    }
}

/// Target of a conversion keyword
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionTarget {
    Unit(CompositeUnit),
    /// ISO currency code
    Currency(String),
    Percent,
}

impl fmt::Display for ConversionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionTarget::Unit(unit) => write!(f, "{unit}"),
            ConversionTarget::Currency(code) => f.write_str(code),
            ConversionTarget::Percent => f.write_str("%"),
        }
    }
}
