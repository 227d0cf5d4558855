//! Operator-precedence pass from infix components to postfix order

use crate::ast::{Component, ConversionTarget, Operator};
use calcline_core::{Error, Result};

/// Unary prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
}

/// One step of a postfix program
#[derive(Debug, Clone, PartialEq)]
pub enum PostfixItem<'a> {
    Operand(&'a Component),
    Binary(Operator),
    Unary(UnaryOperator),
    Convert(&'a ConversionTarget),
}

const UNARY_PRECEDENCE: u8 = 4;

#[derive(Debug, Clone, Copy)]
enum Pending {
    Binary(Operator),
    Unary(UnaryOperator),
}

impl Pending {
    fn precedence(self) -> u8 {
        match self {
            Pending::Binary(op) => op.precedence(),
            Pending::Unary(_) => UNARY_PRECEDENCE,
        }
    }

    fn into_item<'a>(self) -> PostfixItem<'a> {
        match self {
            Pending::Binary(op) => PostfixItem::Binary(op),
            Pending::Unary(op) => PostfixItem::Unary(op),
        }
    }
}

/// Reorder components into postfix.
///
/// Unary `+`/`-` bind tightest (4), then `^` (3), `* / of` (2), binary `+ -` (1);
/// equal precedence associates left to right. A conversion is a postfix operator
/// at precedence 0 applying to everything before it.
pub fn to_postfix(components: &[Component]) -> Result<Vec<PostfixItem<'_>>> {
    if components.is_empty() {
        return Err(Error::semantic("empty expression"));
    }

    let mut output = Vec::with_capacity(components.len());
    let mut stack: Vec<Pending> = Vec::new();
    let mut expect_operand = true;

    for component in components {
        match component {
            Component::Operator(op) if expect_operand => {
                let unary = match op {
                    Operator::Add => UnaryOperator::Plus,
                    Operator::Subtract => UnaryOperator::Minus,
                    _ => {
                        return Err(Error::semantic(format!(
                            "operator '{op}' is missing its left operand"
                        )))
                    }
                };
                stack.push(Pending::Unary(unary));
            }
            Component::Operator(op) => {
                while let Some(top) = stack.last().copied() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    stack.pop();
                    output.push(top.into_item());
                }
                stack.push(Pending::Binary(*op));
                expect_operand = true;
            }
            Component::Conversion(target) => {
                if expect_operand {
                    return Err(Error::semantic(format!(
                        "conversion to {target} has nothing to convert"
                    )));
                }
                while let Some(top) = stack.pop() {
                    output.push(top.into_item());
                }
                output.push(PostfixItem::Convert(target));
            }
            operand => {
                if !expect_operand {
                    return Err(Error::semantic("missing operator between operands"));
                }
                output.push(PostfixItem::Operand(operand));
                expect_operand = false;
            }
        }
    }

    if expect_operand {
        return Err(Error::semantic("expression ends with an operator"));
    }
    while let Some(top) = stack.pop() {
        output.push(top.into_item());
    }
    Ok(output)
}
