//! Component parser
//!
//! Turns a token stream into a flat list of components. Parenthesized
//! sub-expressions and function arguments recurse into nested lists; operator
//! precedence is applied later by the postfix pass.

use crate::ast::{Argument, Component, ConversionTarget, Operator};
use crate::error::{FormulaError, FormulaResult};
use crate::lexer::{opens_call, tokenize, Token, TokenKind};
use calcline_core::{currency, parse_literal, CompositeUnit};

/// Parse an expression string into components
///
/// # Example
/// ```rust
/// use calcline_formula::parse_expression;
///
/// let components = parse_expression("2km + 300m").unwrap();
/// assert_eq!(components.len(), 3);
/// let components = parse_expression("round(x / 3, digits: 2)").unwrap();
/// assert_eq!(components.len(), 1);
/// ```
pub fn parse_expression(text: &str) -> FormulaResult<Vec<Component>> {
    parse(&tokenize(text))
}

/// Parse a token stream into components
pub fn parse(tokens: &[Token]) -> FormulaResult<Vec<Component>> {
    let mut out: Vec<Component> = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        match token.kind {
            TokenKind::Number => {
                let (literal, next) = parse_number_literal(tokens, i)?;
                push_operand(&mut out, literal);
                i = next;
            }
            TokenKind::CurrencySymbol => {
                let (literal, next) = parse_currency_literal(tokens, i)?;
                push_operand(&mut out, literal);
                i = next;
            }
            TokenKind::Identifier if opens_call(tokens, i) => {
                let close = find_matching(tokens, i + 1)?;
                let args = parse_arguments(&token.text, &tokens[i + 2..close])?;
                push_operand(
                    &mut out,
                    Component::Function {
                        name: token.text.clone(),
                        args,
                    },
                );
                i = close + 1;
            }
            TokenKind::Identifier => {
                push_operand(&mut out, Component::Variable(normalize_name(&token.text)));
                i += 1;
            }
            TokenKind::LeftParen => {
                let close = find_matching(tokens, i)?;
                let inner = &tokens[i + 1..close];
                if inner.is_empty() {
                    return Err(FormulaError::EmptyGroup(token.start));
                }
                push_operand(&mut out, Component::Group(parse(inner)?));
                i = close + 1;
            }
            TokenKind::RightParen => {
                return Err(FormulaError::UnmatchedParenthesis(token.start));
            }
            TokenKind::Operator => {
                let op = Operator::from_symbol(&token.text).ok_or_else(|| unexpected(token))?;
                out.push(Component::Operator(op));
                i += 1;
            }
            TokenKind::Conversion => {
                let end = tokens[i + 1..]
                    .iter()
                    .position(|t| t.kind == TokenKind::Conversion)
                    .map_or(tokens.len(), |p| i + 1 + p);
                let target = parse_conversion_target(&tokens[i + 1..end])?;
                out.push(Component::Conversion(target));
                i = end;
            }
            TokenKind::Comma | TokenKind::Colon | TokenKind::Percent | TokenKind::UnitSuffix => {
                return Err(unexpected(token));
            }
        }
    }

    Ok(out)
}

/// Collapse internal whitespace runs to one space and trim
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Append an operand, joining it to a preceding operand with `*`
fn push_operand(out: &mut Vec<Component>, component: Component) {
    if out.last().is_some_and(Component::is_operand) {
        out.push(Component::Operator(Operator::Multiply));
    }
    out.push(component);
}

fn unexpected(token: &Token) -> FormulaError {
    let found = match token.kind {
        TokenKind::Number => "number",
        TokenKind::Operator => "operator",
        TokenKind::LeftParen | TokenKind::RightParen => "parenthesis",
        TokenKind::Comma => "comma",
        TokenKind::Colon => "colon",
        TokenKind::UnitSuffix => "unit",
        TokenKind::Identifier => "identifier",
        TokenKind::CurrencySymbol => "currency",
        TokenKind::Percent => "percent sign",
        TokenKind::Conversion => "conversion keyword",
    };
    FormulaError::UnexpectedToken {
        found: found.to_string(),
        text: token.text.clone(),
        offset: token.start,
    }
}

fn next_kind(tokens: &[Token], i: usize) -> Option<TokenKind> {
    tokens.get(i + 1).map(|t| t.kind)
}

/// Source text of a token run, with a single space wherever the input had a gap
fn source_text(tokens: &[Token]) -> String {
    let mut text = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && token.start > tokens[i - 1].end {
            text.push(' ');
        }
        text.push_str(&token.text);
    }
    text
}

/// Index of the `)` matching the `(` at `open`
fn find_matching(tokens: &[Token], open: usize) -> FormulaResult<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(FormulaError::UnmatchedParenthesis(tokens[open].start))
}

fn is_unit_word(tokens: &[Token], i: usize) -> bool {
    tokens.get(i).is_some_and(|t| {
        matches!(t.kind, TokenKind::UnitSuffix | TokenKind::Identifier) && t.text != "per"
    }) && !opens_call(tokens, i)
}

/// Furthest token a literal starting at `number` could extend to (exclusive)
fn literal_extent(tokens: &[Token], number: usize) -> usize {
    let mut end = number + 1;
    let mut after_unit = false;

    while let Some(token) = tokens.get(end) {
        let adjacent = end == number + 1;
        match token.kind {
            TokenKind::Percent if adjacent => return end + 1,
            TokenKind::CurrencySymbol if adjacent && token.text.chars().count() == 1 => {
                end += 1;
            }
            TokenKind::UnitSuffix | TokenKind::Identifier if adjacent && is_unit_word(tokens, end) => {
                end += 1;
                after_unit = true;
            }
            TokenKind::Identifier if token.text == "per" && is_unit_word(tokens, end + 1) => {
                end += 2;
                after_unit = true;
            }
            TokenKind::Operator if token.text == "/" && is_unit_word(tokens, end + 1) => {
                end += 2;
                after_unit = true;
            }
            TokenKind::Operator if token.text == "*" && after_unit && is_unit_word(tokens, end + 1) => {
                end += 2;
            }
            TokenKind::Operator if token.text == "^" && after_unit => {
                match tokens.get(end + 1) {
                    Some(t) if t.kind == TokenKind::Number => end += 2,
                    Some(t)
                        if t.is_operator("-")
                            && next_kind(tokens, end + 1) == Some(TokenKind::Number) =>
                    {
                        end += 3
                    }
                    _ => break,
                }
            }
            _ => break,
        }
    }
    end
}

/// Longest literal accepted by the literal parser, shrinking one token at a time
fn longest_literal(tokens: &[Token], start: usize, min_end: usize, max_end: usize) -> Option<(Component, usize)> {
    (min_end..=max_end).rev().find_map(|end| {
        let text = source_text(&tokens[start..end]);
        parse_literal(&text)
            .ok()
            .map(|value| (Component::Literal { text, value }, end))
    })
}

fn parse_number_literal(tokens: &[Token], start: usize) -> FormulaResult<(Component, usize)> {
    let max_end = literal_extent(tokens, start);
    if let Some(found) = longest_literal(tokens, start, start + 1, max_end) {
        return Ok(found);
    }
    let token = &tokens[start];
    match calcline_core::numeric::scan_number(&token.text) {
        Some((n, len)) if len == token.text.len() => Ok((
            Component::Literal {
                text: token.text.clone(),
                value: calcline_core::SemanticValue::Number(n),
            },
            start + 1,
        )),
        _ => Err(FormulaError::InvalidLiteral {
            text: token.text.clone(),
            offset: token.start,
        }),
    }
}

fn parse_currency_literal(tokens: &[Token], start: usize) -> FormulaResult<(Component, usize)> {
    let symbol = &tokens[start];
    if next_kind(tokens, start) != Some(TokenKind::Number) {
        return Err(unexpected(symbol));
    }
    let max_end = literal_extent(tokens, start + 1);
    longest_literal(tokens, start, start + 2, max_end).ok_or_else(|| unexpected(symbol))
}

fn parse_arguments(function: &str, tokens: &[Token]) -> FormulaResult<Vec<Argument>> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    // Split on top-level commas
    let mut pieces: Vec<&[Token]> = Vec::new();
    let mut depth = 0usize;
    let mut piece_start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                pieces.push(&tokens[piece_start..i]);
                piece_start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&tokens[piece_start..]);

    let mut args = Vec::with_capacity(pieces.len());
    for (index, piece) in pieces.into_iter().enumerate() {
        if piece.is_empty() {
            let comma = tokens
                .iter()
                .filter(|t| t.kind == TokenKind::Comma)
                .nth(index.saturating_sub(1))
                .unwrap_or(&tokens[0]);
            return Err(unexpected(comma));
        }
        args.push(parse_argument(function, piece)?);
    }
    Ok(args)
}

fn parse_argument(function: &str, tokens: &[Token]) -> FormulaResult<Argument> {
    let mut depth = 0usize;
    let mut colon = None;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => depth = depth.saturating_sub(1),
            TokenKind::Colon if depth == 0 => {
                if colon.is_some() {
                    return Err(invalid_argument(function, tokens));
                }
                colon = Some(i);
            }
            _ => {}
        }
    }

    match colon {
        None => Ok(Argument {
            name: None,
            components: parse(tokens)?,
        }),
        Some(1) if tokens[0].kind == TokenKind::Identifier && tokens.len() > 2 => Ok(Argument {
            name: Some(normalize_name(&tokens[0].text)),
            components: parse(&tokens[2..])?,
        }),
        Some(_) => Err(invalid_argument(function, tokens)),
    }
}

fn invalid_argument(function: &str, tokens: &[Token]) -> FormulaError {
    FormulaError::InvalidNamedArgument {
        function: function.to_string(),
        argument: source_text(tokens),
    }
}

fn parse_conversion_target(tokens: &[Token]) -> FormulaResult<ConversionTarget> {
    let text = source_text(tokens);
    if text.is_empty() {
        return Err(FormulaError::UnknownConversionTarget(text));
    }
    if text == "%" || text.eq_ignore_ascii_case("percent") {
        return Ok(ConversionTarget::Percent);
    }
    if let [token] = tokens {
        if token.kind == TokenKind::CurrencySymbol {
            let info = token
                .text
                .chars()
                .next()
                .and_then(currency::lookup_symbol)
                .or_else(|| currency::lookup_code(&token.text));
            if let Some(info) = info {
                return Ok(ConversionTarget::Currency(info.code.to_string()));
            }
        }
    }
    if let Some(info) = currency::lookup_code(&text) {
        return Ok(ConversionTarget::Currency(info.code.to_string()));
    }
    CompositeUnit::parse(&text)
        .map(ConversionTarget::Unit)
        .map_err(|_| FormulaError::UnknownConversionTarget(text))
}
