//! Literal parsing: a single token group such as `155N`, `$0.15/h`, `9 L/min`,
//! `10%`, `100 EUR` or `2024-03-01` into a [`SemanticValue`]

use crate::currency;
use crate::error::{Error, Result};
use crate::numeric::scan_number;
use crate::unit::CompositeUnit;
use crate::value::SemanticValue;
use chrono::NaiveDate;
use lazy_regex::{regex_captures, regex_is_match};

/// Parse `text` as one literal value.
///
/// Fails with a parse error when the text is not exactly one literal; callers
/// fall back to treating the pieces separately.
pub fn parse_literal(text: &str) -> Result<SemanticValue> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::parse("empty literal"));
    }
    if let Some(date) = parse_date(text) {
        return date;
    }

    let (negative, rest) = match text.chars().next() {
        Some('-') => (true, text[1..].trim_start()),
        Some('+') => (false, text[1..].trim_start()),
        _ => (false, text),
    };

    let (mut code, rest) = strip_currency_prefix(rest);
    let (amount, consumed) =
        scan_number(rest).ok_or_else(|| Error::parse(format!("'{text}' is not a literal")))?;
    let amount = if negative { -amount } else { amount };
    let mut suffix = rest[consumed..].trim();

    if code.is_none() {
        if let Some((suffix_code, after)) = strip_currency_suffix(suffix) {
            code = Some(suffix_code);
            suffix = after;
        }
    }

    match (code, suffix) {
        (None, "") => Ok(SemanticValue::Number(amount)),
        (None, "%") => Ok(SemanticValue::Percentage(amount)),
        (Some(code), "") => Ok(SemanticValue::currency(code, amount)),
        (Some(code), unit_text) => {
            let unit = parse_rate_unit(unit_text, text)?;
            Ok(SemanticValue::CurrencyUnit {
                code: code.to_string(),
                amount,
                unit,
            })
        }
        (None, unit_text) => {
            let unit = parse_rate_unit(unit_text, text)?;
            Ok(SemanticValue::Quantity { amount, unit })
        }
    }
}

fn parse_date(text: &str) -> Option<Result<SemanticValue>> {
    if !regex_is_match!(r"^\d{4}-\d{2}-\d{2}$", text) {
        return None;
    }
    Some(
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(SemanticValue::Date)
            .map_err(|e| Error::parse(format!("invalid date '{text}': {e}"))),
    )
}

/// `$`, `€`, ... or an ISO code followed by whitespace and a digit
fn strip_currency_prefix(text: &str) -> (Option<&'static str>, &str) {
    if let Some(first) = text.chars().next() {
        if let Some(info) = currency::lookup_symbol(first) {
            return (Some(info.code), text[first.len_utf8()..].trim_start());
        }
    }
    if let Some((_, code, rest)) = regex_captures!(r"^([A-Z]{3})\s+(.*)$"s, text) {
        if let Some(info) = currency::lookup_code(code) {
            return (Some(info.code), rest);
        }
    }
    (None, text)
}

/// Trailing symbol (`5€`) or code (`5 EUR`, `5 EUR/h`)
fn strip_currency_suffix(text: &str) -> Option<(&'static str, &str)> {
    let first = text.chars().next()?;
    if let Some(info) = currency::lookup_symbol(first) {
        return Some((info.code, text[first.len_utf8()..].trim_start()));
    }
    let (_, code, rest) = regex_captures!(r"^([A-Z]{3})(\s*(?:/|per\s).*)?$"s, text)?;
    currency::lookup_code(code).map(|info| (info.code, rest.trim()))
}

/// Unit text after the amount. A leading `/` or `per` makes a rate (`/h` is
/// `h^-1`); `per` anywhere else reads as `/`.
fn parse_rate_unit(unit_text: &str, literal: &str) -> Result<CompositeUnit> {
    let normalized = normalize_per(unit_text);
    let normalized = match normalized.strip_prefix('/') {
        Some(rest) => format!("1/{}", bracket(rest.trim())),
        None => normalized,
    };
    CompositeUnit::parse(&normalized)
        .map_err(|e| Error::parse(format!("'{literal}' is not a literal: {e}")))
}

fn bracket(text: &str) -> String {
    if text.contains(['*', '/']) && !text.starts_with('(') {
        format!("({text})")
    } else {
        text.to_string()
    }
}

fn normalize_per(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, word) in text.split_whitespace().enumerate() {
        if word.eq_ignore_ascii_case("per") {
            out.push('/');
            continue;
        }
        if i > 0 && !out.ends_with('/') {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
