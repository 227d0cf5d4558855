//! Exchange-rate lookup over in-document rates and a fetched snapshot

use super::lookup_code;
use crate::error::{Error, Result};
use crate::value::SemanticValue;
use ahash::AHashMap;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Service an FX snapshot was fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FxProvider {
    Ecb,
    OpenExchangeRates,
    ExchangeRateHost,
    #[default]
    #[cfg_attr(feature = "serde", serde(other))]
    Other,
}

/// Cached exchange rates supplied by the host.
///
/// `rates[code]` is the amount of `code` worth one unit of `base`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct FxRatesSnapshot {
    pub base: String,
    pub rates: HashMap<String, f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub provider: FxProvider,
    /// Fetch time, epoch milliseconds
    #[cfg_attr(feature = "serde", serde(default))]
    pub fetched_at: i64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub source_date: Option<String>,
}

impl FxRatesSnapshot {
    /// Create a snapshot from a base code and rate table
    pub fn new<S: Into<String>>(base: S, rates: HashMap<String, f64>) -> Self {
        Self {
            base: base.into(),
            rates,
            ..Default::default()
        }
    }

    fn rate_for(&self, code: &str) -> Option<f64> {
        if code == self.base {
            return Some(1.0);
        }
        self.rates
            .get(code)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
    }

    /// Units of `to` per unit of `from`, triangulated through the base currency
    pub fn rate(&self, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }
        Some(self.rate_for(to)? / self.rate_for(from)?)
    }
}

/// Exchange rates declared in the document.
///
/// A variable named after a currency code holding a Currency value declares
/// `1 <name> = <value>`.
#[derive(Debug, Clone, Default)]
pub struct ManualRates {
    rates: AHashMap<(String, String), f64>,
}

impl ManualRates {
    /// Create an empty rate table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `1 from = rate to`
    pub fn insert(&mut self, from: &str, to: &str, rate: f64) {
        if rate.is_finite() && rate > 0.0 && from != to {
            self.rates.insert((from.to_string(), to.to_string()), rate);
        }
    }

    /// Collect declarations from `(name, value)` pairs
    pub fn from_variables<'a, I>(variables: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a SemanticValue)>,
    {
        let mut manual = Self::new();
        for (name, value) in variables {
            let name = name.trim();
            if lookup_code(name).is_none() {
                continue;
            }
            if let SemanticValue::Currency { code, amount } = value {
                manual.insert(name, code, *amount);
            }
        }
        manual
    }

    /// Direct rate, or the inverse of a reverse-direction declaration
    pub fn rate(&self, from: &str, to: &str) -> Option<f64> {
        if let Some(rate) = self.rates.get(&(from.to_string(), to.to_string())) {
            return Some(*rate);
        }
        self.rates
            .get(&(to.to_string(), from.to_string()))
            .map(|rate| 1.0 / rate)
    }

    /// Number of declared rates
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// True if nothing was declared
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Where a resolved rate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    Identity,
    Manual,
    Snapshot(FxProvider),
}

/// Manual rates with a snapshot fallback
#[derive(Debug, Clone, Copy)]
pub struct FxResolver<'a> {
    manual: &'a ManualRates,
    snapshot: Option<&'a FxRatesSnapshot>,
}

impl<'a> FxResolver<'a> {
    /// Create a resolver
    pub fn new(manual: &'a ManualRates, snapshot: Option<&'a FxRatesSnapshot>) -> Self {
        Self { manual, snapshot }
    }

    /// Units of `to` per unit of `from` and the source that supplied it
    pub fn rate(&self, from: &str, to: &str) -> Result<(f64, RateSource)> {
        if from == to {
            return Ok((1.0, RateSource::Identity));
        }
        if let Some(rate) = self.manual.rate(from, to) {
            return Ok((rate, RateSource::Manual));
        }
        if let Some(snapshot) = self.snapshot {
            if let Some(rate) = snapshot.rate(from, to) {
                return Ok((rate, RateSource::Snapshot(snapshot.provider)));
            }
        }
        Err(Error::conversion(format!(
            "no exchange rate available from {from} to {to}"
        )))
    }

    /// Convert a Currency or Currency-Unit value into `target`
    pub fn convert(&self, value: &SemanticValue, target: &str) -> Result<SemanticValue> {
        let rate_of = |from: &str| -> Result<f64> {
            let (rate, source) = self.rate(from, target)?;
            tracing::debug!(from, to = target, rate, ?source, "resolved exchange rate");
            Ok(rate)
        };

        match value {
            SemanticValue::Currency { code, amount } => Ok(SemanticValue::Currency {
                code: target.to_string(),
                amount: amount * rate_of(code)?,
            }),
            SemanticValue::CurrencyUnit { code, amount, unit } => {
                Ok(SemanticValue::CurrencyUnit {
                    code: target.to_string(),
                    amount: amount * rate_of(code)?,
                    unit: unit.clone(),
                })
            }
            SemanticValue::Error(e) => Err(e.clone()),
            other => Err(Error::unsupported(&format!("to {target}"), other.type_tag())),
        }
    }
}

/// Convert a Currency or Currency-Unit value into `target`.
///
/// Manual rates win over the snapshot; same-code conversion is the identity.
pub fn convert(
    value: &SemanticValue,
    target: &str,
    manual: &ManualRates,
    snapshot: Option<&FxRatesSnapshot>,
) -> Result<SemanticValue> {
    FxResolver::new(manual, snapshot).convert(value, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(amount: f64) -> SemanticValue {
        SemanticValue::Currency {
            code: "USD".into(),
            amount,
        }
    }

    fn snapshot() -> FxRatesSnapshot {
        let mut rates = HashMap::new();
        rates.insert("EUR".to_string(), 0.9);
        rates.insert("GBP".to_string(), 0.8);
        FxRatesSnapshot::new("USD", rates)
    }

    #[test]
    fn test_identity() {
        let out = convert(&usd(5.0), "USD", &ManualRates::new(), None).unwrap();
        assert_eq!(out, usd(5.0));
    }

    #[test]
    fn test_snapshot_triangulation() {
        let snap = snapshot();
        assert_eq!(snap.rate("USD", "EUR"), Some(0.9));
        let eur_gbp = snap.rate("EUR", "GBP").unwrap();
        assert!((eur_gbp - 0.8 / 0.9).abs() < 1e-12);
        assert_eq!(snap.rate("USD", "JPY"), None);
    }

    #[test]
    fn test_manual_rate_wins() {
        let eur = SemanticValue::Currency {
            code: "USD".into(),
            amount: 1.25,
        };
        let manual = ManualRates::from_variables([("EUR", &eur)]);
        let snap = snapshot();
        let eur_value = SemanticValue::Currency {
            code: "EUR".into(),
            amount: 10.0,
        };
        let out = convert(&eur_value, "USD", &manual, Some(&snap)).unwrap();
        assert_eq!(out, usd(12.5));

        // Reverse direction is inverted
        let back = convert(&usd(12.5), "EUR", &manual, Some(&snap)).unwrap();
        match back {
            SemanticValue::Currency { code, amount } => {
                assert_eq!(code, "EUR");
                assert!((amount - 10.0).abs() < 1e-9);
            }
            other => panic!("expected currency, got {other:?}"),
        }
    }

    #[test]
    fn test_non_currency_names_ignored() {
        let v = usd(2.0);
        let manual = ManualRates::from_variables([("price", &v), ("eur", &v)]);
        assert!(manual.is_empty());
    }

    #[test]
    fn test_missing_rate_names_both_codes() {
        let err = convert(&usd(1.0), "JPY", &ManualRates::new(), None).unwrap_err();
        match err {
            Error::Conversion(msg) => {
                assert!(msg.contains("USD"));
                assert!(msg.contains("JPY"));
            }
            other => panic!("expected conversion error, got {other:?}"),
        }
    }
}
