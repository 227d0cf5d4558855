//! Currency table and exchange-rate resolution

mod fx;

pub use fx::{convert, FxProvider, FxRatesSnapshot, FxResolver, ManualRates, RateSource};

/// A recognised currency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyInfo {
    /// ISO 4217 code
    pub code: &'static str,
    /// Display symbol, if the currency has a distinctive one
    pub symbol: Option<&'static str>,
}

macro_rules! currency {
    ($code:expr) => {
        CurrencyInfo {
            code: $code,
            symbol: None,
        }
    };
    ($code:expr, $symbol:expr) => {
        CurrencyInfo {
            code: $code,
            symbol: Some($symbol),
        }
    };
}

/// Currencies the engine recognises by code or symbol
pub static CURRENCIES: &[CurrencyInfo] = &[
    currency!("USD", "$"),
    currency!("EUR", "€"),
    currency!("GBP", "£"),
    currency!("JPY", "¥"),
    currency!("INR", "₹"),
    currency!("KRW", "₩"),
    currency!("RUB", "₽"),
    currency!("TRY", "₺"),
    currency!("UAH", "₴"),
    currency!("ILS", "₪"),
    currency!("NGN", "₦"),
    currency!("VND", "₫"),
    currency!("PHP", "₱"),
    currency!("BTC", "₿"),
    currency!("CNY"),
    currency!("CAD"),
    currency!("AUD"),
    currency!("NZD"),
    currency!("CHF"),
    currency!("SEK"),
    currency!("NOK"),
    currency!("DKK"),
    currency!("PLN"),
    currency!("CZK"),
    currency!("HUF"),
    currency!("RON"),
    currency!("BGN"),
    currency!("BRL"),
    currency!("MXN"),
    currency!("ARS"),
    currency!("ZAR"),
    currency!("SGD"),
    currency!("HKD"),
    currency!("TWD"),
    currency!("THB"),
    currency!("IDR"),
    currency!("MYR"),
    currency!("AED"),
    currency!("SAR"),
    currency!("ISK"),
];

/// Look up a currency by its ISO code (exact, upper-case)
pub fn lookup_code(code: &str) -> Option<&'static CurrencyInfo> {
    CURRENCIES.iter().find(|c| c.code == code)
}

/// Look up a currency by its symbol character
pub fn lookup_symbol(symbol: char) -> Option<&'static CurrencyInfo> {
    CURRENCIES
        .iter()
        .find(|c| c.symbol.is_some_and(|s| s.starts_with(symbol) && s.chars().count() == 1))
}

/// True if `c` is a currency symbol character
pub fn is_currency_symbol(c: char) -> bool {
    lookup_symbol(c).is_some()
}

/// True if `text` is a recognised currency code
pub fn is_currency_code(text: &str) -> bool {
    lookup_code(text).is_some()
}

/// Display prefix for a code: its symbol when it has one
pub fn display_symbol(code: &str) -> Option<&'static str> {
    lookup_code(code).and_then(|c| c.symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup_symbol('$').map(|c| c.code), Some("USD"));
        assert_eq!(lookup_symbol('€').map(|c| c.code), Some("EUR"));
        assert_eq!(lookup_code("CHF").and_then(|c| c.symbol), None);
        assert!(lookup_code("usd").is_none());
        assert!(!is_currency_symbol('#'));
    }
}
