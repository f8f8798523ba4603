//! Display-currency conversion.
//!
//! Every cost the planner stores is in EUR. Conversion happens only when a
//! response view is rendered; the stored EUR amounts are never touched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    #[default]
    Eur,
    Usd,
    Gbp,
    Chf,
    Sek,
    Nok,
    Dkk,
    Pln,
    Czk,
    Jpy,
    Aud,
    Cad,
}

enum SymbolPosition {
    Prefix(&'static str),
    Suffix(&'static str),
}

impl CurrencyCode {
    pub const ALL: [CurrencyCode; 12] = [
        CurrencyCode::Eur,
        CurrencyCode::Usd,
        CurrencyCode::Gbp,
        CurrencyCode::Chf,
        CurrencyCode::Sek,
        CurrencyCode::Nok,
        CurrencyCode::Dkk,
        CurrencyCode::Pln,
        CurrencyCode::Czk,
        CurrencyCode::Jpy,
        CurrencyCode::Aud,
        CurrencyCode::Cad,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyCode::Eur => "EUR",
            CurrencyCode::Usd => "USD",
            CurrencyCode::Gbp => "GBP",
            CurrencyCode::Chf => "CHF",
            CurrencyCode::Sek => "SEK",
            CurrencyCode::Nok => "NOK",
            CurrencyCode::Dkk => "DKK",
            CurrencyCode::Pln => "PLN",
            CurrencyCode::Czk => "CZK",
            CurrencyCode::Jpy => "JPY",
            CurrencyCode::Aud => "AUD",
            CurrencyCode::Cad => "CAD",
        }
    }

    /// Units of this currency per 1 EUR.
    pub fn rate_from_eur(&self) -> f64 {
        match self {
            CurrencyCode::Eur => 1.0,
            CurrencyCode::Usd => 1.08,
            CurrencyCode::Gbp => 0.85,
            CurrencyCode::Chf => 0.95,
            CurrencyCode::Sek => 11.2,
            CurrencyCode::Nok => 11.5,
            CurrencyCode::Dkk => 7.46,
            CurrencyCode::Pln => 4.3,
            CurrencyCode::Czk => 25.2,
            CurrencyCode::Jpy => 162.0,
            CurrencyCode::Aud => 1.65,
            CurrencyCode::Cad => 1.47,
        }
    }

    fn symbol(&self) -> SymbolPosition {
        match self {
            CurrencyCode::Eur => SymbolPosition::Prefix("€"),
            CurrencyCode::Usd => SymbolPosition::Prefix("$"),
            CurrencyCode::Gbp => SymbolPosition::Prefix("£"),
            CurrencyCode::Chf => SymbolPosition::Prefix("CHF "),
            CurrencyCode::Sek | CurrencyCode::Nok | CurrencyCode::Dkk => {
                SymbolPosition::Suffix(" kr")
            }
            CurrencyCode::Pln => SymbolPosition::Suffix(" zł"),
            CurrencyCode::Czk => SymbolPosition::Suffix(" Kč"),
            CurrencyCode::Jpy => SymbolPosition::Prefix("¥"),
            CurrencyCode::Aud => SymbolPosition::Prefix("A$"),
            CurrencyCode::Cad => SymbolPosition::Prefix("C$"),
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        CurrencyCode::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == upper)
            .ok_or_else(|| format!("Unsupported currency: {}", s))
    }
}

pub fn convert_from_eur(amount_eur: f64, currency: CurrencyCode) -> f64 {
    amount_eur * currency.rate_from_eur()
}

/// Render an EUR amount in the display currency, rounded to whole units
/// with thousands separators.
pub fn format_price(amount_eur: f64, currency: CurrencyCode) -> String {
    let converted = convert_from_eur(amount_eur, currency).round();
    let digits = group_thousands(converted.abs() as u64);
    let sign = if converted < 0.0 { "-" } else { "" };

    match currency.symbol() {
        SymbolPosition::Prefix(symbol) => format!("{}{}{}", sign, symbol, digits),
        SymbolPosition::Suffix(symbol) => format!("{}{}{}", sign, digits, symbol),
    }
}

/// Inverse of [`format_price`]: read the numeric portion back and convert it
/// to EUR.
pub fn parse_price(formatted: &str, currency: CurrencyCode) -> Option<f64> {
    let digits: String = formatted.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let value: f64 = digits.parse().ok()?;
    let value = if formatted.trim_start().starts_with('-') {
        -value
    } else {
        value
    };
    Some(value / currency.rate_from_eur())
}

fn group_thousands(value: u64) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
