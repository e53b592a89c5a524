use crate::error::BillingError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currencies an invoice or customer can be denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum Currency {
    Eur,
    Usd,
    Dkk,
    Sek,
    Gbp,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Dkk => "DKK",
            Currency::Sek => "SEK",
            Currency::Gbp => "GBP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            "DKK" => Ok(Currency::Dkk),
            "SEK" => Ok(Currency::Sek),
            "GBP" => Ok(Currency::Gbp),
            other => Err(BillingError::ValidationError(format!(
                "Unsupported currency: {other}"
            ))),
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = BillingError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        code.parse()
    }
}

/// A positive monetary amount in a single currency.
///
/// Wraps `rust_decimal::Decimal` so invoice amounts never go through floating
/// point. No conversion between currencies is provided.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MoneyRecord")]
pub struct Money {
    value: Decimal,
    currency: Currency,
}

#[derive(Deserialize)]
struct MoneyRecord {
    value: Decimal,
    currency: Currency,
}

impl TryFrom<MoneyRecord> for Money {
    type Error = BillingError;

    fn try_from(record: MoneyRecord) -> Result<Self, Self::Error> {
        Money::new(record.value, record.currency)
    }
}

impl Money {
    pub fn new(value: Decimal, currency: Currency) -> Result<Self, BillingError> {
        if value > Decimal::ZERO {
            Ok(Self { value, currency })
        } else {
            Err(BillingError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}
