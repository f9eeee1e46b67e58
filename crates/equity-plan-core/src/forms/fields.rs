//! Typed wrappers over the raw strings a form input hands back.
//!
//! Inputs are live-typed, so half-finished values are normal. Each wrapper
//! keeps the raw text for display and exposes a coercion that never fails:
//! counts default to zero, prices to zero, dates to `None`.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::{format_iso_date, parse_iso_date};
use crate::types::{CalendarDate, Money, Shares};

/// A share-count field. Non-digit characters are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digits(String);

impl Digits {
    pub fn new(raw: impl Into<String>) -> Self {
        Digits(raw.into())
    }

    pub fn from_count(count: Shares) -> Self {
        Digits(count.to_string())
    }

    pub fn raw(&self) -> &str {
        &self.0
    }

    /// The digits only, as the input should display them.
    pub fn normalized(&self) -> String {
        self.0.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    /// Coerced count: empty is 0, values past `u64::MAX` saturate.
    pub fn value(&self) -> Shares {
        self.0
            .chars()
            .filter_map(|c| c.to_digit(10))
            .fold(0, |acc: Shares, d| acc.saturating_mul(10).saturating_add(Shares::from(d)))
    }

    pub fn is_empty(&self) -> bool {
        self.normalized().is_empty()
    }
}

/// A per-share price field (strike or purchase).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoneyInput(String);

impl MoneyInput {
    pub fn new(raw: impl Into<String>) -> Self {
        MoneyInput(raw.into())
    }

    pub fn from_amount(amount: Money) -> Self {
        MoneyInput(amount.to_string())
    }

    pub fn raw(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Parsed amount. `$`, `,`, `_` and whitespace are ignored; anything
    /// unparseable or negative is `None`.
    pub fn parsed(&self) -> Option<Money> {
        let cleaned: String = self
            .0
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | '_') && !c.is_whitespace())
            .collect();
        if cleaned.is_empty() {
            return None;
        }
        let amount = Decimal::from_str(&cleaned).ok()?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return None;
        }
        Some(amount)
    }

    /// Coerced amount, zero when empty or invalid.
    pub fn amount(&self) -> Money {
        self.parsed().unwrap_or(Decimal::ZERO)
    }

    pub fn is_positive(&self) -> bool {
        self.amount() > Decimal::ZERO
    }
}

/// A native date-input value, `YYYY-MM-DD` or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateInput(String);

impl DateInput {
    pub fn new(raw: impl Into<String>) -> Self {
        DateInput(raw.into())
    }

    pub fn from_date(date: CalendarDate) -> Self {
        DateInput(format_iso_date(date))
    }

    pub fn raw(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn date(&self) -> Option<CalendarDate> {
        parse_iso_date(&self.0)
    }
}

/// A form value tagged with how it coerces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FormValue {
    Digits(Digits),
    Money(MoneyInput),
    Date(DateInput),
}

impl FormValue {
    /// The string handed back to the input element.
    pub fn text(&self) -> &str {
        match self {
            FormValue::Digits(v) => v.raw(),
            FormValue::Money(v) => v.raw(),
            FormValue::Date(v) => v.raw(),
        }
    }
}
