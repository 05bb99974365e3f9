//! Permissive field coercions.
//!
//! Every coercion is total: malformed input becomes [`Value::Null`] rather
//! than an error. Only the field count of a row is ever treated as fatal.

use chrono::NaiveDate;

use crate::Value;

/// How a raw field is turned into a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Keep the raw string; empty becomes null.
    Text,
    /// Base-10 integer.
    Integer,
    /// Decimal number using a comma as the decimal separator.
    Float,
    /// `YYYYMMDD` calendar date.
    Date,
    /// Digits only, with every other character stripped.
    Digits,
    /// Brazilian postal code: exactly eight digits.
    PostalCode,
    /// Federative unit code of at most two characters.
    StateCode,
}

impl Coercion {
    /// Apply the coercion to `raw`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cnpj_core::{Coercion, Value};
    ///
    /// assert_eq!(Coercion::Float.apply("1.234,56"), Value::Float(1234.56));
    /// assert_eq!(Coercion::Date.apply(""), Value::Null);
    /// assert_eq!(Coercion::PostalCode.apply("01310-100"), Value::Text("01310100".into()));
    /// ```
    #[must_use]
    pub fn apply(self, raw: &str) -> Value {
        match self {
            Self::Text => text(raw),
            Self::Integer => integer(raw),
            Self::Float => float(raw),
            Self::Date => date(raw),
            Self::Digits => digits(raw),
            Self::PostalCode => postal_code(raw),
            Self::StateCode => state_code(raw),
        }
    }
}

/// Keep non-empty text as is.
#[must_use]
pub fn text(raw: &str) -> Value {
    if raw.is_empty() {
        Value::Null
    } else {
        Value::Text(raw.to_owned())
    }
}

/// Parse a base-10 integer, ignoring surrounding whitespace.
#[must_use]
pub fn integer(raw: &str) -> Value {
    raw.trim().parse::<i64>().map_or(Value::Null, Value::Integer)
}

/// Parse a decimal number written with a comma as decimal separator.
///
/// When a comma is present any dots are thousands separators and are dropped
/// before the comma becomes the decimal point. Without a comma the value is
/// parsed verbatim. Non-finite results are rejected.
#[must_use]
pub fn float(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    let normalised = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_owned()
    };
    match normalised.parse::<f64>() {
        Ok(value) if value.is_finite() => Value::Float(value),
        _ => Value::Null,
    }
}

/// Parse an eight-digit `YYYYMMDD` date.
///
/// Anything else, including the all-zero placeholder the publisher uses for
/// missing dates, becomes null.
#[must_use]
pub fn date(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.len() != 8 || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return Value::Null;
    }
    let (Some(year), Some(month), Some(day)) = (
        trimmed.get(..4).and_then(|part| part.parse::<i32>().ok()),
        trimmed.get(4..6).and_then(|part| part.parse::<u32>().ok()),
        trimmed.get(6..).and_then(|part| part.parse::<u32>().ok()),
    ) else {
        return Value::Null;
    };
    NaiveDate::from_ymd_opt(year, month, day).map_or(Value::Null, Value::Date)
}

/// Strip every non-digit; an empty remainder becomes null.
#[must_use]
pub fn digits(raw: &str) -> Value {
    let kept: String = raw.chars().filter(char::is_ascii_digit).collect();
    if kept.is_empty() {
        Value::Null
    } else {
        Value::Text(kept)
    }
}

/// Keep the digits of a postal code only when exactly eight remain.
#[must_use]
pub fn postal_code(raw: &str) -> Value {
    match digits(raw) {
        Value::Text(kept) if kept.len() == 8 => Value::Text(kept),
        _ => Value::Null,
    }
}

/// Keep a state code only when it is at most two characters long.
#[must_use]
pub fn state_code(raw: &str) -> Value {
    if raw.chars().count() <= 2 {
        text(raw)
    } else {
        Value::Null
    }
}
