use crate::error::AuthError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A strictly positive purchase amount in major currency units.
///
/// Construction also checks that the amount can be expressed in minor units.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, AuthError> {
        if value <= Decimal::ZERO {
            return Err(AuthError::ValidationError(
                "Please enter a valid amount".to_string(),
            ));
        }
        format_amount(value)?;
        Ok(Self(value))
    }

    /// The amount in minor units as sent to the 3DS Server.
    pub fn minor_units(&self) -> Result<String, AuthError> {
        format_amount(self.0)
    }
}

/// Converts a major-unit amount into an integer count of minor units.
///
/// Multiplies by 100 and rounds half away from zero, so `19.995` becomes `"2000"`.
/// Amounts too large for a `Decimal` once scaled are a validation error.
pub fn format_amount(amount: Decimal) -> Result<String, AuthError> {
    let scaled = amount.checked_mul(Decimal::ONE_HUNDRED).ok_or_else(|| {
        AuthError::ValidationError("Please enter a valid amount".to_string())
    })?;
    Ok(scaled
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_string())
}

/// Converts an `MM/YY` expiry into the `YYMM` form the server expects.
pub fn format_expiry(expiry: &str) -> Option<String> {
    let (month, year) = expiry.split_once('/')?;
    let (month, year) = (month.trim(), year.trim());
    if month.is_empty() || year.is_empty() || year.contains('/') {
        return None;
    }
    Some(format!("{year}{month}"))
}

/// Masks all but the first six and last four digits of a card number.
pub fn mask_card_number(card_number: &str) -> String {
    let digits: String = card_number.chars().filter(char::is_ascii_digit).collect();
    if digits.len() <= 10 {
        return "*".repeat(digits.len());
    }
    format!(
        "{}{}{}",
        &digits[..6],
        "*".repeat(digits.len() - 10),
        &digits[digits.len() - 4..]
    )
}

/// Caller input for one authentication attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentAttempt {
    pub card_number: String,
    /// Card expiry as `MM/YY`, validated only when present.
    pub expiry_date: Option<String>,
    pub amount: Decimal,
    /// Merchant fields forwarded verbatim with `init` and `auth`.
    pub extra_fields: Map<String, Value>,
}

impl PaymentAttempt {
    pub fn new(card_number: impl Into<String>, amount: Decimal) -> Self {
        Self {
            card_number: card_number.into(),
            expiry_date: None,
            amount,
            extra_fields: Map::new(),
        }
    }

    pub fn with_expiry(mut self, expiry_date: impl Into<String>) -> Self {
        self.expiry_date = Some(expiry_date.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_fields.insert(key.into(), value.into());
        self
    }

    /// The card number with whitespace removed, as sent to the server.
    pub fn normalized_card_number(&self) -> String {
        self.card_number
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    }
}
