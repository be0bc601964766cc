use crate::domain::attempt::{Amount, PaymentAttempt};
use crate::domain::ports::CardValidator;
use crate::error::AuthError;
use chrono::{Datelike, NaiveDate, Utc};

/// Card-number, expiry and amount checks done locally before `init`.
///
/// Card numbers must hold 13 to 19 digits and pass the Luhn checksum.
/// Expiry dates are `MM/YY` and may not be before the current month.
#[derive(Debug, Clone, Default)]
pub struct LuhnCardValidator {
    today: Option<NaiveDate>,
}

impl LuhnCardValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A validator that judges expiry against a fixed date instead of the clock.
    pub fn at(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn validate_card_number(&self, card_number: &str) -> bool {
        if card_number.len() < 13 {
            return false;
        }
        let digits: String = card_number.chars().filter(char::is_ascii_digit).collect();
        (13..=19).contains(&digits.len()) && luhn_check(&digits)
    }

    pub fn validate_expiry_date(&self, expiry: &str) -> bool {
        let bytes = expiry.as_bytes();
        if bytes.len() != 5
            || bytes[2] != b'/'
            || !bytes[..2].iter().chain(&bytes[3..]).all(u8::is_ascii_digit)
        {
            return false;
        }
        let (Ok(month), Ok(year)) = (expiry[..2].parse::<u32>(), expiry[3..].parse::<i32>()) else {
            return false;
        };
        if !(1..=12).contains(&month) {
            return false;
        }

        let year = 2000 + year;
        let today = self.today();
        !(year < today.year() || (year == today.year() && month < today.month()))
    }
}

impl CardValidator for LuhnCardValidator {
    fn validate(&self, attempt: &PaymentAttempt) -> Result<(), AuthError> {
        if !self.validate_card_number(&attempt.card_number) {
            return Err(AuthError::ValidationError(
                "Please enter a valid card number".to_string(),
            ));
        }
        if let Some(expiry) = attempt.expiry_date.as_deref().filter(|e| !e.is_empty())
            && !self.validate_expiry_date(expiry)
        {
            return Err(AuthError::ValidationError(
                "Please enter a valid expiry date (MM/YY) that has not expired".to_string(),
            ));
        }
        Amount::new(attempt.amount)?;
        Ok(())
    }
}

/// Luhn mod-10 checksum over a string of ASCII digits.
pub fn luhn_check(digits: &str) -> bool {
    let mut sum = 0;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(mut digit) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    sum % 10 == 0
}
