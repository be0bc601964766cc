use crate::domain::attempt::PaymentAttempt;
use crate::error::{Error, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// How the simulated 3DS method step ends for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodBehaviour {
    /// The callback frame posts `3DSMethodFinished` with the browser info.
    #[default]
    Finished,
    /// The callback frame posts `3DSMethodSkipped` with the browser info.
    Skipped,
    /// The 3DS Server posts `InitAuthTimedOut`.
    TimedOut,
    /// No frame ever posts; the fallback timer takes over.
    Silent,
}

/// One row of the attempts file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttemptRecord {
    pub card_number: String,
    pub expiry: Option<String>,
    pub amount: Decimal,
    /// `<auth status>` or `<auth status>:<challenge result status>`, e.g. `Y` or `C:N`.
    pub scenario: Option<String>,
    pub method: Option<MethodBehaviour>,
}

impl AttemptRecord {
    pub fn attempt(&self) -> PaymentAttempt {
        let attempt = PaymentAttempt::new(self.card_number.clone(), self.amount);
        match &self.expiry {
            Some(expiry) => attempt.with_expiry(expiry.clone()),
            None => attempt,
        }
    }

    pub fn method(&self) -> MethodBehaviour {
        self.method.unwrap_or_default()
    }
}

/// Reads payment attempts from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// so the trailing optional columns may be left out.
pub struct AttemptReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> AttemptReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes one `AttemptRecord` per row.
    pub fn attempts(self) -> impl Iterator<Item = Result<AttemptRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(Error::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "card_number, expiry, amount, scenario, method\n\
                    4111111111111111, 12/29, 10.00, C:N, silent\n\
                    5555555555554444, , 1.5\n";
        let reader = AttemptReader::new(data.as_bytes());
        let records: Vec<Result<AttemptRecord>> = reader.attempts().collect();

        assert_eq!(records.len(), 2);
        let first = records[0].as_ref().unwrap();
        assert_eq!(first.expiry.as_deref(), Some("12/29"));
        assert_eq!(first.amount, dec!(10.00));
        assert_eq!(first.scenario.as_deref(), Some("C:N"));
        assert_eq!(first.method(), MethodBehaviour::Silent);

        let second = records[1].as_ref().unwrap();
        assert_eq!(second.expiry, None);
        assert_eq!(second.scenario, None);
        assert_eq!(second.method(), MethodBehaviour::Finished);
        assert_eq!(second.attempt().expiry_date, None);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "card_number, expiry, amount, scenario, method\n\
                    4111111111111111, 12/29, ten, Y, finished";
        let reader = AttemptReader::new(data.as_bytes());
        let records: Vec<Result<AttemptRecord>> = reader.attempts().collect();

        assert!(records[0].is_err());
    }

    #[test]
    fn test_unknown_method_is_an_error() {
        let data = "card_number, expiry, amount, scenario, method\n\
                    4111111111111111, 12/29, 1, Y, carrier-pigeon";
        let reader = AttemptReader::new(data.as_bytes());
        assert!(reader.attempts().next().unwrap().is_err());
    }
}
