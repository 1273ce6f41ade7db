//! Error taxonomy shared by the codec, the reconciler and every bank parser.

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::input::InputKind;

/// Text that is not a valid amount once separators and sign markers are removed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed amount {text:?}")]
pub struct AmountFormatError {
    pub text: String,
}

impl AmountFormatError {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// What went wrong while reconciling one transaction against the running balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// The printed balance disagrees with `previous - debit + credit`.
    Balance { printed: Decimal, computed: Decimal },
    /// Neither `previous + amount` nor `previous - amount` lands on the printed balance.
    Unclassifiable {
        previous: Option<Decimal>,
        amount: Decimal,
        printed: Decimal,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Balance { printed, computed } => {
                write!(f, "printed balance {printed}, computed {computed}")
            }
            Mismatch::Unclassifiable {
                previous: Some(previous),
                amount,
                printed,
            } => write!(
                f,
                "amount {amount} is neither a debit nor a credit between {previous} and {printed}"
            ),
            Mismatch::Unclassifiable {
                previous: None,
                amount,
                printed,
            } => write!(
                f,
                "amount {amount} with balance {printed} has no previous balance to compare against"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    /// The external text/table extractor failed. Never retried by the core.
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("unknown bank: {0:?}")]
    UnknownBank(String),

    /// The statement layout did not match the bank's expectations.
    #[error("{bank}: no statement section found (looked for {marker:?})")]
    SectionNotFound { bank: String, marker: String },

    #[error("{bank}: cannot reconcile {date:?} {line:?}: {mismatch}")]
    Reconciliation {
        bank: String,
        date: String,
        line: String,
        mismatch: Mismatch,
    },

    #[error(transparent)]
    AmountFormat(#[from] AmountFormatError),

    #[error("{bank} expects {expected} input, got {actual}")]
    UnsupportedInput {
        bank: String,
        expected: InputKind,
        actual: InputKind,
    },
}

impl StatementError {
    pub fn section_not_found(bank: impl Into<String>, marker: impl Into<String>) -> Self {
        StatementError::SectionNotFound {
            bank: bank.into(),
            marker: marker.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reconciliation_message_carries_context() {
        let err = StatementError::Reconciliation {
            bank: "Credicoop".into(),
            date: "03/05/24".into(),
            line: "TRANSF. RECIBIDA".into(),
            mismatch: Mismatch::Balance {
                printed: dec!(100.00),
                computed: dec!(90.00),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("Credicoop"));
        assert!(msg.contains("03/05/24"));
        assert!(msg.contains("printed balance 100.00, computed 90.00"));
    }

    #[test]
    fn test_amount_error_converts() {
        let err: StatementError = AmountFormatError::new("12,3,4").into();
        assert_eq!(err.to_string(), "malformed amount \"12,3,4\"");
    }
}
