//! Bank-specific statement parsers.
//!
//! Every parser turns one document into raw, bank-shaped records (amounts
//! still in the bank's printed format) grouped per account, and maps them into
//! canonical rows through its [`BankRecord`] implementation.

use std::sync::LazyLock;

use regex::Regex;
use resumen_core::{
    BankRecord, Decimal, InputKind, Movement, NumberStyle, Section, StatementError,
    StatementInput, TableCell, format_amount, parse_optional_amount_with,
};
use tracing::debug;

pub mod banco_macro;
pub mod bbva;
pub mod bpn;
pub mod comafi;
pub mod credicoop;
pub mod galicia;
pub mod header_table;
pub mod hsbc;
pub mod icbc;
pub mod mercadopago;
pub mod nacion;
pub mod patagonia;
pub mod roela;
pub mod santander;
pub mod supervielle;

/// Continuation lines absorbed into one record before the rest are dropped.
pub const DEFAULT_CONTINUATION_CAP: usize = 10;

/// Continuation lines admitted for the record being built: at most `cap`
/// after its own line.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ContinuationBudget {
    cap: usize,
    used: usize,
}

impl ContinuationBudget {
    pub(crate) fn new(cap: usize) -> Self {
        Self { cap, used: 0 }
    }

    /// Start a new record.
    pub(crate) fn reset(&mut self) {
        self.used = 0;
    }

    /// Whether `line` may join the current record. Refused lines are logged.
    pub(crate) fn admit(&mut self, bank: &str, line: &str) -> bool {
        if self.used >= self.cap {
            debug!(bank, line, "continuation cap reached; line dropped");
            return false;
        }
        self.used += 1;
        true
    }
}

pub trait StatementParser {
    type Record: BankRecord;

    /// Display name used in errors and logs.
    const BANK: &'static str;

    fn input_kind(&self) -> InputKind;

    /// Raw records, one list per account section.
    fn parse_records(
        &self,
        input: &StatementInput,
    ) -> Result<Vec<Vec<Self::Record>>, StatementError>;

    fn parse(&self, input: &StatementInput) -> Result<Vec<Section>, StatementError> {
        self.parse_records(input)?
            .iter()
            .map(|section| Self::Record::canonicalize(section))
            .collect()
    }
}

pub(crate) fn expect_pages<'a>(
    bank: &str,
    input: &'a StatementInput,
) -> Result<&'a [String], StatementError> {
    match input {
        StatementInput::Pages(pages) => Ok(pages),
        other => Err(unsupported(bank, InputKind::PageText, other)),
    }
}

pub(crate) fn expect_cells<'a>(
    bank: &str,
    input: &'a StatementInput,
) -> Result<&'a [TableCell], StatementError> {
    match input {
        StatementInput::Cells(cells) => Ok(cells),
        other => Err(unsupported(bank, InputKind::TableCells, other)),
    }
}

pub(crate) fn unsupported(bank: &str, expected: InputKind, actual: &StatementInput) -> StatementError {
    StatementError::UnsupportedInput {
        bank: bank.to_string(),
        expected,
        actual: actual.kind(),
    }
}

/// `31.430,00`, `99.918,00-`: a grouped Argentine amount with an optional trailing sign.
pub(crate) static AR_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}(?:\.\d{3})*,\d{2}-?").expect("amount regex"));

/// Parse an optional amount column in the Argentine convention.
pub(crate) fn amount(text: &str) -> Result<Option<Decimal>, StatementError> {
    Ok(parse_optional_amount_with(text, NumberStyle::Argentine)?)
}

/// Parse a debit column, printed with or without a minus sign, as a magnitude.
pub(crate) fn debit_amount(text: &str) -> Result<Option<Decimal>, StatementError> {
    Ok(amount(text)?.map(|d| d.abs()))
}

pub(crate) fn format_optional(value: Option<Decimal>) -> String {
    value.map(format_amount).unwrap_or_default()
}

/// Debit and credit column texts of an inferred movement.
pub(crate) fn side_texts(movement: Movement) -> (String, String) {
    (format_optional(movement.debit), format_optional(movement.credit))
}

/// Lowercase and strip Spanish diacritics: `"Débito"` -> `"debito"`.
pub(crate) fn fold(text: &str) -> String {
    text.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' => 'a',
            'é' | 'è' => 'e',
            'í' | 'ì' => 'i',
            'ó' | 'ò' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_shared_amount_regex() {
        let found: Vec<_> = AR_AMOUNT
            .find_iter("02/05 PAGO 1.234,56 99.918,00- 12")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["1.234,56", "99.918,00-"]);
    }

    #[test]
    fn test_debit_amount_is_magnitude() {
        assert_eq!(debit_amount("-5.000,00").unwrap(), Some(dec!(5000.00)));
        assert_eq!(debit_amount("").unwrap(), None);
    }

    #[test]
    fn test_continuation_budget() {
        let mut budget = ContinuationBudget::new(1);
        assert!(budget.admit("Test", "CUIT 20123456789"));
        assert!(!budget.admit("Test", "JUAN PEREZ"));
        budget.reset();
        assert!(budget.admit("Test", "OP 998877"));

        let mut none = ContinuationBudget::new(0);
        assert!(!none.admit("Test", "CUIT 20123456789"));
    }

    #[test]
    fn test_fold_strips_accents() {
        assert_eq!(fold(" Débito "), "debito");
        assert_eq!(fold("NACIÓN"), "nacion");
    }

    #[test]
    fn test_expect_pages_rejects_cells() {
        let input = StatementInput::Cells(vec![]);
        let err = expect_pages("Nación", &input).unwrap_err();
        assert!(matches!(
            err,
            StatementError::UnsupportedInput {
                expected: InputKind::PageText,
                actual: InputKind::TableCells,
                ..
            }
        ));
    }
}
