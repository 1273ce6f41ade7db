//! The canonical six-field transaction every bank is mapped into.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StatementError;
use crate::reconcile::within_tolerance;

/// One row of the normalized ledger. Dates stay in the bank's own format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    #[serde(rename = "FECHA")]
    pub fecha: String,
    #[serde(rename = "DETALLE")]
    pub detalle: String,
    #[serde(rename = "REFERENCIA")]
    pub referencia: String,
    /// Money leaving the account. `None` means the column was empty.
    #[serde(rename = "DEBITOS")]
    pub debitos: Option<Decimal>,
    #[serde(rename = "CREDITOS")]
    pub creditos: Option<Decimal>,
    #[serde(rename = "SALDO")]
    pub saldo: Option<Decimal>,
}

/// One account's transactions, in statement order.
pub type Section = Vec<CanonicalTransaction>;

impl CanonicalTransaction {
    /// A balance-only row: opening ("SALDO ANTERIOR") or closing ("SALDO AL").
    pub fn balance_marker(
        fecha: impl Into<String>,
        detalle: impl Into<String>,
        saldo: Option<Decimal>,
    ) -> Self {
        Self {
            fecha: fecha.into(),
            detalle: detalle.into(),
            saldo,
            ..Self::default()
        }
    }

    pub fn has_both_sides(&self) -> bool {
        self.debitos.is_some() && self.creditos.is_some()
    }
}

/// Maps one bank's raw record shape into canonical rows.
pub trait BankRecord {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError>;

    /// Map a whole section. Banks whose rows depend on their neighbours
    /// override this.
    fn canonicalize(records: &[Self]) -> Result<Section, StatementError>
    where
        Self: Sized,
    {
        records.iter().map(Self::to_canonical).collect()
    }
}

impl BankRecord for CanonicalTransaction {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError> {
        Ok(self.clone())
    }
}

/// Split a conflated description on its first line break:
/// `("primary detail", "rest of the lines")`.
pub fn split_detail(text: &str) -> (String, String) {
    match text.split_once('\n') {
        Some((detail, reference)) => (detail.trim().to_string(), reference.trim().to_string()),
        None => (text.trim().to_string(), String::new()),
    }
}

static WIDE_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("wide gap regex"));

/// Split on runs of two or more whitespace characters, dropping empty parts.
pub fn split_wide_gaps(text: &str) -> Vec<&str> {
    WIDE_GAP
        .split(text.trim())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Join non-empty parts with line breaks.
pub fn join_lines<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Index of the first row whose balance does not follow from the previous
/// row's balance and its own movement. Rows without a balance are skipped
/// over but their movements still count.
pub fn check_continuity(section: &[CanonicalTransaction]) -> Option<usize> {
    let mut last: Option<Decimal> = None;
    let mut pending = Decimal::ZERO;
    for (idx, txn) in section.iter().enumerate() {
        let movement = txn.creditos.unwrap_or_default() - txn.debitos.unwrap_or_default();
        match (last, txn.saldo) {
            (Some(prev), Some(saldo)) => {
                if !within_tolerance(prev + pending + movement, saldo) {
                    return Some(idx);
                }
                last = Some(saldo);
                pending = Decimal::ZERO;
            }
            (None, Some(saldo)) => {
                last = Some(saldo);
                pending = Decimal::ZERO;
            }
            (_, None) => pending += movement,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(debit: Option<Decimal>, credit: Option<Decimal>, saldo: Option<Decimal>) -> CanonicalTransaction {
        CanonicalTransaction {
            fecha: "03/01/23".into(),
            detalle: "x".into(),
            debitos: debit,
            creditos: credit,
            saldo,
            ..Default::default()
        }
    }

    #[test]
    fn test_serde_field_names() {
        let txn = CanonicalTransaction::balance_marker("", "SALDO ANTERIOR", Some(dec!(2246170.50)));
        let json = serde_json::to_value(&txn).unwrap();
        assert_eq!(json["FECHA"], "");
        assert_eq!(json["DETALLE"], "SALDO ANTERIOR");
        assert!(json["DEBITOS"].is_null());
        assert_eq!(json["SALDO"], "2246170.50");
    }

    #[test]
    fn test_canonicalize_is_identity_on_canonical_rows() {
        let rows = vec![
            CanonicalTransaction::balance_marker("", "SALDO ANTERIOR", Some(dec!(10))),
            row(Some(dec!(1)), None, Some(dec!(9))),
        ];
        assert_eq!(CanonicalTransaction::canonicalize(&rows).unwrap(), rows);
    }

    #[test]
    fn test_split_detail() {
        assert_eq!(
            split_detail("TRANSFERENCIA\nCUIT 20-1\nOP 3"),
            ("TRANSFERENCIA".to_string(), "CUIT 20-1\nOP 3".to_string())
        );
        assert_eq!(split_detail(" SOLO "), ("SOLO".to_string(), String::new()));
    }

    #[test]
    fn test_split_wide_gaps() {
        assert_eq!(
            split_wide_gaps("  PAGO SERVICIO   EDEMSA  0001 "),
            vec!["PAGO SERVICIO", "EDEMSA", "0001"]
        );
    }

    #[test]
    fn test_join_lines_skips_blanks() {
        assert_eq!(join_lines(["12345", "", " 01-02 "]), "12345\n01-02");
    }

    #[test]
    fn test_check_continuity() {
        let ok = vec![
            row(None, None, Some(dec!(100))),
            row(Some(dec!(10)), None, None),
            row(None, Some(dec!(5)), Some(dec!(95))),
        ];
        assert_eq!(check_continuity(&ok), None);

        let broken = vec![
            row(None, None, Some(dec!(100))),
            row(Some(dec!(10)), None, Some(dec!(80))),
        ];
        assert_eq!(check_continuity(&broken), Some(1));
    }
}
