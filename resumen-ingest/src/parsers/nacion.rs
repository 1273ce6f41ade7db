//! Banco de la Nación Argentina statement parser (text)
//!
//! Expected extracted-text section:
//!   SALDO ANTERIOR 55.348,98
//!   08/05/24 BCA.E.TR.O/BCO -SUC 0001 204046 400.000,00 455.348,98
//!   28/05/24 DB PM/TOT RESUMEN TCORP 1120 93.472,38 361.876,60
//!   SALDO FINAL 361.876,60
//!
//! The voucher number is the first all-digit token followed by an amount.
//! Debit and credit share one column; the side follows from the balance.

use std::sync::LazyLock;

use regex::Regex;
use resumen_core::{
    BankRecord, CanonicalTransaction, EntryContext, InferencePolicy, InputKind, RunningBalance,
    StatementError, StatementInput,
};

use super::{AR_AMOUNT, StatementParser, amount, debit_amount, expect_pages, side_texts};

const OPENING_MARKER: &str = "SALDO ANTERIOR";
const CLOSING_MARKER: &str = "SALDO FINAL";

static DATE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{2}").expect("date regex"));

static LEADING_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(?:\.\d{3})*,\d{2}-?").expect("leading amount regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NacionRecord {
    pub fecha: String,
    pub movimientos: String,
    pub comprob: String,
    pub debitos: String,
    pub creditos: String,
    pub saldo: String,
}

impl BankRecord for NacionRecord {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError> {
        Ok(CanonicalTransaction {
            fecha: self.fecha.clone(),
            detalle: self.movimientos.clone(),
            referencia: self.comprob.clone(),
            debitos: debit_amount(&self.debitos)?,
            creditos: amount(&self.creditos)?,
            saldo: amount(&self.saldo)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NacionParser {
    pub policy: InferencePolicy,
}

impl Default for NacionParser {
    fn default() -> Self {
        Self {
            policy: InferencePolicy::BalanceDirection,
        }
    }
}

fn is_amount(token: &str) -> bool {
    LEADING_AMOUNT.is_match(token)
}

/// Split the tokens after the date into (description, voucher, amount tail).
///
/// Without a voucher, the description runs up to the first amount token.
fn split_tokens<'a>(parts: &[&'a str]) -> (String, &'a str, Vec<&'a str>) {
    let voucher = (0..parts.len()).find(|&i| {
        parts[i].chars().all(|c| c.is_ascii_digit()) && parts.get(i + 1).is_some_and(|n| is_amount(n))
    });
    match voucher {
        Some(i) => (parts[..i].join(" "), parts[i], parts[i + 1..].to_vec()),
        None => {
            let first_amount = parts.iter().position(|t| is_amount(t)).unwrap_or(parts.len());
            (parts[..first_amount].join(" "), "", parts[first_amount..].to_vec())
        }
    }
}

impl StatementParser for NacionParser {
    type Record = NacionRecord;
    const BANK: &'static str = "Nación";

    fn input_kind(&self) -> InputKind {
        InputKind::PageText
    }

    fn parse_records(&self, input: &StatementInput) -> Result<Vec<Vec<NacionRecord>>, StatementError> {
        let pages = expect_pages(Self::BANK, input)?;

        let mut records = Vec::new();
        let mut balance = RunningBalance::new();
        let mut parsing = false;
        let mut found = false;

        for raw in pages.iter().flat_map(|p| p.split('\n')) {
            let line = raw.trim();

            if line.contains(OPENING_MARKER) {
                let saldo = AR_AMOUNT.find(line).map_or("0,00", |m| m.as_str()).to_string();
                if let Some(opening) = amount(&saldo)? {
                    balance.set(opening);
                }
                records.push(NacionRecord {
                    movimientos: OPENING_MARKER.to_string(),
                    saldo,
                    ..Default::default()
                });
                parsing = true;
                found = true;
                continue;
            }
            if line.contains(CLOSING_MARKER) {
                parsing = false;
                continue;
            }
            if !parsing || !DATE_PREFIX.is_match(line) {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            let fecha = parts[0].to_string();
            let (movimientos, comprob, tail) = split_tokens(&parts[1..]);
            let joined = tail.join(" ");
            let found_amounts: Vec<&str> = AR_AMOUNT.find_iter(&joined).map(|m| m.as_str()).collect();

            let mut record = NacionRecord {
                fecha,
                movimientos,
                comprob: comprob.to_string(),
                ..Default::default()
            };
            match found_amounts.as_slice() {
                [value_text, saldo_text, ..] => {
                    if let (Some(value), Some(printed)) = (amount(value_text)?, amount(saldo_text)?) {
                        let ctx = EntryContext {
                            bank: Self::BANK,
                            date: &record.fecha,
                            line,
                        };
                        let movement = balance.infer(value, printed, self.policy, ctx)?;
                        (record.debitos, record.creditos) = side_texts(movement);
                    }
                    record.saldo = saldo_text.to_string();
                }
                [saldo_text] => {
                    if let Some(printed) = amount(saldo_text)? {
                        balance.set(printed);
                    }
                    record.saldo = saldo_text.to_string();
                }
                [] => {}
            }
            records.push(record);
        }

        if !found {
            return Err(StatementError::section_not_found(Self::BANK, OPENING_MARKER));
        }
        Ok(vec![records])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resumen_core::check_continuity;
    use rust_decimal_macros::dec;

    const STATEMENT: &str = r#"BANCO DE LA NACION ARGENTINA
FECHA MOVIMIENTOS COMPROB. DEBITOS CREDITOS SALDO
SALDO ANTERIOR 55.348,98
08/05/24 BCA.E.TR.O/BCO -SUC 0001 204046 400.000,00 455.348,98
28/05/24 DB PM/TOT RESUMEN TCORP 1120 93.472,38 361.876,60
29/05/24 IMP.DEB/CRED S/DEBITOS 560,82 361.315,78
SALDO FINAL 361.315,78
30/05/24 NO PROCESADO 1 1,00 2,00
"#;

    #[test]
    fn test_parse_nacion_statement() {
        let sections = NacionParser::default()
            .parse(&StatementInput::pages([STATEMENT]))
            .unwrap();
        assert_eq!(sections.len(), 1);
        let rows = &sections[0];
        assert_eq!(rows.len(), 4);

        assert_eq!(rows[0].fecha, "");
        assert_eq!(rows[0].detalle, "SALDO ANTERIOR");
        assert_eq!(rows[0].saldo, Some(dec!(55348.98)));

        assert_eq!(rows[1].fecha, "08/05/24");
        assert_eq!(rows[1].detalle, "BCA.E.TR.O/BCO -SUC 0001");
        assert_eq!(rows[1].referencia, "204046");
        assert_eq!(rows[1].creditos, Some(dec!(400000.00)));
        assert_eq!(rows[1].debitos, None);

        assert_eq!(rows[2].detalle, "DB PM/TOT RESUMEN TCORP");
        assert_eq!(rows[2].referencia, "1120");
        assert_eq!(rows[2].debitos, Some(dec!(93472.38)));

        // No voucher: description stops at the first amount.
        assert_eq!(rows[3].detalle, "IMP.DEB/CRED S/DEBITOS");
        assert_eq!(rows[3].referencia, "");
        assert_eq!(rows[3].debitos, Some(dec!(560.82)));
        assert_eq!(check_continuity(rows), None);
    }

    #[test]
    fn test_trailing_minus_amount_is_a_debit() {
        let text = "SALDO ANTERIOR 1.000,00\n02/05/24 PAGO SERVICIO 123456 100,00- 900,00\nSALDO FINAL 900,00";
        let sections = NacionParser::default()
            .parse(&StatementInput::pages([text]))
            .unwrap();
        let row = &sections[0][1];
        assert_eq!(row.referencia, "123456");
        assert_eq!(row.debitos, Some(dec!(100.00)));
        assert_eq!(row.creditos, None);
        assert!(!row.has_both_sides());
        assert_eq!(check_continuity(&sections[0]), None);
    }

    #[test]
    fn test_split_tokens_finds_voucher() {
        let parts = ["DB", "PM/TOT", "1120", "93.472,38", "361.876,60"];
        let (movimientos, comprob, tail) = split_tokens(&parts);
        assert_eq!(movimientos, "DB PM/TOT");
        assert_eq!(comprob, "1120");
        assert_eq!(tail, vec!["93.472,38", "361.876,60"]);
    }
}
