//! Banco Roela statement parser (text)
//!
//! The extractor emits one field per line, amount first:
//!   $ 314,89
//!   Saldo Al Inicio
//!   01/08/2023
//!   $ 4.300,00
//!   RAPIPAGO SIRO
//!   502              <- concepto
//!   00129597         <- comprobante
//!   01/08/2023
//!   Saldo al 31/08/2023
//!   $ 4.614,89
//!
//! Amounts are signed (`-$ 1.000,00`). The statement prints no per-row
//! balance: the first entry is the opening balance and every later row's
//! balance is the running sum.

use std::sync::LazyLock;

use regex::Regex;
use resumen_core::{
    BankRecord, CanonicalTransaction, Decimal, InputKind, Movement, StatementError,
    StatementInput, join_lines, parse_amount,
};
use super::{ContinuationBudget, DEFAULT_CONTINUATION_CAP, StatementParser, expect_pages};

static FULL_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("date regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoelaRecord {
    pub fecha: String,
    pub comprobante: String,
    pub concepto: String,
    pub descripcion: String,
    /// Signed amount as printed, e.g. `-$ 1.000,00`.
    pub importe: String,
}

impl RoelaRecord {
    fn referencia(&self) -> String {
        join_lines([self.comprobante.as_str(), self.concepto.as_str()])
    }
}

impl BankRecord for RoelaRecord {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError> {
        let movement = Movement::signed(parse_amount(&self.importe)?);
        Ok(CanonicalTransaction {
            fecha: self.fecha.clone(),
            detalle: self.descripcion.clone(),
            referencia: self.referencia(),
            debitos: movement.debit,
            creditos: movement.credit.filter(|c| !c.is_zero()),
            saldo: None,
        })
    }

    /// Balances are the running sum of the amounts, seeded by the first row.
    fn canonicalize(records: &[Self]) -> Result<Vec<CanonicalTransaction>, StatementError> {
        let mut saldo = Decimal::ZERO;
        records
            .iter()
            .enumerate()
            .map(|(idx, record)| -> Result<CanonicalTransaction, StatementError> {
                let importe = parse_amount(&record.importe)?;
                let mut txn = record.to_canonical()?;
                if idx == 0 {
                    saldo = importe;
                    txn.debitos = None;
                    txn.creditos = None;
                } else {
                    saldo += importe;
                }
                txn.saldo = Some(saldo);
                Ok(txn)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RoelaParser {
    pub continuation_cap: usize,
}

impl Default for RoelaParser {
    fn default() -> Self {
        Self {
            continuation_cap: DEFAULT_CONTINUATION_CAP,
        }
    }
}

fn is_importe(line: &str) -> bool {
    line.starts_with('$') || line.starts_with("-$")
}

fn is_date(line: &str) -> bool {
    FULL_DATE.is_match(line)
}

fn is_balance_line(line: &str) -> bool {
    line.to_lowercase().starts_with("saldo al ")
}

impl StatementParser for RoelaParser {
    type Record = RoelaRecord;
    const BANK: &'static str = "Roela";

    fn input_kind(&self) -> InputKind {
        InputKind::PageText
    }

    fn parse_records(&self, input: &StatementInput) -> Result<Vec<Vec<RoelaRecord>>, StatementError> {
        let pages = expect_pages(Self::BANK, input)?;
        let lines: Vec<&str> = pages
            .iter()
            .flat_map(|p| p.split('\n'))
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let Some(start) = lines.iter().position(|l| is_importe(l)) else {
            return Err(StatementError::section_not_found(Self::BANK, "$"));
        };

        let mut records = Vec::new();
        let mut i = start;
        while i < lines.len() {
            let line = lines[i];
            if is_balance_line(line) {
                // The closing balance and its amount on the next line.
                i += 2;
                continue;
            }
            if !is_importe(line) {
                i += 1;
                continue;
            }
            let importe = line.to_string();
            i += 1;
            let Some(first) = lines.get(i) else {
                break;
            };

            let mut descripcion = vec![*first];
            let mut continuation = ContinuationBudget::new(self.continuation_cap);
            while let Some(next) = lines.get(i + 1) {
                if is_date(next) || next.chars().all(|c| c.is_ascii_digit()) || is_importe(next) || is_balance_line(next) {
                    break;
                }
                if continuation.admit(Self::BANK, next) {
                    descripcion.push(*next);
                }
                i += 1;
            }
            i += 1;

            // Up to two identifier lines (concepto, comprobante) before the date.
            let mut record = RoelaRecord {
                descripcion: descripcion.join("\n"),
                importe,
                ..Default::default()
            };
            for slot in 0..3 {
                let Some(next) = lines.get(i) else {
                    break;
                };
                if is_date(next) {
                    record.fecha = next.to_string();
                    i += 1;
                    break;
                }
                match slot {
                    0 => record.concepto = next.to_string(),
                    1 => record.comprobante = next.to_string(),
                    _ => break,
                }
                i += 1;
            }
            records.push(record);
        }

        Ok(vec![records])
    }
}
