//! HSBC account statement parser (text)
//!
//! Expected extracted-text section:
//!   EXTRACTO DEL 01/01/2023 AL 31/01/2023
//!   FECHA REFERENCIA NRO DEBITO CREDITO SALDO
//!   - SALDO ANTERIOR 9,813,718.17
//!   02-ENE - DEP.CHEQUES AUTOSERV. 08567 5,000,000.00 14,813,718.17
//!   - VALOR NEGOCIADO 03295 16,507,043.78 31,320,761.95
//!   - SALDO FINAL 31,320,761.95
//!   - RESUMEN DE ACUERDOS -
//!
//! Amounts use `,` for thousands and `.` for the fraction. A date prefix
//! applies to every `-` line below it until the next one. Page headers (from
//! `HOJA n DE m` or the customer's `C.U.I.T.` line until the column header)
//! are skipped.

use std::sync::LazyLock;

use regex::Regex;
use resumen_core::{
    AmountFormatError, BankRecord, CanonicalTransaction, Decimal, EntryContext, InferencePolicy, InputKind,
    NumberStyle, RunningBalance, StatementError, StatementInput, parse_optional_amount_with,
};
use tracing::debug;

use super::{StatementParser, expect_pages};

const OPENING_MARKER: &str = "- SALDO ANTERIOR";

static STATEMENT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"EXTRACTO DEL \d{2}/\d{2}/(\d{4}) AL").expect("year regex"));

static PAGE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^HOJA\s+\d+\s+DE\s+\d+").expect("page header regex"));

static DATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2})-(ENE|FEB|MAR|ABR|MAY|JUN|JUL|AGO|SEP|OCT|NOV|DIC)")
        .expect("date prefix regex")
});

static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.,]+-?)$").expect("trailing number regex"));

static VOUCHER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)$").expect("voucher regex"));

fn month_number(abbrev: &str) -> &'static str {
    match abbrev {
        "ENE" => "01",
        "FEB" => "02",
        "MAR" => "03",
        "ABR" => "04",
        "MAY" => "05",
        "JUN" => "06",
        "JUL" => "07",
        "AGO" => "08",
        "SEP" => "09",
        "OCT" => "10",
        "NOV" => "11",
        _ => "12",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HsbcRecord {
    pub fecha: String,
    /// Description as printed, with its leading `- ` and any continuation lines.
    pub referencia: String,
    pub nro: String,
    pub debito: String,
    pub credito: String,
    pub saldo: String,
}

fn us_amount(text: &str) -> Result<Option<Decimal>, StatementError> {
    Ok(parse_optional_amount_with(text, NumberStyle::UsLedger)?)
}

impl BankRecord for HsbcRecord {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError> {
        Ok(CanonicalTransaction {
            fecha: self.fecha.clone(),
            detalle: self.referencia.trim_start_matches(['-', ' ']).to_string(),
            referencia: self.nro.clone(),
            debitos: us_amount(&self.debito)?,
            creditos: us_amount(&self.credito)?,
            saldo: us_amount(&self.saldo)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HsbcParser {
    pub policy: InferencePolicy,
}

impl Default for HsbcParser {
    fn default() -> Self {
        Self {
            policy: InferencePolicy::Strict,
        }
    }
}

/// Take the last whitespace-delimited number off `text`.
fn pop_number(text: &str) -> Option<(&str, &str)> {
    let m = TRAILING_NUMBER.captures(text)?.get(1)?;
    Some((text[..m.start()].trim_end(), m.as_str()))
}

impl HsbcParser {
    fn transaction(
        &self,
        line: &str,
        fecha: &str,
        balance: &mut RunningBalance,
    ) -> Result<HsbcRecord, StatementError> {
        let malformed = || StatementError::from(AmountFormatError::new(line));
        let (rest, saldo) = pop_number(line).ok_or_else(malformed)?;
        let (rest, value) = pop_number(rest).ok_or_else(malformed)?;
        let (referencia, nro) = match VOUCHER.captures(rest).and_then(|c| c.get(1)) {
            Some(m) => (rest[..m.start()].trim(), m.as_str()),
            None => (rest.trim(), ""),
        };

        let amount = us_amount(value)?.ok_or_else(malformed)?;
        let printed = us_amount(saldo)?.ok_or_else(malformed)?;
        let ctx = EntryContext {
            bank: Self::BANK,
            date: fecha,
            line,
        };
        let movement = balance.infer(amount, printed, self.policy, ctx)?;

        Ok(HsbcRecord {
            fecha: fecha.to_string(),
            referencia: referencia.to_string(),
            nro: nro.to_string(),
            debito: if movement.debit.is_some() { value.to_string() } else { String::new() },
            credito: if movement.credit.is_some() { value.to_string() } else { String::new() },
            saldo: saldo.to_string(),
        })
    }
}

impl StatementParser for HsbcParser {
    type Record = HsbcRecord;
    const BANK: &'static str = "HSBC";

    fn input_kind(&self) -> InputKind {
        InputKind::PageText
    }

    fn parse_records(&self, input: &StatementInput) -> Result<Vec<Vec<HsbcRecord>>, StatementError> {
        let pages = expect_pages(Self::BANK, input)?;
        let year = pages
            .iter()
            .find_map(|p| STATEMENT_YEAR.captures(p))
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| StatementError::section_not_found(Self::BANK, "EXTRACTO DEL"))?;

        let mut records: Vec<HsbcRecord> = Vec::new();
        let mut balance = RunningBalance::new();
        let mut current_date = String::new();
        let mut ignoring = false;
        let mut found = false;

        for raw in pages.iter().flat_map(|p| p.split('\n')) {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if PAGE_HEADER.is_match(line)
                || line.starts_with("C.U.I.T.")
                || line.starts_with("C.U.I.L.")
                || (line.contains("PRODUCTO") && line.contains("NRO. CUENTA") && line.contains("ACUERDO"))
            {
                ignoring = true;
                continue;
            }
            if line.contains("FECHA")
                && ((line.contains("SALDO DEUDOR") && line.contains("NUMERALES"))
                    || (line.contains("REFERENCIA") && line.contains("NRO") && line.contains("SALDO")))
            {
                ignoring = false;
                continue;
            }
            if ignoring {
                continue;
            }

            if line.contains("- RESUMEN DE ACUERDOS -") {
                debug!(bank = Self::BANK, "end of movements");
                break;
            }

            if line.starts_with(OPENING_MARKER) {
                if let Some((_, saldo)) = pop_number(line) {
                    if let Some(opening) = us_amount(saldo)? {
                        balance.set(opening);
                    }
                    records.push(HsbcRecord {
                        referencia: "SALDO ANTERIOR".to_string(),
                        saldo: saldo.to_string(),
                        ..Default::default()
                    });
                    found = true;
                }
                continue;
            }
            if line.starts_with("- SALDO FINAL") {
                continue;
            }

            let mut body = line;
            if let Some(caps) = DATE_PREFIX.captures(line) {
                current_date = format!("{}/{}/{year}", &caps[1], month_number(&caps[2]));
                body = line[caps.get(0).map_or(0, |m| m.end())..].trim();
            } else if current_date.is_empty() {
                continue;
            }

            if body.starts_with('-') {
                let record = self.transaction(body, &current_date, &mut balance)?;
                records.push(record);
            } else if let Some(last) = records.last_mut() {
                last.referencia.push('\n');
                last.referencia.push_str(body);
            }
        }

        if !found {
            return Err(StatementError::section_not_found(Self::BANK, OPENING_MARKER));
        }
        Ok(vec![records])
    }
}
