//! ICBC account statement parser (text)
//!
//! Expected extracted-text section, repeated per account:
//!   CUENTA CORRIENTE EN PESOS   PERIODO 01-03-2024 AL 31-03-2024
//!   SALDO ULTIMO EXTRACTO AL 29/02/2024 150.000,00
//!   04-03 TRANSF. RECIBIDA 04-03 25.000,00 175.000,00
//!   06-03 IMP.LEY 25413 60,00-
//!   07-03 AJUSTE 1.000,00- 500,00 164.440,00
//!
//! Movement lines carry only `dd-mm`; the year comes from the `PERIODO` line.
//! Trailing amounts are signed (debits end in `-`). One amount is a movement
//! without a printed balance, two are movement and balance, three are debit,
//! credit and balance. A debit and a credit on one line are booked as their net.

use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use resumen_core::{
    BankRecord, CanonicalTransaction, Decimal, EntryContext, InputKind, Movement, NumberStyle,
    ReconcileMode, RunningBalance, SignPlacement, StatementError, StatementInput,
    format_amount_with,
};
use tracing::debug;

use super::{StatementParser, amount, debit_amount, expect_pages, format_optional};

const OPENING_MARKER: &str = "SALDO ULTIMO EXTRACTO";

static PERIOD_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PERIODO\s+\d{2}-\d{2}-(\d{4})").expect("period regex"));

static OPENING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"SALDO ULTIMO EXTRACTO AL (\d{2}/\d{2}/\d{4})\s+([\d.,-]+)").expect("opening regex")
});

static MOVEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})-(\d{2})\s+(.*)").expect("movement regex"));

static TRAILING_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:\.\d{3})*,\d{2}-?)$").expect("amount regex"));

static VALUE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})-(\d{2})$").expect("value date regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcbcRecord {
    pub fecha: String,
    pub concepto: String,
    /// Value date, `dd/mm/yyyy`.
    pub f_valor: String,
    pub debitos: String,
    pub creditos: String,
    /// Balance with ICBC's trailing sign, e.g. `2.000,00-`.
    pub saldos: String,
}

impl BankRecord for IcbcRecord {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError> {
        Ok(CanonicalTransaction {
            fecha: self.fecha.clone(),
            detalle: self.concepto.clone(),
            referencia: self.f_valor.clone(),
            debitos: debit_amount(&self.debitos)?,
            creditos: amount(&self.creditos)?,
            saldo: amount(&self.saldos)?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct IcbcParser {
    /// Year used when the statement has no `PERIODO` line. Defaults to the current year.
    pub fallback_year: Option<i32>,
}

fn trailing_balance(value: Option<Decimal>) -> String {
    value
        .map(|v| format_amount_with(v, NumberStyle::Argentine, SignPlacement::Trailing))
        .unwrap_or_default()
}

/// Peel `1.000,00- 500,00 164.440,00` off the end of `text`, left to right.
fn split_trailing_amounts(text: &str) -> (&str, Vec<&str>) {
    let mut rest = text;
    let mut amounts = Vec::new();
    while let Some(m) = TRAILING_AMOUNT.find(rest) {
        amounts.push(m.as_str());
        rest = rest[..m.start()].trim_end();
    }
    amounts.reverse();
    (rest, amounts)
}

impl IcbcParser {
    fn statement_year(&self, lines: &[&str]) -> String {
        let period = lines
            .iter()
            .find(|l| l.contains("PERIODO"))
            .and_then(|l| PERIOD_YEAR.captures(l))
            .map(|caps| caps[1].to_string());
        period.unwrap_or_else(|| {
            let year = self.fallback_year.unwrap_or_else(|| chrono::Local::now().year());
            debug!(bank = Self::BANK, year, "no PERIODO line; using fallback year");
            year.to_string()
        })
    }
}

impl StatementParser for IcbcParser {
    type Record = IcbcRecord;
    const BANK: &'static str = "ICBC";

    fn input_kind(&self) -> InputKind {
        InputKind::PageText
    }

    fn parse_records(&self, input: &StatementInput) -> Result<Vec<Vec<IcbcRecord>>, StatementError> {
        let pages = expect_pages(Self::BANK, input)?;
        let lines: Vec<&str> = pages
            .iter()
            .flat_map(|p| p.split('\n'))
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let year = self.statement_year(&lines);

        let mut accounts = Vec::new();
        let mut current: Vec<IcbcRecord> = Vec::new();
        let mut balance = RunningBalance::new();
        let mut found = false;

        for line in lines {
            if line.contains(OPENING_MARKER) {
                if !current.is_empty() {
                    accounts.push(std::mem::take(&mut current));
                }
                found = true;
                balance.clear();
                let Some(caps) = OPENING.captures(line) else {
                    debug!(bank = Self::BANK, line, "opening line without date or balance");
                    continue;
                };
                let opening = amount(&caps[2])?;
                if let Some(opening) = opening {
                    balance.set(opening);
                }
                current.push(IcbcRecord {
                    fecha: caps[1].to_string(),
                    concepto: OPENING_MARKER.to_string(),
                    saldos: trailing_balance(opening),
                    ..Default::default()
                });
                continue;
            }
            if !found {
                continue;
            }

            let Some(caps) = MOVEMENT.captures(line) else {
                continue;
            };
            let fecha = format!("{}/{}/{year}", &caps[1], &caps[2]);
            let (rest, tokens) = split_trailing_amounts(caps.get(3).map_or("", |m| m.as_str()));

            let (concepto, f_valor) = match VALUE_DATE.captures(rest) {
                Some(v) => (
                    rest[..v.get(0).map_or(rest.len(), |m| m.start())].trim().to_string(),
                    format!("{}/{}/{year}", &v[1], &v[2]),
                ),
                None => (rest.trim().to_string(), String::new()),
            };

            let values = tokens
                .iter()
                .map(|t| amount(t))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .flatten()
                .collect::<Vec<_>>();
            let (movement, printed) = match values.as_slice() {
                [] => (Movement::default(), None),
                [value] => (Movement::signed(*value), None),
                [value, saldo] => (Movement::signed(*value), Some(*saldo)),
                [debit, credit, saldo, ..] => {
                    let net = (*debit).min(Decimal::ZERO) + (*credit).max(Decimal::ZERO);
                    let movement = if net.is_zero() { Movement::default() } else { Movement::signed(net) };
                    (movement, Some(*saldo))
                }
            };

            let ctx = EntryContext {
                bank: Self::BANK,
                date: &fecha,
                line,
            };
            let saldo = balance.post(movement, printed, ReconcileMode::Trust, ctx)?;

            current.push(IcbcRecord {
                fecha,
                concepto,
                f_valor,
                debitos: format_optional(movement.debit),
                creditos: format_optional(movement.credit),
                saldos: trailing_balance(saldo),
            });
        }

        if !found {
            return Err(StatementError::section_not_found(Self::BANK, OPENING_MARKER));
        }
        if !current.is_empty() {
            accounts.push(current);
        }
        Ok(accounts)
    }
}
