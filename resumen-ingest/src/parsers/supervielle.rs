//! Banco Supervielle account statement parser (text)
//!
//! Expected extracted-text section, once per account:
//!   Saldo del período anterior 10.000,00
//!   02/05/24 Transferencia recibida R 1234 5.000,00 15.000,00
//!   CUIT 20-12345678-9
//!   SUBTOTAL 5.000,00
//!   SALDO PERIODO ACTUAL 15.000,00
//!
//! Each movement prints a single amount followed by the balance; the side is
//! inferred from the balances. Lines between a pair of `SUBTOTAL` markers are
//! page carry-overs and are skipped.

use std::sync::LazyLock;

use regex::Regex;
use resumen_core::{
    BankRecord, CanonicalTransaction, EntryContext, InferencePolicy, InputKind, Movement,
    RunningBalance, StatementError, StatementInput,
};
use tracing::debug;

use super::{
    ContinuationBudget, DEFAULT_CONTINUATION_CAP, StatementParser, amount, debit_amount, expect_pages,
    side_texts,
};

const OPENING_MARKER: &str = "Saldo del período anterior";
const CLOSING_MARKER: &str = "SALDO PERIODO ACTUAL";
const SUBTOTAL: &str = "SUBTOTAL";

/// Lines that end a description even though they carry no date.
const STOP_WORDS: [&str; 4] = ["Imp Ley 25413", SUBTOTAL, CLOSING_MARKER, OPENING_MARKER];

static OPENING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Saldo del período anterior\s+([\d.,]+-?)").expect("opening regex")
});

static MOVEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}/\d{2}/\d{2})\s+(.*)").expect("movement regex"));

static TRAILING_AMOUNTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.,]+)\s+([\d.,]+-?)$").expect("amounts regex"));

static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)(R \d+\**|\d+\**)$").expect("reference regex"));

static DATE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{2}").expect("date prefix regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervielleRecord {
    pub fecha: String,
    pub concepto: String,
    pub referencia: String,
    pub debito: String,
    pub credito: String,
    pub saldo: String,
}

impl BankRecord for SupervielleRecord {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError> {
        Ok(CanonicalTransaction {
            fecha: self.fecha.clone(),
            detalle: self.concepto.clone(),
            referencia: self.referencia.clone(),
            debitos: debit_amount(&self.debito)?,
            creditos: amount(&self.credito)?,
            saldo: amount(&self.saldo)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SupervielleParser {
    pub policy: InferencePolicy,
    pub continuation_cap: usize,
}

impl Default for SupervielleParser {
    fn default() -> Self {
        Self {
            policy: InferencePolicy::Lenient,
            continuation_cap: DEFAULT_CONTINUATION_CAP,
        }
    }
}

/// Split `"Pago servicio 123456** "` into concept and reference.
fn split_reference(text: &str) -> (String, String) {
    match REFERENCE.captures(text) {
        Some(caps) => (caps[1].trim().to_string(), caps[2].trim().to_string()),
        None => (text.to_string(), String::new()),
    }
}

impl StatementParser for SupervielleParser {
    type Record = SupervielleRecord;
    const BANK: &'static str = "Supervielle";

    fn input_kind(&self) -> InputKind {
        InputKind::PageText
    }

    fn parse_records(&self, input: &StatementInput) -> Result<Vec<Vec<SupervielleRecord>>, StatementError> {
        let pages = expect_pages(Self::BANK, input)?;
        let lines: Vec<&str> = pages.iter().flat_map(|p| p.split('\n')).map(str::trim).collect();

        let mut accounts = Vec::new();
        let mut current: Vec<SupervielleRecord> = Vec::new();
        let mut balance = RunningBalance::new();
        let mut in_entries = false;
        let mut in_subtotal = false;
        let mut found = false;
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            i += 1;
            if line.is_empty() {
                continue;
            }

            if line.contains(OPENING_MARKER) {
                if !current.is_empty() {
                    accounts.push(std::mem::take(&mut current));
                }
                in_subtotal = false;
                in_entries = false;
                let Some(caps) = OPENING.captures(line) else {
                    debug!(bank = Self::BANK, line, "opening marker without balance");
                    continue;
                };
                let saldo = caps[1].to_string();
                match amount(&saldo)? {
                    Some(opening) => balance.set(opening),
                    None => balance.clear(),
                }
                current.push(SupervielleRecord {
                    concepto: OPENING_MARKER.to_string(),
                    saldo,
                    ..Default::default()
                });
                debug!(bank = Self::BANK, "account opened");
                in_entries = true;
                found = true;
                continue;
            }

            if !in_entries {
                continue;
            }
            if line.contains(CLOSING_MARKER) {
                if !current.is_empty() {
                    accounts.push(std::mem::take(&mut current));
                }
                in_entries = false;
                continue;
            }
            if line.starts_with(SUBTOTAL) {
                in_subtotal = !in_subtotal;
                continue;
            }
            if in_subtotal {
                continue;
            }

            let Some(caps) = MOVEMENT.captures(line) else {
                continue;
            };
            let fecha = caps[1].to_string();
            let rest = caps.get(2).map_or("", |m| m.as_str());
            let Some(amounts) = TRAILING_AMOUNTS.captures(rest) else {
                debug!(bank = Self::BANK, line, "dated line without amounts");
                continue;
            };
            let value_text = amounts[1].to_string();
            let saldo_text = amounts[2].to_string();
            let (concepto, referencia) = split_reference(rest[..amounts.get(0).map_or(0, |m| m.start())].trim());

            let mut concepto_lines = vec![concepto];
            let mut continuation = ContinuationBudget::new(self.continuation_cap);
            while let Some(next) = lines.get(i) {
                if next.is_empty() || DATE_PREFIX.is_match(next) || STOP_WORDS.iter().any(|w| next.contains(w)) {
                    break;
                }
                if continuation.admit(Self::BANK, next) {
                    concepto_lines.push(next.to_string());
                }
                i += 1;
            }
            let concepto = concepto_lines.join("\n");

            let (value, saldo) = match (amount(&value_text)?, amount(&saldo_text)?) {
                (Some(value), Some(saldo)) => (value, saldo),
                _ => continue,
            };
            let movement = if value.is_zero() {
                // A zero amount reconciles both ways.
                balance.set(saldo);
                Movement::default()
            } else {
                let ctx = EntryContext {
                    bank: Self::BANK,
                    date: &fecha,
                    line,
                };
                balance.infer(value, saldo, self.policy, ctx)?
            };

            let (debito, credito) = side_texts(movement);
            current.push(SupervielleRecord {
                fecha,
                concepto,
                referencia,
                debito,
                credito,
                saldo: saldo_text,
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

#[cfg(test)]
mod tests {
    use super::*;
    use resumen_core::check_continuity;
    use rust_decimal_macros::dec;

    const STATEMENT: &str = r#"BANCO SUPERVIELLE
CUENTA CORRIENTE EN PESOS Nro 01-12345/6
Fecha Concepto Débito Crédito Saldo
Saldo del período anterior 10.000,00
02/05/24 Transferencia recibida R 1234 5.000,00 15.000,00
CUIT 20-12345678-9
Juan Perez
03/05/24 Pago servicio 123456** 2.000,00 13.000,00
Imp Ley 25413 sobre debitos
04/05/24 Ajuste 0,00 13.000,00
SUBTOTAL 7.000,00

SUBTOTAL 7.000,00
05/05/24 Compra 500,00 14.000,00
SALDO PERIODO ACTUAL 14.000,00
CAJA DE AHORRO EN PESOS Nro 02-55555/1
Saldo del período anterior 1.000,00-
06/05/24 Deposito efectivo 3.000,00 2.000,00
SALDO PERIODO ACTUAL 2.000,00
"#;

    #[test]
    fn test_parse_supervielle_accounts() {
        let sections = SupervielleParser::default()
            .parse(&StatementInput::pages([STATEMENT]))
            .unwrap();
        assert_eq!(sections.len(), 2);

        let first = &sections[0];
        assert_eq!(first.len(), 5);
        assert_eq!(first[0].fecha, "");
        assert_eq!(first[0].detalle, "Saldo del período anterior");
        assert_eq!(first[0].saldo, Some(dec!(10000.00)));

        assert_eq!(first[1].detalle, "Transferencia recibida\nCUIT 20-12345678-9\nJuan Perez");
        assert_eq!(first[1].referencia, "R 1234");
        assert_eq!(first[1].creditos, Some(dec!(5000.00)));

        assert_eq!(first[2].detalle, "Pago servicio");
        assert_eq!(first[2].referencia, "123456**");
        assert_eq!(first[2].debitos, Some(dec!(2000.00)));

        // Zero amount: no side.
        assert_eq!(first[3].debitos, None);
        assert_eq!(first[3].creditos, None);

        // Does not reconcile: left empty, balance kept.
        assert_eq!(first[4].debitos, None);
        assert_eq!(first[4].creditos, None);
        assert_eq!(first[4].saldo, Some(dec!(14000.00)));

        let second = &sections[1];
        assert_eq!(second[0].saldo, Some(dec!(-1000.00)));
        assert_eq!(second[1].creditos, Some(dec!(3000.00)));
        assert_eq!(check_continuity(second), None);
    }

    #[test]
    fn test_continuation_cap_drops_extra_lines() {
        let parser = SupervielleParser {
            continuation_cap: 1,
            ..SupervielleParser::default()
        };
        let sections = parser.parse(&StatementInput::pages([STATEMENT])).unwrap();
        let first = &sections[0];
        assert_eq!(first[1].detalle, "Transferencia recibida\nCUIT 20-12345678-9");
        assert_eq!(first[2].detalle, "Pago servicio");
        assert_eq!(first[2].debitos, Some(dec!(2000.00)));
    }

    #[test]
    fn test_split_reference() {
        assert_eq!(
            split_reference("Debito automatico R 998"),
            ("Debito automatico".to_string(), "R 998".to_string())
        );
        assert_eq!(split_reference("Comision"), ("Comision".to_string(), String::new()));
    }

    #[test]
    fn test_without_opening() {
        let err = SupervielleParser::default()
            .parse(&StatementInput::pages(["02/05/24 x 1,00 2,00"]))
            .unwrap_err();
        assert!(matches!(err, StatementError::SectionNotFound { .. }));
    }
}
