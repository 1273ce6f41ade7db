//! Banco Santander account statement parser (text)
//!
//! Santander has shipped two layouts. Both print one field per line and a
//! single undifferentiated amount followed by the balance, so the side of
//! every movement is inferred from the balances.
//!
//! Legacy (amounts spelled with `pesos`):
//!   01/08/23
//!   Saldo Inicial
//!   pesos 100.000,00
//!   02/08/23 12345678
//!   Transferencia recibida
//!   pesos 20.000,00
//!   pesos 120.000,00
//!
//! Current (amounts prefixed with `$`):
//!   Saldo Inicial
//!   $ 640.322,55
//!   01/08/24 12345 Compra con tarjeta de debito
//!   -$ 22.322,55
//!   $ 618.000,00

use std::sync::LazyLock;

use regex::Regex;
use resumen_core::{
    BankRecord, CanonicalTransaction, EntryContext, InferencePolicy, InputKind, Movement,
    RunningBalance, StatementError, StatementInput, format_amount, parse_amount,
};
use tracing::debug;

use super::{
    ContinuationBudget, DEFAULT_CONTINUATION_CAP, StatementParser, amount, debit_amount, expect_pages,
    format_optional,
};

const OPENING_MARKER: &str = "Saldo Inicial";
const CLOSING_MARKER: &str = "Saldo total";

static BARE_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{2}$").expect("date regex"));

static LEADING_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}/\d{2}/\d{2})").expect("leading date regex"));

static DATE_AND_VOUCHER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}/\d{2}/\d{2})\s+(\d+)$").expect("date voucher regex"));

static VOUCHER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,15}$").expect("voucher regex"));

static LEGACY_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:menos\s+)?pesos\s+(?:menos\s+)?-?[\d.,]+-?$").expect("legacy amount regex")
});

static DOLLAR_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\$\s*[\d.,]+$").expect("dollar amount regex"));

static LEGACY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pesos\s+[\d.,]+").expect("legacy marker regex"));

static ACCOUNT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cuenta corriente n|caja de ahorro n").expect("account header regex"));

/// Which of the two statement layouts a document uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SantanderLayout {
    Legacy,
    Current,
}

/// Legacy statements spell amounts as `pesos 1.234,56` near the top.
pub fn detect_layout(pages: &[String]) -> SantanderLayout {
    let legacy = pages
        .iter()
        .take(3)
        .flat_map(|page| page.lines())
        .take(100)
        .any(|line| LEGACY_MARKER.is_match(&line.to_lowercase()));
    if legacy {
        SantanderLayout::Legacy
    } else {
        SantanderLayout::Current
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SantanderRecord {
    pub fecha: String,
    pub comprobante: String,
    pub movimiento: String,
    pub debito: String,
    pub credito: String,
    pub saldo: String,
}

impl BankRecord for SantanderRecord {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError> {
        Ok(CanonicalTransaction {
            fecha: self.fecha.clone(),
            detalle: self.movimiento.clone(),
            referencia: self.comprobante.clone(),
            debitos: debit_amount(&self.debito)?,
            creditos: amount(&self.credito)?,
            saldo: amount(&self.saldo)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SantanderParser {
    pub legacy_policy: InferencePolicy,
    pub current_policy: InferencePolicy,
    pub continuation_cap: usize,
}

impl Default for SantanderParser {
    fn default() -> Self {
        Self {
            legacy_policy: InferencePolicy::Lenient,
            current_policy: InferencePolicy::Strict,
            continuation_cap: DEFAULT_CONTINUATION_CAP,
        }
    }
}

/// Drop the account header block that opens each legacy page (from the
/// "cuenta corriente n" line through the "saldo en cuenta" column header).
fn clean_legacy(pages: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    for page in pages {
        let mut skipping = false;
        for (idx, line) in page.lines().enumerate() {
            let lower = line.to_lowercase();
            if idx == 0 && ACCOUNT_HEADER.is_match(&lower) {
                skipping = true;
                continue;
            }
            if skipping {
                if lower.contains("saldo en cuenta") {
                    skipping = false;
                }
                continue;
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
    }
    lines
}

/// Keep only the peso movements block of each page.
fn clean_current(pages: &[String]) -> Vec<String> {
    const START: [&str; 4] = ["movimientos en pesos", "saldo inicial", "fecha", "comprobante"];
    const END: [&str; 4] = ["saldo total", "movimientos en dólares", "legales", "otros fondos"];

    let mut lines = Vec::new();
    for page in pages {
        if !page.contains(OPENING_MARKER) && !page.contains("Movimiento") {
            continue;
        }
        let mut capturing = false;
        for line in page.lines() {
            let lower = line.to_lowercase();
            if START.iter().any(|m| lower.contains(m)) {
                capturing = true;
            }
            if capturing && END.iter().any(|m| lower.contains(m)) {
                break;
            }
            let trimmed = line.trim();
            if capturing && !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
    }
    lines
}

fn is_legacy_amount(line: &str) -> bool {
    LEGACY_AMOUNT.is_match(line.trim())
}

fn is_dollar_amount(line: &str) -> bool {
    DOLLAR_AMOUNT.is_match(line.trim())
}

impl SantanderParser {
    fn parse_legacy(&self, pages: &[String]) -> Result<Vec<SantanderRecord>, StatementError> {
        let lines = clean_legacy(pages);
        let start = (0..lines.len().saturating_sub(1))
            .find(|&i| BARE_DATE.is_match(&lines[i]) && lines[i + 1].contains(OPENING_MARKER))
            .ok_or_else(|| StatementError::section_not_found(Self::BANK, OPENING_MARKER))?;

        let mut records = Vec::new();
        let mut balance = RunningBalance::new();
        let mut fecha = String::new();
        let mut comprobante = String::new();
        let mut i = start;

        while i < lines.len() {
            let line = lines[i].as_str();
            let next_is_amount = lines.get(i + 1).is_some_and(|l| is_legacy_amount(l));

            if line.contains(CLOSING_MARKER) && next_is_amount {
                break;
            }
            if let Some(caps) = DATE_AND_VOUCHER.captures(line) {
                fecha = caps[1].to_string();
                comprobante = caps[2].to_string();
                i += 1;
                continue;
            }
            if BARE_DATE.is_match(line) {
                fecha = line.to_string();
                comprobante.clear();
                i += 1;
                continue;
            }
            if line.contains(OPENING_MARKER) && next_is_amount {
                let opening = parse_amount(&lines[i + 1])?;
                balance.set(opening);
                records.push(SantanderRecord {
                    fecha: fecha.clone(),
                    movimiento: OPENING_MARKER.to_string(),
                    saldo: format_amount(opening),
                    ..Default::default()
                });
                i += 2;
                continue;
            }
            if comprobante.is_empty() && VOUCHER.is_match(line) {
                comprobante = line.to_string();
                i += 1;
                continue;
            }

            let mut movimiento = Vec::new();
            if !is_legacy_amount(line) {
                movimiento.push(line.to_string());
                i += 1;
            }
            let mut continuation = ContinuationBudget::new(self.continuation_cap);
            while let Some(l) = lines.get(i) {
                if is_legacy_amount(l) || BARE_DATE.is_match(l) || VOUCHER.is_match(l) {
                    break;
                }
                if continuation.admit(Self::BANK, l) {
                    movimiento.push(l.clone());
                }
                i += 1;
            }

            let mut amounts = Vec::new();
            while amounts.len() < 2 && lines.get(i).is_some_and(|l| is_legacy_amount(l)) {
                amounts.push(parse_amount(&lines[i])?);
                i += 1;
            }

            let movimiento = movimiento.join("\n");
            let ctx = EntryContext {
                bank: Self::BANK,
                date: &fecha,
                line: &movimiento,
            };
            let (movement, saldo) = match amounts.as_slice() {
                [value, saldo] => (balance.infer(value.abs(), *saldo, self.legacy_policy, ctx)?, Some(*saldo)),
                [saldo_only] => {
                    balance.set(*saldo_only);
                    (Movement::default(), Some(*saldo_only))
                }
                _ => {
                    balance.clear();
                    (Movement::default(), None)
                }
            };

            records.push(SantanderRecord {
                fecha: fecha.clone(),
                comprobante: std::mem::take(&mut comprobante),
                movimiento,
                debito: format_optional(movement.debit),
                credito: format_optional(movement.credit),
                saldo: format_optional(saldo),
            });
        }

        Ok(records)
    }

    fn parse_current(&self, pages: &[String]) -> Result<Vec<SantanderRecord>, StatementError> {
        let lines = clean_current(pages);
        let start = lines
            .iter()
            .position(|l| l.contains(OPENING_MARKER))
            .ok_or_else(|| StatementError::section_not_found(Self::BANK, OPENING_MARKER))?;
        let opening_idx = (start + 1..lines.len().min(start + 3))
            .find(|&j| is_dollar_amount(&lines[j]))
            .ok_or_else(|| StatementError::section_not_found(Self::BANK, "Saldo Inicial amount"))?;
        let opening = parse_amount(&lines[opening_idx])?;

        let mut records = vec![SantanderRecord {
            movimiento: OPENING_MARKER.to_string(),
            saldo: format_amount(opening),
            ..Default::default()
        }];
        let mut balance = RunningBalance::opening(opening);
        let mut i = opening_idx + 1;

        while i < lines.len() {
            let line = lines[i].as_str();
            let Some(caps) = LEADING_DATE.captures(line) else {
                i += 1;
                continue;
            };
            let fecha = caps[1].to_string();
            let rest = line[fecha.len()..].trim();

            let mut comprobante = String::new();
            let mut movimiento = Vec::new();
            let mut continuation = ContinuationBudget::new(self.continuation_cap);
            let mut parts = rest.splitn(2, char::is_whitespace);
            match parts.next() {
                Some(first) if is_voucher_token(first) => {
                    comprobante = first.to_string();
                    if let Some(tail) = parts.next().map(str::trim).filter(|t| !t.is_empty()) {
                        movimiento.push(tail.to_string());
                    }
                }
                _ if !rest.is_empty() => movimiento.push(rest.to_string()),
                _ => {}
            }
            i += 1;

            while let Some(l) = lines.get(i) {
                if is_dollar_amount(l) || LEADING_DATE.is_match(l) {
                    break;
                }
                if comprobante.is_empty() && is_voucher_token(l) {
                    comprobante = l.clone();
                } else if movimiento.is_empty() || continuation.admit(Self::BANK, l) {
                    movimiento.push(l.clone());
                }
                i += 1;
            }

            let both_amounts = lines.get(i).is_some_and(|l| is_dollar_amount(l))
                && lines.get(i + 1).is_some_and(|l| is_dollar_amount(l));
            if !both_amounts {
                debug!(bank = Self::BANK, fecha = %fecha, "movement without amount and balance; skipped");
                continue;
            }

            let value = parse_amount(&lines[i])?;
            let saldo = parse_amount(&lines[i + 1])?;
            let movimiento = movimiento.join("\n");
            let ctx = EntryContext {
                bank: Self::BANK,
                date: &fecha,
                line: &movimiento,
            };
            let movement = balance.infer(value.abs(), saldo, self.current_policy, ctx)?;

            records.push(SantanderRecord {
                fecha,
                comprobante,
                movimiento,
                debito: format_optional(movement.debit),
                credito: format_optional(movement.credit),
                saldo: format_amount(saldo),
            });
            i += 2;
        }

        Ok(records)
    }
}

fn is_voucher_token(token: &str) -> bool {
    (4..=15).contains(&token.len()) && token.chars().all(|c| c.is_ascii_digit())
}

impl StatementParser for SantanderParser {
    type Record = SantanderRecord;
    const BANK: &'static str = "Santander";

    fn input_kind(&self) -> InputKind {
        InputKind::PageText
    }

    fn parse_records(&self, input: &StatementInput) -> Result<Vec<Vec<SantanderRecord>>, StatementError> {
        let pages = expect_pages(Self::BANK, input)?;
        let layout = detect_layout(pages);
        debug!(bank = Self::BANK, ?layout, "layout detected");
        let records = match layout {
            SantanderLayout::Legacy => self.parse_legacy(pages)?,
            SantanderLayout::Current => self.parse_current(pages)?,
        };
        Ok(vec![records])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resumen_core::check_continuity;
    use rust_decimal_macros::dec;

    const LEGACY: &str = r#"CUENTA CORRIENTE N 123-456789/0
Titular: SERVICIOS SA
Fecha Comprobante Movimiento Debito Credito
Saldo en cuenta
01/08/23
Saldo Inicial
pesos 100.000,00
02/08/23 12345678
Transferencia recibida
De Juan Perez
pesos 20.000,00
pesos 120.000,00
03/08/23
Pago de servicios
pesos 5.000,00
pesos 115.000,00
04/08/23
00987654
Comision mantenimiento
pesos 1.000,00
pesos 120.000,00
Saldo total
pesos 120.000,00
"#;

    const CURRENT: &str = r#"Resumen de cuenta
Movimientos en pesos
Fecha Comprobante Movimiento Débito Crédito Saldo en cuenta
Saldo Inicial
$ 640.322,55
01/08/24 12345
Compra con tarjeta de debito
Supermercado
-$ 22.322,55
$ 618.000,00

02/08/24 Transferencia recibida
98765432
$ 2.000,00
$ 620.000,00
Saldo total
$ 620.000,00
Legales
"#;

    #[test]
    fn test_detect_layout() {
        assert_eq!(detect_layout(&[LEGACY.to_string()]), SantanderLayout::Legacy);
        assert_eq!(detect_layout(&[CURRENT.to_string()]), SantanderLayout::Current);
    }

    #[test]
    fn test_parse_legacy() {
        let sections = SantanderParser::default()
            .parse(&StatementInput::pages([LEGACY]))
            .unwrap();
        let rows = &sections[0];
        assert_eq!(rows.len(), 4);

        assert_eq!(rows[0].fecha, "01/08/23");
        assert_eq!(rows[0].detalle, "Saldo Inicial");
        assert_eq!(rows[0].saldo, Some(dec!(100000.00)));

        assert_eq!(rows[1].referencia, "12345678");
        assert_eq!(rows[1].detalle, "Transferencia recibida\nDe Juan Perez");
        assert_eq!(rows[1].creditos, Some(dec!(20000.00)));
        assert_eq!(rows[1].debitos, None);

        assert_eq!(rows[2].debitos, Some(dec!(5000.00)));
        assert_eq!(rows[2].saldo, Some(dec!(115000.00)));

        // Lenient: the balance jumps without matching the amount.
        assert_eq!(rows[3].referencia, "00987654");
        assert_eq!(rows[3].debitos, None);
        assert_eq!(rows[3].creditos, None);
        assert_eq!(rows[3].saldo, Some(dec!(120000.00)));
    }

    #[test]
    fn test_parse_current() {
        let sections = SantanderParser::default()
            .parse(&StatementInput::pages([CURRENT]))
            .unwrap();
        let rows = &sections[0];
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].fecha, "");
        assert_eq!(rows[0].saldo, Some(dec!(640322.55)));

        assert_eq!(rows[1].fecha, "01/08/24");
        assert_eq!(rows[1].referencia, "12345");
        assert_eq!(rows[1].detalle, "Compra con tarjeta de debito\nSupermercado");
        assert_eq!(rows[1].debitos, Some(dec!(22322.55)));

        assert_eq!(rows[2].referencia, "98765432");
        assert_eq!(rows[2].detalle, "Transferencia recibida");
        assert_eq!(rows[2].creditos, Some(dec!(2000.00)));
        assert_eq!(check_continuity(rows), None);
    }

    #[test]
    fn test_continuation_cap_drops_extra_lines() {
        let parser = SantanderParser {
            continuation_cap: 0,
            ..SantanderParser::default()
        };
        let legacy = parser.parse(&StatementInput::pages([LEGACY])).unwrap();
        assert_eq!(legacy[0][1].detalle, "Transferencia recibida");
        assert_eq!(legacy[0][1].creditos, Some(dec!(20000.00)));

        let current = parser.parse(&StatementInput::pages([CURRENT])).unwrap();
        assert_eq!(current[0][1].detalle, "Compra con tarjeta de debito");
        assert_eq!(current[0][1].debitos, Some(dec!(22322.55)));
    }

    #[test]
    fn test_current_layout_is_strict() {
        let text = CURRENT.replace("$ 618.000,00", "$ 600.000,00");
        let err = SantanderParser::default()
            .parse(&StatementInput::pages([text]))
            .unwrap_err();
        match err {
            StatementError::Reconciliation { date, .. } => assert_eq!(date, "01/08/24"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_opening_balance() {
        let err = SantanderParser::default()
            .parse(&StatementInput::pages(["Movimientos en pesos\nFecha"]))
            .unwrap_err();
        assert!(matches!(err, StatementError::SectionNotFound { .. }));
    }
}
