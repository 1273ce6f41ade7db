//! Mercado Pago account statement parser (text)
//!
//! Expected extracted-text section:
//!   Saldo inicial: $ 10.000,00
//!   DETALLE DE MOVIMIENTOS
//!   Fecha Descripción ID de la operación Valor Saldo
//!   01-03-2024 Transferencia recibida
//!   de Juan Perez 71234567890 $ 5.000,00 $ 15.000,00
//!   02-03-2024 Pago de servicios 71234567891 $ -2.650,00 $ 12.350,00
//!
//! A movement runs from one `dd-mm-yyyy` date to the next. Its last two
//! currency values are the signed amount and the balance after it.

use std::sync::LazyLock;

use regex::Regex;
use resumen_core::{BankRecord, CanonicalTransaction, InputKind, Movement, StatementError, StatementInput};
use tracing::debug;

use super::{StatementParser, amount, expect_pages};

const SECTION_MARKER: &str = "DETALLE DE MOVIMIENTOS";

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}-\d{2}-\d{4}").expect("date regex"));

static LEADING_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}-\d{2}-\d{4}\s*").expect("leading date regex"));

static CURRENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s*-?\d+(?:(?:\.\d{3})*,\d{2}|,\d{2})").expect("currency regex")
});

static OPENING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Saldo inicial:\s*(\$\s*-?\d+(?:(?:\.\d{3})*,\d{2}|,\d{2}))").expect("opening regex")
});

static DESCRIPTION_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{8}").expect("description end regex"));

static OPERATION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{11}").expect("operation id regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MercadoPagoRecord {
    pub fecha: String,
    pub descripcion: String,
    pub id: String,
    /// Signed amount, `-2.650,00` for money out.
    pub valor: String,
    pub saldo: String,
}

impl BankRecord for MercadoPagoRecord {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError> {
        let movement = amount(&self.valor)?
            .filter(|v| !v.is_zero())
            .map(Movement::signed)
            .unwrap_or_default();
        Ok(CanonicalTransaction {
            fecha: self.fecha.clone(),
            detalle: self.descripcion.clone(),
            referencia: self.id.clone(),
            debitos: movement.debit,
            creditos: movement.credit,
            saldo: amount(&self.saldo)?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MercadoPagoParser;

fn currency_text(matched: &str) -> String {
    matched.trim_start_matches('$').trim().to_string()
}

/// Description lines of one movement, up to the line holding its operation id.
fn description(segment: &str) -> String {
    let mut lines = Vec::new();
    for line in segment.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let line = LEADING_DATE.replace(line, "");
        if let Some(m) = DESCRIPTION_END.find(&line) {
            let before = line[..m.start()].trim();
            if !before.is_empty() {
                lines.push(before.to_string());
            }
            break;
        }
        lines.push(line.trim().to_string());
    }
    lines.join("\n")
}

impl StatementParser for MercadoPagoParser {
    type Record = MercadoPagoRecord;
    const BANK: &'static str = "MercadoPago";

    fn input_kind(&self) -> InputKind {
        InputKind::PageText
    }

    fn parse_records(
        &self,
        input: &StatementInput,
    ) -> Result<Vec<Vec<MercadoPagoRecord>>, StatementError> {
        let pages = expect_pages(Self::BANK, input)?;

        let mut records = Vec::new();
        let mut found = false;

        for page in pages {
            if records.is_empty() {
                if let Some(caps) = OPENING.captures(page) {
                    let saldo = currency_text(&caps[1]);
                    records.push(MercadoPagoRecord {
                        descripcion: "Saldo inicial".to_string(),
                        saldo,
                        ..Default::default()
                    });
                    found = true;
                }
            }

            // Movements start on the line after the column headers.
            let mut pos = match page.find(SECTION_MARKER) {
                Some(at) => {
                    found = true;
                    let after = at + SECTION_MARKER.len();
                    page[after..].find('\n').map_or(page.len(), |nl| after + nl + 1)
                }
                None => 0,
            };

            while let Some(date) = DATE.find_at(page, pos) {
                let start = date.start();
                let end = DATE.find_at(page, date.end()).map_or(page.len(), |next| next.start());
                pos = date.end();
                let segment = &page[start..end];

                let values: Vec<String> = CURRENCY.find_iter(segment).map(|m| currency_text(m.as_str())).collect();
                let [.., valor, saldo] = values.as_slice() else {
                    debug!(bank = Self::BANK, segment, "movement without amount and balance");
                    continue;
                };

                records.push(MercadoPagoRecord {
                    fecha: date.as_str().replace('-', "/"),
                    descripcion: description(segment),
                    id: OPERATION_ID.find(segment).map(|m| m.as_str().to_string()).unwrap_or_default(),
                    valor: valor.clone(),
                    saldo: saldo.clone(),
                });
            }
        }

        if !found {
            return Err(StatementError::section_not_found(Self::BANK, SECTION_MARKER));
        }
        Ok(vec![records])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resumen_core::check_continuity;
    use rust_decimal_macros::dec;

    const PAGE_ONE: &str = r#"RESUMEN DE CUENTA
Periodo: del 01-03-2024 al 31-03-2024
Saldo inicial: $ 10.000,00
Saldo final: $ 12.362,35
DETALLE DE MOVIMIENTOS
Fecha Descripción ID de la operación Valor Saldo
01-03-2024 Transferencia recibida
de Juan Perez 71234567890 $ 5.000,00 $ 15.000,00
02-03-2024 Pago de servicios 71234567891 $ -2.650,00 $ 12.350,00
"#;

    const PAGE_TWO: &str = r#"03-03-2024 Rendimientos 71234567892 $ 12,35 $ 12.362,35
"#;

    #[test]
    fn test_parse_mercadopago_pages() {
        let sections = MercadoPagoParser
            .parse(&StatementInput::pages([PAGE_ONE, PAGE_TWO]))
            .unwrap();
        assert_eq!(sections.len(), 1);
        let rows = &sections[0];
        assert_eq!(rows.len(), 4);

        assert_eq!(rows[0].detalle, "Saldo inicial");
        assert_eq!(rows[0].saldo, Some(dec!(10000.00)));

        assert_eq!(rows[1].fecha, "01/03/2024");
        assert_eq!(rows[1].detalle, "Transferencia recibida\nde Juan Perez");
        assert_eq!(rows[1].referencia, "71234567890");
        assert_eq!(rows[1].creditos, Some(dec!(5000.00)));

        assert_eq!(rows[2].detalle, "Pago de servicios");
        assert_eq!(rows[2].debitos, Some(dec!(2650.00)));
        assert_eq!(rows[2].creditos, None);

        assert_eq!(rows[3].creditos, Some(dec!(12.35)));
        assert_eq!(check_continuity(rows), None);
    }

    #[test]
    fn test_requires_movement_section() {
        let err = MercadoPagoParser
            .parse(&StatementInput::pages(["RESUMEN DE CUENTA"]))
            .unwrap_err();
        assert!(matches!(err, StatementError::SectionNotFound { .. }));
    }
}
