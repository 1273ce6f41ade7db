//! Banco Provincia del Neuquén (BPN) statement parser (text)
//!
//! Expected extracted-text section; columns are separated by two or more spaces:
//!   Saldo Anterior en $ : 100.000,00
//!   05/03/2024  TRANSFERENCIA RECIBIDA  12345  50.000,00  150.000,00
//!   06/03/2024  COMISION MANTENIMIENTO  1.500,00  148.500,00
//!   Saldo en $ : 148.500,00

use std::sync::LazyLock;

use regex::Regex;
use resumen_core::{
    BankRecord, CanonicalTransaction, EntryContext, InferencePolicy, InputKind, Movement,
    RunningBalance, StatementError, StatementInput, split_wide_gaps,
};
use tracing::debug;

use super::{StatementParser, amount, debit_amount, expect_pages, side_texts};

const OPENING_MARKER: &str = "Saldo Anterior en $";

static OPENING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Saldo Anterior en \$\s*:\s*([-\d.,]+)").expect("opening regex"));

static CLOSING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Saldo en \$\s*:\s*([-\d.,]+)").expect("closing regex"));

static TRANSACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<fecha>\d{1,2}/\d{1,2}/\d{4})\s+",
        r"(?P<descripcion>.*?)\s{2,}",
        r"(?:(?P<comprobante>[A-Za-z0-9\s]+?)\s{2,})?",
        r"(?P<monto>[.\d,]+-?)?\s+",
        r"(?P<saldo>[-.\d,]+)$",
    ))
    .expect("transaction regex")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BpnRecord {
    pub fecha: String,
    pub descripcion: String,
    pub comprobante: String,
    pub debito: String,
    pub credito: String,
    pub saldo: String,
}

impl BankRecord for BpnRecord {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError> {
        // The description column sometimes carries its own reference after a wide gap.
        let parts = split_wide_gaps(&self.descripcion);
        let detalle = parts.first().copied().unwrap_or_default().to_string();
        let referencia = match parts.as_slice() {
            [_, .., last] => last.to_string(),
            _ => self.comprobante.clone(),
        };
        Ok(CanonicalTransaction {
            fecha: self.fecha.clone(),
            detalle,
            referencia,
            debitos: debit_amount(&self.debito)?,
            creditos: amount(&self.credito)?,
            saldo: amount(&self.saldo)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BpnParser {
    pub policy: InferencePolicy,
}

impl Default for BpnParser {
    fn default() -> Self {
        Self {
            policy: InferencePolicy::BalanceDirection,
        }
    }
}

impl StatementParser for BpnParser {
    type Record = BpnRecord;
    const BANK: &'static str = "BPN";

    fn input_kind(&self) -> InputKind {
        InputKind::PageText
    }

    fn parse_records(&self, input: &StatementInput) -> Result<Vec<Vec<BpnRecord>>, StatementError> {
        let pages = expect_pages(Self::BANK, input)?;

        let mut records = Vec::new();
        let mut balance = RunningBalance::new();
        let mut parsing = false;

        for raw in pages.iter().flat_map(|p| p.split('\n')) {
            let line = raw.trim();

            if !parsing {
                if let Some(caps) = OPENING.captures(line) {
                    let saldo = caps[1].to_string();
                    if let Some(opening) = amount(&saldo)? {
                        balance.set(opening);
                    }
                    records.push(BpnRecord {
                        descripcion: "Saldo Anterior".to_string(),
                        saldo,
                        ..Default::default()
                    });
                    parsing = true;
                }
                continue;
            }

            if CLOSING.is_match(line) {
                debug!(bank = Self::BANK, "closing balance reached");
                break;
            }

            let Some(caps) = TRANSACTION.captures(line) else {
                continue;
            };
            let field = |name: &str| caps.name(name).map_or("", |m| m.as_str()).trim().to_string();
            let fecha = field("fecha");
            let monto = field("monto");
            let saldo = field("saldo");

            let movement = match (amount(&monto)?, amount(&saldo)?) {
                (Some(value), Some(printed)) => {
                    let ctx = EntryContext {
                        bank: Self::BANK,
                        date: &fecha,
                        line,
                    };
                    balance.infer(value, printed, self.policy, ctx)?
                }
                (None, Some(printed)) => {
                    balance.set(printed);
                    Movement::default()
                }
                _ => Movement::default(),
            };

            let (debito, credito) = side_texts(movement);
            records.push(BpnRecord {
                descripcion: field("descripcion"),
                comprobante: field("comprobante"),
                debito,
                credito,
                fecha,
                saldo,
            });
        }

        if !parsing {
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

    const STATEMENT: &str = r#"BANCO PROVINCIA DEL NEUQUEN S.A.
Fecha       Descripción                 Comprobante  Importe     Saldo
Saldo Anterior en $ : 100.000,00
05/03/2024  TRANSFERENCIA RECIBIDA  12345  50.000,00  150.000,00
06/03/2024  COMISION MANTENIMIENTO  1.500,00  148.500,00
07/03/2024  PAGO PROVEEDOR  FACT 0001-2233  30.000,00  118.500,00
08/03/2024  AJUSTE  100,00  118.550,00
Saldo en $ : 118.550,00
09/03/2024  FUERA DE SECCION  1,00  2,00
"#;

    #[test]
    fn test_parse_bpn_statement() {
        let sections = BpnParser::default()
            .parse(&StatementInput::pages([STATEMENT]))
            .unwrap();
        let rows = &sections[0];
        assert_eq!(rows.len(), 5);

        assert_eq!(rows[0].detalle, "Saldo Anterior");
        assert_eq!(rows[0].saldo, Some(dec!(100000.00)));

        assert_eq!(rows[1].detalle, "TRANSFERENCIA RECIBIDA");
        assert_eq!(rows[1].referencia, "12345");
        assert_eq!(rows[1].creditos, Some(dec!(50000.00)));

        assert_eq!(rows[2].detalle, "COMISION MANTENIMIENTO");
        assert_eq!(rows[2].referencia, "");
        assert_eq!(rows[2].debitos, Some(dec!(1500.00)));

        assert_eq!(rows[3].detalle, "PAGO PROVEEDOR");
        assert_eq!(rows[3].referencia, "FACT 0001-2233");
        assert_eq!(rows[3].debitos, Some(dec!(30000.00)));
    }

    #[test]
    fn test_balance_direction_fallback() {
        let sections = BpnParser::default()
            .parse(&StatementInput::pages([STATEMENT]))
            .unwrap();
        let adjustment = &sections[0][4];
        // 118.500 + 100 is not 118.550, but the balance went up.
        assert_eq!(adjustment.creditos, Some(dec!(100.00)));
        assert_eq!(adjustment.debitos, None);
        assert_eq!(check_continuity(&sections[0][..4]), None);
    }

    #[test]
    fn test_trailing_minus_amount_is_a_debit() {
        let text = "Saldo Anterior en $ : 1.000,00\n02/05/2024  DEBITO AUTOMATICO  100,00-  900,00\nSaldo en $ : 900,00";
        let sections = BpnParser::default()
            .parse(&StatementInput::pages([text]))
            .unwrap();
        let row = &sections[0][1];
        assert_eq!(row.detalle, "DEBITO AUTOMATICO");
        assert_eq!(row.debitos, Some(dec!(100.00)));
        assert_eq!(row.creditos, None);
        assert_eq!(check_continuity(&sections[0]), None);
    }

    #[test]
    fn test_missing_opening_balance() {
        let err = BpnParser::default()
            .parse(&StatementInput::pages(["05/03/2024  X  1,00  2,00"]))
            .unwrap_err();
        assert!(matches!(err, StatementError::SectionNotFound { .. }));
    }
}
