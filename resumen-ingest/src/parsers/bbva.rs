//! BBVA statement parser (recognised table cells)
//!
//! BBVA tables carry a labelled header (`Fecha | Concepto | Débito | Crédito | Saldo`)
//! and are read through [`parse_header_table`].

use resumen_core::{InputKind, StatementError, StatementInput};

use super::header_table::{HeaderTableRecord, parse_header_table};
use super::{DEFAULT_CONTINUATION_CAP, StatementParser, expect_cells};

#[derive(Debug, Clone)]
pub struct BbvaParser {
    pub continuation_cap: usize,
}

impl Default for BbvaParser {
    fn default() -> Self {
        Self {
            continuation_cap: DEFAULT_CONTINUATION_CAP,
        }
    }
}

impl StatementParser for BbvaParser {
    type Record = HeaderTableRecord;
    const BANK: &'static str = "BBVA";

    fn input_kind(&self) -> InputKind {
        InputKind::TableCells
    }

    fn parse_records(
        &self,
        input: &StatementInput,
    ) -> Result<Vec<Vec<HeaderTableRecord>>, StatementError> {
        let cells = expect_cells(Self::BANK, input)?;
        Ok(vec![parse_header_table(Self::BANK, cells, self.continuation_cap)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resumen_core::{TableCell, check_continuity};
    use rust_decimal_macros::dec;

    fn cells() -> Vec<TableCell> {
        let rows: [&[&str]; 5] = [
            &["FECHA", "CONCEPTO", "DÉBITO", "CRÉDITO", "SALDO"],
            &["", "SALDO ANTERIOR", "", "", "250.000,00"],
            &["02/05", "PAGO SERVICIO EDENOR", "-12.500,00", "", "237.500,00"],
            &["03/05", "TRANSFERENCIA RECIBIDA", "", "40.000,00", "277.500,00"],
            &["", "DE GOMEZ MARIA", "", "", ""],
        ];
        rows.iter()
            .enumerate()
            .flat_map(|(r, texts)| {
                texts
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| !t.is_empty())
                    .map(move |(c, t)| TableCell::new(r as u32, c as u32, *t).in_table(0, 1))
            })
            .collect()
    }

    #[test]
    fn test_parse_bbva_table() {
        let sections = BbvaParser::default()
            .parse(&StatementInput::Cells(cells()))
            .unwrap();
        let rows = &sections[0];
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].detalle, "SALDO ANTERIOR");
        assert_eq!(rows[0].saldo, Some(dec!(250000.00)));
        assert_eq!(rows[1].debitos, Some(dec!(12500.00)));
        assert_eq!(rows[2].detalle, "TRANSFERENCIA RECIBIDA");
        assert_eq!(rows[2].referencia, "DE GOMEZ MARIA");
        assert_eq!(check_continuity(rows), None);
    }
}
