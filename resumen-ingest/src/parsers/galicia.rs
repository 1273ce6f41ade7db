//! Banco Galicia statement parser (recognised table cells)
//!
//! Expected table rows after the header (`col_0 == "Fecha"`):
//!   col_0 Fecha | col_1 Descripción | col_2 Origen | col_3 Crédito | col_4 Débito | col_5 Saldo
//!
//! A row with an empty date column continues the previous row's description.

use resumen_core::{
    BankRecord, CanonicalTransaction, InputKind, StatementError, StatementInput, TableRow,
    group_table_rows, split_detail,
};
use super::{ContinuationBudget, DEFAULT_CONTINUATION_CAP, StatementParser, amount, debit_amount, expect_cells};

const HEADER_LABEL: &str = "Fecha";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GaliciaRecord {
    pub fecha: String,
    /// First line is the movement; later lines carry the counterparty and references.
    pub descripcion: String,
    pub origen: String,
    pub credito: String,
    pub debito: String,
    pub saldo: String,
}

impl BankRecord for GaliciaRecord {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError> {
        let (detalle, referencia) = split_detail(&self.descripcion);
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
pub struct GaliciaParser {
    pub continuation_cap: usize,
}

impl Default for GaliciaParser {
    fn default() -> Self {
        Self {
            continuation_cap: DEFAULT_CONTINUATION_CAP,
        }
    }
}

fn cell(row: &TableRow, column: u32) -> String {
    row.text(column).trim().to_string()
}

impl StatementParser for GaliciaParser {
    type Record = GaliciaRecord;
    const BANK: &'static str = "Galicia";

    fn input_kind(&self) -> InputKind {
        InputKind::TableCells
    }

    fn parse_records(&self, input: &StatementInput) -> Result<Vec<Vec<GaliciaRecord>>, StatementError> {
        let cells = expect_cells(Self::BANK, input)?;

        let mut records = Vec::new();
        let mut current: Option<(GaliciaRecord, Vec<String>)> = None;
        let mut continuation = ContinuationBudget::new(self.continuation_cap);
        let mut processing = false;

        let flush = |current: &mut Option<(GaliciaRecord, Vec<String>)>, records: &mut Vec<GaliciaRecord>| {
            if let Some((mut record, lines)) = current.take() {
                record.descripcion = lines.join("\n");
                records.push(record);
            }
        };

        for row in group_table_rows(cells) {
            if row.text(0).trim() == HEADER_LABEL {
                flush(&mut current, &mut records);
                processing = true;
                continue;
            }
            if !processing || row.is_blank() {
                continue;
            }

            let fecha = cell(&row, 0);
            if !fecha.is_empty() {
                flush(&mut current, &mut records);
                continuation.reset();
                let first = cell(&row, 1);
                current = Some((
                    GaliciaRecord {
                        fecha,
                        origen: cell(&row, 2),
                        credito: cell(&row, 3),
                        debito: cell(&row, 4),
                        saldo: cell(&row, 5),
                        ..Default::default()
                    },
                    if first.is_empty() { Vec::new() } else { vec![first] },
                ));
                continue;
            }

            let extra = cell(&row, 1);
            if let Some((_, lines)) = current.as_mut() {
                // The first row stands in for a missing description.
                if !extra.is_empty() && (lines.is_empty() || continuation.admit(Self::BANK, &extra)) {
                    lines.push(extra);
                }
            }
        }
        flush(&mut current, &mut records);

        if !processing {
            return Err(StatementError::section_not_found(Self::BANK, HEADER_LABEL));
        }
        Ok(vec![records])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resumen_core::TableCell;
    use rust_decimal_macros::dec;

    fn row(row_id: u32, texts: &[&str]) -> Vec<TableCell> {
        texts
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.is_empty())
            .map(|(col, text)| TableCell::new(row_id, col as u32, *text))
            .collect()
    }

    fn statement() -> StatementInput {
        let mut cells = Vec::new();
        cells.extend(row(0, &["Resumen de cuenta", "", "", "", "", ""]));
        cells.extend(row(1, &["Fecha", "Descripción", "Origen", "Crédito", "Débito", "Saldo"]));
        cells.extend(row(2, &["01/03/24", "TRANSFERENCIA DE TERCEROS", "", "150.000,00", "", "1.150.000,00"]));
        cells.extend(row(3, &["", "PEREZ JUAN", "", "", "", ""]));
        cells.extend(row(4, &["", "20123456789", "", "", "", ""]));
        cells.extend(row(5, &["02/03/24", "PAGO VISA", "Home banking", "", "-50.000,00", "1.100.000,00"]));
        StatementInput::Cells(cells)
    }

    #[test]
    fn test_parse_galicia_cells() {
        let sections = GaliciaParser::default().parse(&statement()).unwrap();
        let rows = &sections[0];
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].fecha, "01/03/24");
        assert_eq!(rows[0].detalle, "TRANSFERENCIA DE TERCEROS");
        assert_eq!(rows[0].referencia, "PEREZ JUAN\n20123456789");
        assert_eq!(rows[0].creditos, Some(dec!(150000.00)));
        assert_eq!(rows[0].saldo, Some(dec!(1150000.00)));

        assert_eq!(rows[1].detalle, "PAGO VISA");
        assert_eq!(rows[1].referencia, "");
        assert_eq!(rows[1].debitos, Some(dec!(50000.00)));
    }

    #[test]
    fn test_continuation_cap_drops_extra_rows() {
        let parser = GaliciaParser { continuation_cap: 1 };
        let sections = parser.parse(&statement()).unwrap();
        let rows = &sections[0];
        assert_eq!(rows[0].detalle, "TRANSFERENCIA DE TERCEROS");
        assert_eq!(rows[0].referencia, "PEREZ JUAN");
        assert_eq!(rows[1].detalle, "PAGO VISA");
    }

    #[test]
    fn test_rejects_page_text() {
        let err = GaliciaParser::default()
            .parse(&StatementInput::pages(["Fecha Descripción"]))
            .unwrap_err();
        assert!(matches!(err, StatementError::UnsupportedInput { .. }));
    }

    #[test]
    fn test_missing_header_row() {
        let err = GaliciaParser::default()
            .parse(&StatementInput::Cells(row(0, &["01/03/24", "X"])))
            .unwrap_err();
        assert!(matches!(err, StatementError::SectionNotFound { .. }));
    }
}
