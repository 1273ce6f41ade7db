//! Header-driven parsing of recognised statement tables.
//!
//! Banks whose extraction returns table cells with a labelled header row
//! (BBVA, Patagonia) are read by finding that header, mapping each column id
//! to a field by its label, and reading every later row through the map.
//!
//!   Fecha | Concepto | Referencia | Débito | Crédito | Saldo
//!         | SALDO ANTERIOR |       |        |         | 10.000,00
//!   01/03 | TRANSFERENCIA  | 4455  |        | 500,00  | 10.500,00
//!         | CUIT 20-1234   |       |        |         |
//!
//! A row without a date continues the previous description, except an
//! opening-balance row, which becomes a marker record of its own.

use std::sync::LazyLock;

use regex::Regex;
use resumen_core::{
    BankRecord, CanonicalTransaction, StatementError, TableCell, TableRow, group_table_rows,
    join_lines, split_detail,
};
use tracing::debug;

use super::{ContinuationBudget, amount, debit_amount, fold};

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}/\d{1,2}(?:/\d{2,4})?$").expect("date regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Fecha,
    Detalle,
    Referencia,
    Debito,
    Credito,
    Saldo,
}

/// Folded label prefixes per field.
const LABELS: [(Field, &[&str]); 6] = [
    (Field::Fecha, &["fecha"]),
    (Field::Detalle, &["concepto", "descripcion", "detalle", "movimiento"]),
    (Field::Referencia, &["referencia", "comprobante", "nro", "origen"]),
    (Field::Debito, &["debito"]),
    (Field::Credito, &["credito"]),
    (Field::Saldo, &["saldo"]),
];

fn field_for(label: &str) -> Option<Field> {
    let label = fold(label);
    LABELS
        .iter()
        .find(|(_, prefixes)| prefixes.iter().any(|p| label.starts_with(p)))
        .map(|(field, _)| *field)
}

/// Column id per field, from one header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderColumns {
    fecha: u32,
    detalle: Option<u32>,
    referencia: Option<u32>,
    debito: Option<u32>,
    credito: Option<u32>,
    saldo: Option<u32>,
}

impl HeaderColumns {
    /// A header needs a date column and at least one amount column.
    pub fn locate(row: &TableRow) -> Option<Self> {
        let mut fecha = None;
        let mut columns = Self::default();
        for (&column, text) in &row.cells {
            let Some(field) = field_for(text) else {
                continue;
            };
            let slot = match field {
                Field::Fecha => {
                    fecha.get_or_insert(column);
                    continue;
                }
                Field::Detalle => &mut columns.detalle,
                Field::Referencia => &mut columns.referencia,
                Field::Debito => &mut columns.debito,
                Field::Credito => &mut columns.credito,
                Field::Saldo => &mut columns.saldo,
            };
            slot.get_or_insert(column);
        }
        columns.fecha = fecha?;
        let has_amounts = columns.debito.is_some() || columns.credito.is_some();
        has_amounts.then_some(columns)
    }

    fn read(&self, row: &TableRow, column: Option<u32>) -> String {
        column.map(|c| row.text(c).trim().to_string()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTableRecord {
    pub fecha: String,
    /// Description lines, newline-joined.
    pub detalle: String,
    pub referencia: String,
    pub debito: String,
    pub credito: String,
    pub saldo: String,
}

impl BankRecord for HeaderTableRecord {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError> {
        let (detalle, rest) = split_detail(&self.detalle);
        Ok(CanonicalTransaction {
            fecha: self.fecha.clone(),
            detalle,
            referencia: join_lines([self.referencia.as_str(), rest.as_str()]),
            debitos: debit_amount(&self.debito)?,
            creditos: amount(&self.credito)?,
            saldo: amount(&self.saldo)?,
        })
    }
}

/// Read every row after the first header. Header rows repeated on later
/// pages remap the columns and are otherwise skipped.
pub fn parse_header_table(
    bank: &str,
    cells: &[TableCell],
    continuation_cap: usize,
) -> Result<Vec<HeaderTableRecord>, StatementError> {
    let mut records: Vec<HeaderTableRecord> = Vec::new();
    let mut columns: Option<HeaderColumns> = None;
    let mut continuation = ContinuationBudget::new(continuation_cap);

    for row in group_table_rows(cells) {
        if let Some(header) = HeaderColumns::locate(&row) {
            debug!(bank, ?header, "table header");
            columns = Some(header);
            continue;
        }
        let Some(columns) = columns.as_ref() else {
            continue;
        };
        if row.is_blank() {
            continue;
        }

        let fecha = columns.read(&row, Some(columns.fecha));
        let detalle = columns.read(&row, columns.detalle);
        let record = HeaderTableRecord {
            fecha: fecha.clone(),
            detalle: detalle.clone(),
            referencia: columns.read(&row, columns.referencia),
            debito: columns.read(&row, columns.debito),
            credito: columns.read(&row, columns.credito),
            saldo: columns.read(&row, columns.saldo),
        };

        if DATE.is_match(&fecha) || fold(&detalle).starts_with("saldo") {
            records.push(record);
            continuation.reset();
            continue;
        }

        match records.last_mut() {
            Some(last) if !detalle.is_empty() => {
                if continuation.admit(bank, &detalle) {
                    last.detalle.push('\n');
                    last.detalle.push_str(&detalle);
                }
            }
            _ => debug!(bank, fecha = %fecha, "row outside any movement skipped"),
        }
    }

    if columns.is_none() {
        return Err(StatementError::section_not_found(bank, "Fecha"));
    }
    Ok(records)
}
