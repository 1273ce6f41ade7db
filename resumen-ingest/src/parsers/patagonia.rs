//! Banco Patagonia statement parser (recognised table cells)
//!
//! Same header-driven layout as BBVA, usually with a `Comprobante` column
//! between the description and the amounts.

use resumen_core::{InputKind, StatementError, StatementInput};

use super::header_table::{HeaderTableRecord, parse_header_table};
use super::{DEFAULT_CONTINUATION_CAP, StatementParser, expect_cells};

#[derive(Debug, Clone)]
pub struct PatagoniaParser {
    pub continuation_cap: usize,
}

impl Default for PatagoniaParser {
    fn default() -> Self {
        Self {
            continuation_cap: DEFAULT_CONTINUATION_CAP,
        }
    }
}

impl StatementParser for PatagoniaParser {
    type Record = HeaderTableRecord;
    const BANK: &'static str = "Patagonia";

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
