//! Banco Credicoop account statement parser (fixed-width text)
//!
//! Expected extracted-text section:
//!   SALDO ANTERIOR                                                                        1.000,00
//!   FECHA    COMBTE DESCRIPCION                              DEBITO           CREDITO           SALDO
//!   02/05/24 262144 Transf. Inmediata e/Ctas.Dist.Titular         200,00                           800,00
//!                   CUIT 20123456789
//!   CONTINUA EN PAGINA SIGUIENTE
//!   SALDO AL 31/05/24                                                                       800,00
//!
//! Columns sit at fixed character positions.

use std::sync::LazyLock;

use regex::Regex;
use resumen_core::{
    BankRecord, CanonicalTransaction, ColumnLayout, ColumnSpec, EntryContext, InputKind, Movement,
    ReconcileMode, RunningBalance, StatementError, StatementInput, raw_page_lines,
};
use tracing::debug;

use super::{
    ContinuationBudget, DEFAULT_CONTINUATION_CAP, StatementParser, amount, debit_amount, expect_pages,
    format_optional,
};

const OPENING_MARKER: &str = "SALDO ANTERIOR";
const PAGE_BREAK: &str = "CONTINUA EN PAGINA SIGUIENTE";

pub const CREDICOOP_COLUMNS: [ColumnSpec; 6] = [
    ColumnSpec::fixed("FECHA", 0, Some(9)),
    ColumnSpec::fixed("COMBTE", 9, Some(16)),
    ColumnSpec::fixed("DESCRIPCION", 16, Some(57)),
    ColumnSpec::fixed("DEBITO", 57, Some(74)),
    ColumnSpec::fixed("CREDITO", 74, Some(92)),
    ColumnSpec::fixed("SALDO", 92, None),
];

static DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{2}$").expect("date regex"));

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^FECHA\s+COMBTE\s+DESCRIPCION\s+DEBITO\s+CREDITO\s+SALDO").expect("header regex")
});

static CLOSING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"SALDO AL\s+(\d{2}/\d{2}/\d{2})\s+([\d.,\-]+)").expect("closing regex")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredicoopRecord {
    pub fecha: String,
    pub combte: String,
    pub descripcion: String,
    pub debito: String,
    pub credito: String,
    pub saldo: String,
}

impl BankRecord for CredicoopRecord {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError> {
        Ok(CanonicalTransaction {
            fecha: self.fecha.clone(),
            detalle: self.descripcion.clone(),
            referencia: self.combte.clone(),
            debitos: debit_amount(&self.debito)?,
            creditos: amount(&self.credito)?,
            saldo: amount(&self.saldo)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CredicoopParser {
    pub columns: Vec<ColumnSpec>,
    pub mode: ReconcileMode,
    pub continuation_cap: usize,
}

impl Default for CredicoopParser {
    fn default() -> Self {
        Self {
            columns: CREDICOOP_COLUMNS.to_vec(),
            mode: ReconcileMode::Validate,
            continuation_cap: DEFAULT_CONTINUATION_CAP,
        }
    }
}

/// The opening amount is the last token of the marker line, or the next
/// non-blank line when the extractor split it off.
fn opening_amount(lines: &[String], idx: usize) -> (String, usize) {
    let own = lines[idx].split_whitespace().last().unwrap_or_default();
    if amount(own).is_ok_and(|a| a.is_some()) {
        return (own.to_string(), idx);
    }
    if let Some((next_idx, next)) = lines
        .iter()
        .enumerate()
        .skip(idx + 1)
        .find(|(_, l)| !l.trim().is_empty())
    {
        if amount(next.trim()).is_ok_and(|a| a.is_some()) {
            return (next.trim().to_string(), next_idx);
        }
    }
    (String::new(), idx)
}

impl StatementParser for CredicoopParser {
    type Record = CredicoopRecord;
    const BANK: &'static str = "Credicoop";

    fn input_kind(&self) -> InputKind {
        InputKind::PageText
    }

    fn parse_records(&self, input: &StatementInput) -> Result<Vec<Vec<CredicoopRecord>>, StatementError> {
        let pages = expect_pages(Self::BANK, input)?;
        let lines = raw_page_lines(pages);
        let Some(layout) = ColumnLayout::absolute(&self.columns) else {
            return Err(StatementError::section_not_found(Self::BANK, "column layout"));
        };
        let date_of = |line: &str| {
            let fecha = layout.slice(line, "FECHA");
            DATE.is_match(&fecha).then_some(fecha)
        };

        let mut entries: Vec<CredicoopRecord> = Vec::new();
        let mut balance = RunningBalance::new();
        let mut processing = false;
        let mut skip_until_header = false;
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i].as_str();
            let trimmed = line.trim();

            if !processing {
                if trimmed.contains(OPENING_MARKER) {
                    let (saldo, consumed) = opening_amount(&lines, i);
                    match amount(&saldo)? {
                        Some(opening) => balance.set(opening),
                        None => balance.clear(),
                    }
                    entries.push(CredicoopRecord {
                        descripcion: OPENING_MARKER.to_string(),
                        saldo,
                        ..Default::default()
                    });
                    processing = true;
                    i = consumed;
                }
                i += 1;
                continue;
            }

            if trimmed.contains(PAGE_BREAK) {
                skip_until_header = true;
            } else if skip_until_header {
                if HEADER.is_match(trimmed) {
                    skip_until_header = false;
                }
            } else if trimmed.is_empty() {
                // blank
            } else if let Some(caps) = CLOSING.captures(trimmed) {
                let fecha = caps[1].to_string();
                let saldo = caps[2].to_string();
                let ctx = EntryContext { bank: Self::BANK, date: &fecha, line: trimmed };
                balance.post(Movement::default(), amount(&saldo)?, self.mode, ctx)?;
                entries.push(CredicoopRecord {
                    fecha,
                    descripcion: "SALDO FINAL".to_string(),
                    saldo,
                    ..Default::default()
                });
                break;
            } else if let Some(fecha) = date_of(line) {
                let mut record = CredicoopRecord {
                    fecha,
                    combte: layout.slice(line, "COMBTE"),
                    descripcion: layout.slice(line, "DESCRIPCION"),
                    debito: layout.slice(line, "DEBITO"),
                    credito: layout.slice(line, "CREDITO"),
                    saldo: layout.slice(line, "SALDO"),
                };

                let mut continuation = ContinuationBudget::new(self.continuation_cap);
                while let Some(next) = lines.get(i + 1) {
                    let next_trimmed = next.trim();
                    if next_trimmed.is_empty()
                        || date_of(next).is_some()
                        || next_trimmed.contains("SALDO AL")
                        || next_trimmed.contains(PAGE_BREAK)
                    {
                        break;
                    }
                    let extra = layout.slice(next, "DESCRIPCION");
                    if !extra.is_empty() && continuation.admit(Self::BANK, next_trimmed) {
                        record.descripcion.push('\n');
                        record.descripcion.push_str(&extra);
                    }
                    i += 1;
                }

                let movement = Movement {
                    debit: debit_amount(&record.debito)?,
                    credit: amount(&record.credito)?,
                };
                let ctx = EntryContext { bank: Self::BANK, date: &record.fecha, line: trimmed };
                let recorded = balance.post(movement, amount(&record.saldo)?, self.mode, ctx)?;
                if record.saldo.is_empty() {
                    record.saldo = format_optional(recorded);
                }
                entries.push(record);
            } else {
                debug!(bank = Self::BANK, line = trimmed, "ignored line");
            }

            i += 1;
        }

        if !processing {
            return Err(StatementError::section_not_found(Self::BANK, OPENING_MARKER));
        }
        Ok(vec![entries])
    }
}
