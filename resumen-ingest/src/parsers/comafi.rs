//! Banco Comafi account statement parser (fixed-width text)
//!
//! Expected extracted-text section, repeated once per account:
//!   DETALLE DE MOVIMIENTOS
//!    Fecha   Conceptos                          Referencias          Débitos       Créditos              Saldo
//!   31/12/22                                                       Saldo Anterior                   2.246.170,50
//!   03/01/23 Impuesto a los debitos - tasa gene 0012745                 0,89
//!                                                                   Saldo al: 31/01/2023            2.239.979,46
//!
//! Column boundaries hang off the header labels, which are re-located after
//! every section marker since they shift between pages.

use std::sync::LazyLock;

use regex::Regex;
use resumen_core::{
    Anchor, BankRecord, CanonicalTransaction, ColumnLayout, ColumnSpec, EntryContext, InputKind,
    Movement, ReconcileMode, RunningBalance, StatementError, StatementInput, is_separator_line,
    join_lines,
};
use tracing::debug;

use super::{
    ContinuationBudget, DEFAULT_CONTINUATION_CAP, StatementParser, amount, debit_amount, expect_pages,
    format_optional,
};

const SECTION_MARKER: &str = "DETALLE DE MOVIMIENTOS";
const OPENING_MARKER: &str = "Saldo Anterior";

pub const COMAFI_COLUMNS: [ColumnSpec; 6] = [
    ColumnSpec::new("fecha", Anchor::start_of("Fecha", -1), Some(Anchor::start_of("Conceptos", 0))),
    ColumnSpec::new("conceptos", Anchor::start_of("Conceptos", 0), Some(Anchor::start_of("Referencias", -1))),
    ColumnSpec::new("referencias", Anchor::start_of("Referencias", 0), Some(Anchor::start_of("Débitos", -8))),
    ColumnSpec::new("debitos", Anchor::start_of("Débitos", -6), Some(Anchor::end_of("Débitos", 1))),
    ColumnSpec::new("creditos", Anchor::start_of("Créditos", -6), Some(Anchor::end_of("Créditos", 1))),
    ColumnSpec::new("saldo", Anchor::start_of("Saldo", -9), Some(Anchor::end_of("Saldo", 2))),
];

static DATE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{2,4}\s").expect("date line regex"));

static CLOSING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Saldo al:\s*(\d{2})/(\d{2})/\d{2}(\d{2})\s+([\d.,]+-?)").expect("closing regex")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComafiRecord {
    pub fecha: String,
    pub conceptos: String,
    pub referencias: String,
    pub debitos: String,
    pub creditos: String,
    pub saldo: String,
}

impl ComafiRecord {
    fn balance(fecha: String, conceptos: &str, saldo: String) -> Self {
        Self {
            fecha,
            conceptos: conceptos.to_string(),
            saldo,
            ..Self::default()
        }
    }
}

impl BankRecord for ComafiRecord {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError> {
        Ok(CanonicalTransaction {
            fecha: self.fecha.clone(),
            detalle: self.conceptos.clone(),
            referencia: self.referencias.clone(),
            debitos: debit_amount(&self.debitos)?,
            creditos: amount(&self.creditos)?,
            saldo: amount(&self.saldo)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ComafiParser {
    pub columns: Vec<ColumnSpec>,
    pub mode: ReconcileMode,
    pub continuation_cap: usize,
}

impl Default for ComafiParser {
    fn default() -> Self {
        Self {
            columns: COMAFI_COLUMNS.to_vec(),
            mode: ReconcileMode::Validate,
            continuation_cap: DEFAULT_CONTINUATION_CAP,
        }
    }
}

struct Scan {
    sections: Vec<Vec<ComafiRecord>>,
    current: Vec<ComafiRecord>,
    balance: RunningBalance,
    in_section: bool,
    found: bool,
    continuation: ContinuationBudget,
}

impl Scan {
    fn new(continuation_cap: usize) -> Self {
        Self {
            sections: Vec::new(),
            current: Vec::new(),
            balance: RunningBalance::new(),
            in_section: false,
            found: false,
            continuation: ContinuationBudget::new(continuation_cap),
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.sections.push(std::mem::take(&mut self.current));
        }
    }
}

impl ComafiParser {
    fn ctx<'a>(&self, date: &'a str, line: &'a str) -> EntryContext<'a> {
        EntryContext {
            bank: Self::BANK,
            date,
            line,
        }
    }

    fn step(
        &self,
        scan: &mut Scan,
        layout: &mut Option<ColumnLayout>,
        line: &str,
    ) -> Result<(), StatementError> {
        let trimmed = line.trim();

        if !scan.in_section {
            if trimmed.contains(SECTION_MARKER) {
                debug!(bank = Self::BANK, "section opened");
                scan.in_section = true;
                scan.found = true;
                *layout = None;
            }
            return Ok(());
        }

        if let Some(caps) = CLOSING_LINE.captures(trimmed) {
            let fecha = format!("{}/{}/{}", &caps[1], &caps[2], &caps[3]);
            let saldo = caps[4].to_string();
            scan.balance
                .post(Movement::default(), amount(&saldo)?, self.mode, self.ctx(&fecha, trimmed))?;
            scan.current.push(ComafiRecord::balance(fecha, "Saldo", saldo));
            scan.flush();
            scan.balance.clear();
            scan.in_section = false;
            *layout = None;
            debug!(bank = Self::BANK, "section closed");
            return Ok(());
        }

        if layout.is_none() {
            *layout = ColumnLayout::locate(line, &self.columns);
            return Ok(());
        }
        let Some(columns) = layout.as_ref() else {
            return Ok(());
        };

        if trimmed.is_empty() || is_separator_line(trimmed) || trimmed.starts_with("Transporte") {
            return Ok(());
        }
        if trimmed.contains("SIN MOVIMIENTOS") {
            debug!(bank = Self::BANK, "account without movements");
            return Ok(());
        }

        if DATE_LINE.is_match(trimmed) {
            let mut record = ComafiRecord {
                fecha: columns.slice(line, "fecha"),
                conceptos: columns.slice(line, "conceptos"),
                referencias: columns.slice(line, "referencias"),
                debitos: columns.slice(line, "debitos"),
                creditos: columns.slice(line, "creditos"),
                saldo: columns.slice(line, "saldo"),
            };

            if record.conceptos.contains(OPENING_MARKER) || record.referencias.contains(OPENING_MARKER) {
                scan.flush();
                match amount(&record.saldo)? {
                    Some(opening) => scan.balance.set(opening),
                    None => scan.balance.clear(),
                }
                scan.current
                    .push(ComafiRecord::balance(record.fecha, OPENING_MARKER, record.saldo));
                scan.continuation.reset();
                return Ok(());
            }

            let movement = Movement {
                debit: debit_amount(&record.debitos)?,
                credit: amount(&record.creditos)?,
            };
            let recorded = scan.balance.post(
                movement,
                amount(&record.saldo)?,
                self.mode,
                self.ctx(&record.fecha, trimmed),
            )?;
            if record.saldo.is_empty() {
                record.saldo = format_optional(recorded);
            }
            scan.current.push(record);
            scan.continuation.reset();
            return Ok(());
        }

        let Some(last) = scan.current.last_mut() else {
            return Ok(());
        };
        let referencias = columns.slice(line, "referencias");
        let debitos = columns.slice(line, "debitos");
        let creditos = columns.slice(line, "creditos");
        let saldo = columns.slice(line, "saldo");
        if referencias.is_empty() && debitos.is_empty() && creditos.is_empty() && saldo.is_empty() {
            return Ok(());
        }
        if !referencias.is_empty() && scan.continuation.admit(Self::BANK, trimmed) {
            last.referencias = join_lines([last.referencias.as_str(), referencias.as_str()]);
        }
        if debitos.is_empty() && creditos.is_empty() && saldo.is_empty() {
            return Ok(());
        }

        let movement = Movement {
            debit: debit_amount(&debitos)?,
            credit: amount(&creditos)?,
        };
        let recorded = scan.balance.post(
            movement,
            amount(&saldo)?,
            self.mode,
            self.ctx(&last.fecha, trimmed),
        )?;
        if !debitos.is_empty() {
            last.debitos = debitos;
        }
        if !creditos.is_empty() {
            last.creditos = creditos;
        }
        last.saldo = if saldo.is_empty() { format_optional(recorded) } else { saldo };
        Ok(())
    }
}

impl StatementParser for ComafiParser {
    type Record = ComafiRecord;
    const BANK: &'static str = "Comafi";

    fn input_kind(&self) -> InputKind {
        InputKind::PageText
    }

    fn parse_records(&self, input: &StatementInput) -> Result<Vec<Vec<ComafiRecord>>, StatementError> {
        let pages = expect_pages(Self::BANK, input)?;
        let mut scan = Scan::new(self.continuation_cap);

        for page in pages {
            // Each page reprints the header at its own offsets.
            let mut layout = None;
            for line in page.split('\n') {
                self.step(&mut scan, &mut layout, line)?;
            }
        }

        if !scan.found {
            return Err(StatementError::section_not_found(Self::BANK, SECTION_MARKER));
        }
        scan.flush();
        Ok(scan.sections)
    }
}
