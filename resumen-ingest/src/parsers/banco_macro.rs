//! Banco Macro statement parser (positioned text or page text)
//!
//! Macro statements are best read from a layout-aware extraction: text runs
//! with coordinates are regrouped into lines first. Expected lines:
//!   SALDO ULTIMO EXTRACTO AL 31/01/2024 100.000,00
//!   01/02/24 COMPRA DEBITO 1234 5.000,00 95.000,00
//!   03/02/24 COMISION 1.000,00
//!   SALDO FINAL AL DIA 03/02/2024 144.000,00
//!
//! After the description comes an optional reference number, the amount and,
//! when printed, the balance.

use std::sync::LazyLock;

use regex::Regex;
use resumen_core::{
    BankRecord, CanonicalTransaction, DEFAULT_LINE_THRESHOLD, EntryContext, InferencePolicy,
    InputKind, Movement, ReconcileMode, RunningBalance, StatementError, StatementInput,
    lines_from_fragments, page_lines,
};
use tracing::{debug, warn};

use super::{StatementParser, amount, debit_amount, side_texts, unsupported};

const OPENING_MARKER: &str = "SALDO ULTIMO EXTRACTO";

static OPENING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)SALDO ULTIMO EXTRACTO AL\s*(\d{1,2}/\d{1,2}/\d{4})\s*([\d.,]+)")
        .expect("opening regex")
});

static CLOSING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)SALDO FINAL AL DIA\s*(\d{1,2}/\d{1,2}/\d{4})\s*([\d.,]+)").expect("closing regex")
});

static DATED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}/\d{1,2}/\d{2,4})\s+(.*)").expect("dated line regex"));

static MOVEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<descripcion>.*?)\s+",
        r"(?:(?P<referencia>\d+)\s+)?",
        r"(?P<importe>[\d.,]+)",
        r"(?:\s+(?P<saldo>[\d.,]+))?$",
    ))
    .expect("movement regex")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroRecord {
    pub fecha: String,
    pub descripcion: String,
    pub referencia: String,
    pub debitos: String,
    pub creditos: String,
    pub saldo: String,
}

impl BankRecord for MacroRecord {
    fn to_canonical(&self) -> Result<CanonicalTransaction, StatementError> {
        Ok(CanonicalTransaction {
            fecha: self.fecha.clone(),
            detalle: self.descripcion.clone(),
            referencia: self.referencia.clone(),
            debitos: debit_amount(&self.debitos)?,
            creditos: amount(&self.creditos)?,
            saldo: amount(&self.saldo)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MacroParser {
    pub policy: InferencePolicy,
    /// Vertical distance under which two text runs share a line.
    pub line_threshold: f64,
}

impl Default for MacroParser {
    fn default() -> Self {
        Self {
            policy: InferencePolicy::Lenient,
            line_threshold: DEFAULT_LINE_THRESHOLD,
        }
    }
}

impl MacroParser {
    fn lines(&self, input: &StatementInput) -> Vec<String> {
        match input {
            StatementInput::Fragments(fragments) => lines_from_fragments(fragments, self.line_threshold),
            StatementInput::Pages(pages) => page_lines(pages),
            StatementInput::Cells(_) => Vec::new(),
        }
    }

    fn movement(
        &self,
        fecha: &str,
        rest: &str,
        line: &str,
        balance: &mut RunningBalance,
    ) -> Result<Option<MacroRecord>, StatementError> {
        let Some(caps) = MOVEMENT.captures(rest) else {
            warn!(bank = Self::BANK, line, "dated line without an amount");
            return Ok(None);
        };
        let field = |name: &str| caps.name(name).map_or("", |m| m.as_str()).trim().to_string();
        let importe = field("importe");
        let saldo = field("saldo");

        let mut record = MacroRecord {
            fecha: fecha.to_string(),
            descripcion: field("descripcion"),
            referencia: field("referencia"),
            saldo: saldo.clone(),
            ..Default::default()
        };
        let Some(value) = amount(&importe)? else {
            return Ok(Some(record));
        };
        let ctx = EntryContext {
            bank: Self::BANK,
            date: fecha,
            line,
        };
        let movement = match amount(&saldo)? {
            Some(printed) => balance.infer(value, printed, self.policy, ctx)?,
            None => {
                // Amount-only lines are charges.
                let movement = Movement::debit(value.abs());
                balance.post(movement, None, ReconcileMode::Trust, ctx)?;
                movement
            }
        };
        (record.debitos, record.creditos) = side_texts(movement);
        Ok(Some(record))
    }
}

impl StatementParser for MacroParser {
    type Record = MacroRecord;
    const BANK: &'static str = "Macro";

    fn input_kind(&self) -> InputKind {
        InputKind::Fragments
    }

    fn parse_records(&self, input: &StatementInput) -> Result<Vec<Vec<MacroRecord>>, StatementError> {
        if let StatementInput::Cells(_) = input {
            return Err(unsupported(Self::BANK, InputKind::Fragments, input));
        }
        let lines = self.lines(input);
        debug!(bank = Self::BANK, lines = lines.len(), "lines rebuilt");

        let mut records = Vec::new();
        let mut balance = RunningBalance::new();
        let mut in_section = false;
        let mut closed = false;

        for line in &lines {
            if line.to_uppercase().contains(OPENING_MARKER) {
                let Some(caps) = OPENING.captures(line) else {
                    warn!(bank = Self::BANK, line = %line, "unreadable opening balance");
                    continue;
                };
                let saldo = caps[2].to_string();
                if let Some(opening) = amount(&saldo)? {
                    balance.set(opening);
                }
                records.push(MacroRecord {
                    fecha: caps[1].to_string(),
                    descripcion: OPENING_MARKER.to_string(),
                    saldo,
                    ..Default::default()
                });
                in_section = true;
                continue;
            }
            if !in_section {
                continue;
            }
            if let Some(caps) = CLOSING.captures(line) {
                records.push(MacroRecord {
                    fecha: caps[1].to_string(),
                    descripcion: "SALDO FINAL".to_string(),
                    saldo: caps[2].to_string(),
                    ..Default::default()
                });
                closed = true;
                break;
            }
            let Some(caps) = DATED_LINE.captures(line) else {
                continue;
            };
            let rest = caps.get(2).map_or("", |m| m.as_str());
            if let Some(record) = self.movement(&caps[1], rest, line, &mut balance)? {
                records.push(record);
            }
        }

        if !in_section {
            return Err(StatementError::section_not_found(Self::BANK, OPENING_MARKER));
        }
        if !closed {
            warn!(bank = Self::BANK, "no SALDO FINAL AL DIA line");
        }
        Ok(vec![records])
    }
}
