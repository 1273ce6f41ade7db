//! resumen-core: amounts, input shapes and reconciliation shared by every bank parser

pub mod amount;
pub mod canonical;
pub mod columns;
pub mod error;
pub mod input;
pub mod reconcile;
pub mod segment;

pub use amount::{
    format_amount, format_amount_with, parse_amount, parse_amount_with, parse_optional_amount,
    parse_optional_amount_with, NumberStyle, SignPlacement,
};
pub use canonical::{
    check_continuity, join_lines, split_detail, split_wide_gaps, BankRecord, CanonicalTransaction,
    Section,
};
pub use columns::{Anchor, ColumnLayout, ColumnSpec, Edge};
pub use error::{AmountFormatError, Mismatch, StatementError};
pub use input::{InputKind, StatementInput, TableCell, TextFragment};
pub use reconcile::{
    classify, within_tolerance, EntryContext, InferencePolicy, Movement, ReconcileMode,
    RunningBalance, Side, TOLERANCE,
};
pub use segment::{
    group_table_rows, is_separator_line, lines_from_fragments, page_lines, raw_page_lines,
    TableRow, DEFAULT_LINE_THRESHOLD,
};

pub use rust_decimal::Decimal;
