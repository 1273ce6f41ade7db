//! resumen-ingest: per-bank statement parsers and the bank registry.
//!
//! ```text
//! let sections = resumen_ingest::parse_statement("Nación", &StatementInput::pages(pages))?;
//! ```

pub mod parsers;
pub mod registry;

pub use parsers::{DEFAULT_CONTINUATION_CAP, StatementParser};
pub use registry::{
    Bank, ParserHandle, SupportStatus, list_supported_banks, parse_statement, resolve_parser,
};
