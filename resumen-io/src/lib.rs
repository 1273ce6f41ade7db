//! resumen-io: document extraction, table recognition, usage metering and CSV export

pub mod export;
pub mod extract;
pub mod tables;
pub mod usage;

pub use export::write_accounts_csv;
pub use extract::{DocumentStats, PageTextExtractor, PdfTextExtractor, split_pages};
pub use tables::{TableRecognitionClient, TableRecognitionConfig, cells_from_tables};
pub use usage::{JsonlUsageLog, NoopUsage, UsageEvent, UsageRecorder, UsageSummary};
