use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use resumen_core::{InputKind, Section, StatementInput};
use resumen_ingest::{ParserHandle, list_supported_banks, resolve_parser};
use resumen_io::{
    DocumentStats, JsonlUsageLog, NoopUsage, PageTextExtractor, PdfTextExtractor,
    TableRecognitionClient, UsageEvent, UsageRecorder, split_pages, write_accounts_csv,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

mod config;
mod state;

#[derive(Parser, Debug)]
#[command(
    name = "resumen",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("RESUMEN_BUILD_SHA"), ")"),
    about = "Convert Argentine bank statements into per-account tables"
)]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List supported banks with their status and expected input
    Banks,

    /// Parse statements (.pdf, .txt pages split on form feed, or .json input)
    Parse {
        /// Bank name, e.g. "Nación" or "galicia"
        #[arg(long)]
        bank: String,

        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output directory for CSVs
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print canonical rows as JSON instead of writing CSVs
        #[arg(long)]
        json: bool,
    },

    /// Conversions recorded in the usage log
    Usage {
        #[arg(long)]
        user: Option<String>,
    },

    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.resumen/config.toml with defaults if absent
    Init,
    /// Print the effective configuration
    Show,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Banks => {
            for handle in list_supported_banks() {
                println!("{:<12} {:<13} {}", handle.bank, handle.status, handle.input);
            }
        }

        Command::Parse {
            bank,
            files,
            out,
            json,
        } => {
            // Unknown banks fail before any file is read.
            let handle = resolve_parser(&bank)?;
            parse_files(handle, files, out, json).await?;
        }

        Command::Usage { user } => {
            let log = JsonlUsageLog::new(state::usage_log_path()?);
            let summary = log.summary(user.as_deref())?;
            println!("conversions: {}", summary.conversions);
            println!("pages:       {}", summary.pages);
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg = config::load_config()?;
                println!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },
    }

    Ok(())
}

/// One converted document.
struct Converted {
    file: PathBuf,
    accounts: Vec<Section>,
    stats: DocumentStats,
}

async fn parse_files(handle: ParserHandle, files: Vec<PathBuf>, out: Option<PathBuf>, json: bool) -> Result<()> {
    let cfg = config::load_config()?;
    let usage: Arc<dyn UsageRecorder> = if cfg.output.usage_log {
        Arc::new(JsonlUsageLog::new(state::usage_log_path()?))
    } else {
        Arc::new(NoopUsage)
    };
    let tables = Arc::new(TableRecognitionClient::new(cfg.tables.client_config()));

    let mut set = JoinSet::new();
    for (idx, file) in files.iter().cloned().enumerate() {
        let tables = Arc::clone(&tables);
        set.spawn(async move { (idx, convert(handle, file, &tables).await) });
    }

    let mut results: Vec<Option<Result<Converted>>> = files.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let (idx, result) = joined.context("conversion task panicked")?;
        results[idx] = Some(result);
    }

    let user = cfg.output.user_name();
    let mut failed = 0;
    for (file, result) in files.iter().zip(results) {
        let converted = match result {
            Some(Ok(converted)) => converted,
            Some(Err(err)) => {
                error!(file = %file.display(), "{err:#}");
                failed += 1;
                continue;
            }
            None => continue,
        };

        if json {
            let doc = serde_json::json!({
                "file": converted.file.display().to_string(),
                "bank": handle.bank.name(),
                "accounts": converted.accounts,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        } else {
            let dir = out
                .clone()
                .or_else(|| cfg.output.dir.clone())
                .unwrap_or_else(|| converted.file.parent().map(Path::to_path_buf).unwrap_or_default());
            let stem = converted
                .file
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "resumen".to_string());
            for path in write_accounts_csv(&dir, &stem, &converted.accounts)? {
                println!("{}", path.display());
            }
        }

        let event = UsageEvent::now(&user, handle.bank.name(), converted.stats.pages);
        if let Err(err) = usage.record_conversion(&event) {
            error!("recording usage: {err:#}");
        }
    }

    if failed > 0 {
        bail!("{failed} of {} statements failed", files.len());
    }
    Ok(())
}

async fn convert(handle: ParserHandle, file: PathBuf, tables: &TableRecognitionClient) -> Result<Converted> {
    let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("read {}", file.display()))?;
    let ext = file
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let (input, stats) = match ext.as_str() {
        "json" => {
            let input: StatementInput =
                serde_json::from_slice(&bytes).with_context(|| format!("parse {}", file.display()))?;
            (input, DocumentStats::default())
        }
        "txt" => {
            let text = String::from_utf8(bytes).with_context(|| format!("{} is not UTF-8", file.display()))?;
            let pages = split_pages(&text);
            let stats = DocumentStats::from_pages(&pages);
            (StatementInput::Pages(pages), stats)
        }
        "pdf" => {
            let bytes = Arc::new(bytes);
            let text_bytes = Arc::clone(&bytes);
            let pages = tokio::task::spawn_blocking(move || PdfTextExtractor.extract(&text_bytes)).await??;
            let stats = DocumentStats::from_pages(&pages);
            let input = if handle.input == InputKind::TableCells {
                info!(file = %file.display(), "submitting for table recognition");
                StatementInput::Cells(tables.recognize(bytes.to_vec()).await?)
            } else {
                // Layout-aware banks also read plain page text.
                StatementInput::Pages(pages)
            };
            (input, stats)
        }
        other => bail!("{}: unsupported file type {other:?} (expected pdf, txt or json)", file.display()),
    };

    debug!(file = %file.display(), input = %input.kind(), pages = stats.pages, "statement loaded");
    let accounts = tokio::task::spawn_blocking(move || handle.parse(&input)).await??;
    info!(
        file = %file.display(),
        bank = %handle.bank,
        accounts = accounts.len(),
        rows = accounts.iter().map(Vec::len).sum::<usize>(),
        "statement parsed"
    );
    Ok(Converted { file, accounts, stats })
}
