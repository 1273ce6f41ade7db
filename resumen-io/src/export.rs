//! CSV export, one file per account section.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use resumen_core::{Decimal, Section, format_amount};

pub const HEADER: [&str; 6] = ["FECHA", "DETALLE", "REFERENCIA", "DEBITOS", "CREDITOS", "SALDO"];

fn cell(value: Option<Decimal>) -> String {
    value.map(format_amount).unwrap_or_default()
}

/// Write `{stem}_{n}.csv` for every account, numbered from 1. Returns the paths written.
pub fn write_accounts_csv(dir: &Path, stem: &str, accounts: &[Section]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut written = Vec::with_capacity(accounts.len());
    for (n, account) in accounts.iter().enumerate() {
        let path = dir.join(format!("{stem}_{}.csv", n + 1));
        let mut wtr = csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))?;
        wtr.write_record(HEADER)?;
        for txn in account {
            wtr.write_record([
                txn.fecha.clone(),
                txn.detalle.clone(),
                txn.referencia.clone(),
                cell(txn.debitos),
                cell(txn.creditos),
                cell(txn.saldo),
            ])?;
        }
        wtr.flush().with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
