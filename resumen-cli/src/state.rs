use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$RESUMEN_HOME`, or `~/.resumen`.
pub fn resumen_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("RESUMEN_HOME") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".resumen"))
}

pub fn ensure_resumen_home() -> Result<PathBuf> {
    let dir = resumen_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn usage_log_path() -> Result<PathBuf> {
    Ok(resumen_home()?.join("usage.jsonl"))
}
