use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use resumen_io::TableRecognitionConfig;

use crate::state::ensure_resumen_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tables: TablesSection,
    #[serde(default)]
    pub output: OutputSection,
}

/// Hosted table recognition, used by banks whose parser reads table cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TablesSection {
    pub base_url: String,
    pub api_key: String,
    pub poll_interval_secs: u64,
    pub max_polls: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Where CSVs go when `--out` is not given. Defaults to the input file's directory.
    pub dir: Option<PathBuf>,
    pub usage_log: bool,
    /// Name recorded with each conversion.
    pub user: Option<String>,
}

impl Default for TablesSection {
    fn default() -> Self {
        let defaults = TableRecognitionConfig::default();
        Self {
            base_url: defaults.base_url,
            api_key: defaults.api_key,
            poll_interval_secs: defaults.poll_interval.as_secs(),
            max_polls: defaults.max_polls,
        }
    }
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: None,
            usage_log: true,
            user: None,
        }
    }
}

impl TablesSection {
    pub fn client_config(&self) -> TableRecognitionConfig {
        TableRecognitionConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_polls: self.max_polls,
        }
    }
}

impl OutputSection {
    pub fn user_name(&self) -> String {
        self.user
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_resumen_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[tables]
api_key = "secret"

[output]
usage_log = false
"#,
        )
        .unwrap();
        assert_eq!(cfg.tables.api_key, "secret");
        assert_eq!(cfg.tables.max_polls, 300);
        assert_eq!(cfg.tables.client_config().poll_interval, Duration::from_secs(2));
        assert!(!cfg.output.usage_log);
        assert_eq!(cfg.output.dir, None);
    }

    #[test]
    fn test_default_config_round_trips() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, Config::default());
    }
}
