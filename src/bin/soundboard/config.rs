//! `soundboard.toml` plus command line overrides.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use serde::Deserialize;

use crate::cli::Cli;

pub const CONFIG_FILE_NAME: &str = "soundboard.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub vault: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub log_filter: String,
    pub watch: bool,
    pub tick_ms: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            vault: None,
            log_file: None,
            log_filter: "info".to_string(),
            watch: true,
            tick_ms: 50,
        }
    }
}

impl FileConfig {
    pub fn from_toml(text: &str) -> EyreResult<Self> {
        toml::from_str(text).wrap_err("invalid soundboard config")
    }
}

/// Everything the app needs, after merging file and flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub document: PathBuf,
    pub vault: PathBuf,
    pub log_file: PathBuf,
    pub log_filter: String,
    pub watch: bool,
    pub tick: Duration,
}

impl Settings {
    pub fn load(cli: &Cli) -> EyreResult<Self> {
        let document = cli
            .document
            .canonicalize()
            .wrap_err_with(|| format!("cannot open {}", cli.document.display()))?;
        let document_dir = document
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        // The vault is needed to find the default config file.
        let search_root = cli.vault.clone().unwrap_or_else(|| document_dir.clone());
        let config_path = cli
            .config
            .clone()
            .or_else(|| Some(search_root.join(CONFIG_FILE_NAME)).filter(|p| p.is_file()));

        let file = match &config_path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .wrap_err_with(|| format!("read config {}", path.display()))?;
                FileConfig::from_toml(&text)
                    .wrap_err_with(|| format!("parse config {}", path.display()))?
            }
            None => FileConfig::default(),
        };

        Self::merge(cli, file, document, document_dir)
    }

    fn merge(cli: &Cli, file: FileConfig, document: PathBuf, document_dir: PathBuf) -> EyreResult<Self> {
        let vault = cli.vault.clone().or(file.vault).unwrap_or(document_dir);
        let vault = vault
            .canonicalize()
            .wrap_err_with(|| format!("vault {} does not exist", vault.display()))?;
        if !document.starts_with(&vault) {
            color_eyre::eyre::bail!(
                "{} is outside the vault {}",
                document.display(),
                vault.display()
            );
        }

        let log_file = cli
            .log_file
            .clone()
            .or(file.log_file)
            .unwrap_or_else(|| std::env::temp_dir().join("soundboard.log"));

        Ok(Self {
            document,
            vault,
            log_file,
            log_filter: file.log_filter,
            watch: file.watch && !cli.no_watch,
            tick: Duration::from_millis(file.tick_ms.max(1)),
        })
    }
}
