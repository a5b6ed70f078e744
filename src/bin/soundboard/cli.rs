use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser, Clone)]
#[command(name = "soundboard")]
#[command(about = "Play the soundboards of a Markdown note from the terminal")]
pub struct Cli {
    /// Markdown document holding one or more `soundboard` blocks.
    pub document: PathBuf,

    /// Vault root that `[[links]]` resolve against. Defaults to the document's folder.
    #[arg(long)]
    pub vault: Option<PathBuf>,

    /// Config file. Defaults to `soundboard.toml` in the vault root.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the log file path.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Do not reload the document when it changes on disk.
    #[arg(long)]
    pub no_watch: bool,
}
