//! soundboard - play the boards of a Markdown note from the terminal
//!
//! Run with: cargo run -- notes/session.md --vault notes

mod app;
mod cli;
mod config;
mod ui;

use std::{
    io::{self, Write},
    path::Path,
    sync::{Arc, Mutex},
};

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
};
use tracing_subscriber::EnvFilter;

use app::App;
use cli::Cli;
use config::Settings;

fn main() -> EyreResult<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;
    init_tracing_to_file(&settings.log_file, &settings.log_filter)?;
    tracing::info!(document = %settings.document.display(), vault = %settings.vault.display(), "starting");

    let mut app = App::new(&settings)?;

    let mut terminal = ratatui::init();
    execute!(io::stdout(), EnableMouseCapture)?;
    let result = app.run(&mut terminal);
    let _ = execute!(io::stdout(), DisableMouseCapture);
    ratatui::restore();

    app.shutdown();
    result
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_tracing_to_file(log_path: &Path, default_filter: &str) -> EyreResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .wrap_err_with(|| format!("open log file {}", log_path.display()))?;
    let writer = Arc::new(Mutex::new(file));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(move || FileLogWriter::new(Arc::clone(&writer)))
        .try_init();
    Ok(())
}

struct FileLogWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl FileLogWriter {
    fn new(file: Arc<Mutex<std::fs::File>>) -> Self {
        Self { file }
    }
}

impl Write for FileLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.flush()
    }
}
