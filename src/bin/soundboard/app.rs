//! Application state and event loop

use std::{
    fs,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver},
    time::Duration,
};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::{DefaultTerminal, Frame};

use soundboard::{
    audio::{AudioBackend, AudioHandle, Completion, PlaybackError, PlaybackParams},
    output::CpalBackend,
    resolve::{Locator, VaultResolver},
    AudioStore, DocumentId, PlaybackController, SoundId, ViewHost,
};

use crate::{
    config::Settings,
    ui::{self, Cursor, HitArea, Status},
};

/// Stands in for the output device when none could be opened. Boards still
/// render; every sound reports the device error when clicked.
struct NoOutput {
    reason: String,
}

impl AudioBackend for NoOutput {
    fn open(
        &mut self,
        _locator: &Locator,
        _params: PlaybackParams,
    ) -> Result<Box<dyn AudioHandle>, PlaybackError> {
        Err(PlaybackError::Device(self.reason.clone()))
    }

    fn drain_completions(&mut self) -> Vec<Completion> {
        Vec::new()
    }
}

type FsEvents = Receiver<notify::Result<notify::Event>>;

pub struct App {
    host: ViewHost,
    /// Absolute path of the document on disk
    document: PathBuf,
    /// Vault-relative path, as used in board ids
    doc_path: String,
    cursor: Cursor,
    hits: Vec<HitArea>,
    status: Status,
    tick: Duration,
    fs_events: Option<FsEvents>,
    // Dropping the watcher stops the events.
    _watcher: Option<RecommendedWatcher>,
    should_quit: bool,
}

impl App {
    pub fn new(settings: &Settings) -> EyreResult<Self> {
        let resolver = VaultResolver::new(&settings.vault);
        let doc_path = resolver
            .relative_path(&settings.document)
            .unwrap_or_else(|| settings.document.to_string_lossy().into_owned());

        let mut status = Status::info("q quits");
        let store = match CpalBackend::open_default() {
            Ok(backend) => AudioStore::new(resolver, backend),
            Err(err) => {
                tracing::error!("audio output unavailable: {err}");
                status = Status::warn(format!("audio output unavailable: {err}"));
                AudioStore::new(
                    resolver,
                    NoOutput {
                        reason: err.to_string(),
                    },
                )
            }
        };

        let (watcher, fs_events) = if settings.watch {
            match watch(&settings.document) {
                Ok((watcher, rx)) => (Some(watcher), Some(rx)),
                Err(err) => {
                    tracing::warn!("file watcher unavailable: {err}");
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        let mut app = Self {
            host: ViewHost::new(PlaybackController::new(store)),
            document: settings.document.clone(),
            doc_path,
            cursor: Cursor::default(),
            hits: Vec::new(),
            status,
            tick: settings.tick,
            fs_events,
            _watcher: watcher,
            should_quit: false,
        };

        let text = fs::read_to_string(&app.document)
            .wrap_err_with(|| format!("read {}", app.document.display()))?;
        let rendered = app.host.render_document(&app.doc_path, &text);
        if rendered.is_empty() {
            app.status = Status::warn("no soundboard blocks in this document");
        }
        Ok(app)
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.pump();
            self.poll_fs_events();

            terminal.draw(|frame| self.render(frame))?;

            if event::poll(self.tick)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key.code),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }

        Ok(())
    }

    /// Stop everything and release every handle.
    pub fn shutdown(&mut self) {
        self.host.unload_all();
        tracing::info!("all boards unloaded");
    }

    fn boards(&self) -> Vec<DocumentId> {
        self.host
            .document_mounts(&self.doc_path)
            .map(|mount| mount.document().clone())
            .collect()
    }

    fn units_in(&self, board: usize) -> usize {
        self.host
            .document_mounts(&self.doc_path)
            .nth(board)
            .map_or(0, |mount| mount.units().len())
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.cursor.unit = self.cursor.unit.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                let units = self.units_in(self.cursor.board);
                if self.cursor.unit + 1 < units {
                    self.cursor.unit += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') | KeyCode::BackTab => self.move_board(-1),
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => self.move_board(1),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(board) = self.boards().get(self.cursor.board).cloned() {
                    self.click(&board, SoundId(self.cursor.unit));
                }
            }
            KeyCode::Char('r') | KeyCode::Char('R') => self.reload(),
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let hit = self
            .hits
            .iter()
            .find(|hit| hit.contains(mouse.column, mouse.row))
            .cloned();
        if let Some(hit) = hit {
            if let Some(board) = self.boards().iter().position(|id| *id == hit.document) {
                self.cursor = Cursor {
                    board,
                    unit: hit.sound.index(),
                };
            }
            self.click(&hit.document, hit.sound);
        }
    }

    fn move_board(&mut self, step: isize) {
        let count = self.boards().len();
        if count == 0 {
            return;
        }
        let board = (self.cursor.board as isize + step).rem_euclid(count as isize) as usize;
        self.cursor = Cursor { board, unit: 0 };
    }

    fn click(&mut self, document: &DocumentId, sound: SoundId) {
        let transitions = self.host.click(document, sound);
        let Some(unit) = self.host.mount(document).and_then(|m| m.unit(sound)) else {
            return;
        };

        self.status = if let Some(err) = &unit.error {
            Status::warn(err.clone())
        } else if transitions.iter().any(|t| t.sound == sound && t.playing) {
            Status::info(format!("playing {}", unit.label))
        } else {
            Status::info(format!("stopped {}", unit.label))
        };
    }

    fn pump(&mut self) {
        for transition in self.host.pump() {
            let label = self
                .host
                .mount(&transition.document)
                .and_then(|m| m.unit(transition.sound))
                .map(|u| u.label.clone());
            if let Some(label) = label {
                self.status = Status::info(format!("finished {label}"));
            }
        }
    }

    fn poll_fs_events(&mut self) {
        let Some(rx) = &self.fs_events else {
            return;
        };
        let file_name = self.document.file_name();

        let mut changed = false;
        while let Ok(result) = rx.try_recv() {
            match result {
                Ok(event) => {
                    let relevant = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                        && event.paths.iter().any(|p| p.file_name() == file_name);
                    changed |= relevant;
                }
                Err(err) => tracing::warn!("file watcher error: {err}"),
            }
        }

        if changed {
            self.reload();
        }
    }

    /// Re-read the document and re-render its boards. Boards whose text did
    /// not change keep playing.
    fn reload(&mut self) {
        let text = match fs::read_to_string(&self.document) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(document = %self.document.display(), "reload failed: {err}");
                self.status = Status::warn(format!("reload failed: {err}"));
                return;
            }
        };

        let rendered = self.host.render_document(&self.doc_path, &text);
        self.status = Status::info(format!("reloaded, {} board(s)", rendered.len()));
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        let boards = self.boards().len();
        if boards == 0 {
            self.cursor = Cursor::default();
            return;
        }
        self.cursor.board = self.cursor.board.min(boards - 1);
        let units = self.units_in(self.cursor.board);
        self.cursor.unit = self.cursor.unit.min(units.saturating_sub(1));
    }

    fn render(&mut self, frame: &mut Frame) {
        let mounts: Vec<_> = self.host.document_mounts(&self.doc_path).collect();
        let hits = ui::render(frame, &self.doc_path, &mounts, self.cursor, &self.status);
        self.hits = hits;
    }
}

/// Watch the folder holding `document`. Editors often save by replacing the
/// file, which a watch on the file itself would miss.
fn watch(document: &Path) -> notify::Result<(RecommendedWatcher, FsEvents)> {
    let (tx, rx) = mpsc::channel::<notify::Result<notify::Event>>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let _ = tx.send(res);
    })?;
    let folder = document.parent().unwrap_or(document);
    watcher.watch(folder, RecursiveMode::NonRecursive)?;
    Ok((watcher, rx))
}
