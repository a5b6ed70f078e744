//! TUI module for soundboard
//!
//! Draws every board of the document as a grid of sound cells.

mod boards;
mod status;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

use soundboard::{host::Mount, DocumentId, SoundId};

pub use status::Status;

use boards::render_boards;
use status::{render_header, render_status};

/// Selected board and unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub board: usize,
    pub unit: usize,
}

/// Screen area of one sound cell, for mouse clicks
#[derive(Debug, Clone, PartialEq)]
pub struct HitArea {
    pub area: Rect,
    pub document: DocumentId,
    pub sound: SoundId,
}

impl HitArea {
    pub fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.area.x
            && column < self.area.x + self.area.width
            && row >= self.area.y
            && row < self.area.y + self.area.height
    }
}

/// Render the UI. Returns the clickable cells.
pub fn render(
    frame: &mut Frame,
    doc_path: &str,
    mounts: &[&Mount],
    cursor: Cursor,
    status: &Status,
) -> Vec<HitArea> {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Boards
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Help bar
        ])
        .split(area);

    render_header(frame, chunks[0], doc_path, mounts);
    let hits = render_boards(frame, chunks[1], mounts, cursor);
    render_status(frame, chunks[2], status);

    let help = Paragraph::new(
        " [Q] Quit  [Enter/Space/Click] Play/Stop  [←→] Sound  [↑↓/Tab] Board  [R] Reload",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[3]);

    hits
}
