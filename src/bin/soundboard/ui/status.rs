//! Header bar and status line

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use soundboard::host::Mount;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
}

/// Last diagnostic shown under the boards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub level: Level,
    pub message: String,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            level: Level::Warn,
            message: message.into(),
        }
    }
}

/// Document name, board count and what is playing
pub fn render_header(frame: &mut Frame, area: Rect, doc_path: &str, mounts: &[&Mount]) {
    let block = Block::default().title(" soundboard ").borders(Borders::ALL);

    let sounds: usize = mounts.iter().map(|m| m.units().len()).sum();
    let playing: Vec<&str> = mounts
        .iter()
        .flat_map(|m| m.units())
        .filter(|u| u.playing)
        .map(|u| u.label.as_str())
        .collect();

    let (play_symbol, play_color) = if playing.is_empty() {
        ("⏸", Color::Yellow)
    } else {
        ("▶", Color::Green)
    };

    let line = Line::from(vec![
        Span::styled(format!(" {doc_path}  "), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("{} board(s), {} sound(s)  ", mounts.len(), sounds),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("{play_symbol} {}", playing.join(", ")),
            Style::default().fg(play_color),
        ),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}

pub fn render_status(frame: &mut Frame, area: Rect, status: &Status) {
    let color = match status.level {
        Level::Info => Color::White,
        Level::Warn => Color::Red,
    };
    let line = Line::from(Span::styled(
        format!(" {}", status.message),
        Style::default().fg(color),
    ));
    frame.render_widget(Paragraph::new(line), area);
}
