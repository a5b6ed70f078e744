//! Board grid widget - one bordered panel per board, one cell per sound

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use soundboard::host::{Mount, SoundUnit};

use super::{Cursor, HitArea};

const CELL_WIDTH: u16 = 22;
/// Label, image caption, error, plus borders
const CELL_HEIGHT: u16 = 5;

/// Cells per row and rows needed for `units` cells in `width` columns
fn grid_shape(units: usize, width: u16) -> (u16, u16) {
    let columns = (width / CELL_WIDTH).max(1);
    let rows = (units as u16).div_ceil(columns).max(1);
    (columns, rows)
}

/// Last path segment, enough to tell images apart
fn caption(src: &str) -> &str {
    src.rsplit(['/', '\\']).next().unwrap_or(src)
}

fn render_cell(frame: &mut Frame, area: Rect, unit: &SoundUnit, selected: bool) {
    let mut border = Style::default().fg(Color::DarkGray);
    if unit.playing {
        border = border.fg(Color::Green);
    }
    if selected {
        border = border.add_modifier(Modifier::BOLD).fg(Color::Cyan);
    }

    let (symbol, label_style) = if unit.playing {
        ("▶ ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        ("  ", Style::default().fg(Color::White))
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(symbol, label_style),
        Span::styled(unit.label.clone(), label_style),
    ])];
    lines.push(match &unit.image {
        Some(image) => Line::from(Span::styled(
            format!("  ▣ {}", caption(image.src.as_str())),
            Style::default().fg(Color::Magenta),
        )),
        None => Line::default(),
    });
    if let Some(err) = &unit.error {
        lines.push(Line::from(Span::styled(
            format!("  {err}"),
            Style::default().fg(Color::Red),
        )));
    }

    let block = Block::default().borders(Borders::ALL).border_style(border);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Render every board. Returns the screen area of each drawn cell.
pub fn render_boards(frame: &mut Frame, area: Rect, mounts: &[&Mount], cursor: Cursor) -> Vec<HitArea> {
    let mut hits = Vec::new();
    if mounts.is_empty() {
        let empty = Paragraph::new(" no soundboard blocks")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, area);
        return hits;
    }

    let mut y = area.y;
    let bottom = area.y + area.height;
    for (board_idx, mount) in mounts.iter().enumerate() {
        if y >= bottom {
            break;
        }

        let inner_width = area.width.saturating_sub(2);
        let (columns, rows) = grid_shape(mount.units().len(), inner_width);
        let height = (rows * CELL_HEIGHT + 2).min(bottom - y);
        let board_area = Rect::new(area.x, y, area.width, height);

        let title_style = if board_idx == cursor.board {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block = Block::default()
            .title(Span::styled(format!(" {} ", mount.document()), title_style))
            .borders(Borders::ALL);
        let inner = block.inner(board_area);
        frame.render_widget(block, board_area);

        if mount.is_empty() {
            frame.render_widget(
                Paragraph::new(" no playable sounds").style(Style::default().fg(Color::DarkGray)),
                inner,
            );
        }

        for (unit_idx, unit) in mount.units().iter().enumerate() {
            let col = unit_idx as u16 % columns;
            let row = unit_idx as u16 / columns;
            let cell_y = inner.y + row * CELL_HEIGHT;
            let cell_x = inner.x + col * CELL_WIDTH;
            if cell_y + CELL_HEIGHT > inner.y + inner.height || cell_x >= inner.x + inner.width {
                continue;
            }
            let width = CELL_WIDTH.min(inner.x + inner.width - cell_x);
            let cell = Rect::new(cell_x, cell_y, width, CELL_HEIGHT);

            let selected = board_idx == cursor.board && unit_idx == cursor.unit;
            render_cell(frame, cell, unit, selected);
            hits.push(HitArea {
                area: cell,
                document: mount.document().clone(),
                sound: unit.sound,
            });
        }

        y += height;
    }

    hits
}
