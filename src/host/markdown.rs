//! Pulls `soundboard` fenced blocks out of a Markdown document.

/// Info string that marks a board block
pub const BOARD_LANGUAGE: &str = "soundboard";

struct Fence {
    marker: char,
    len: usize,
    is_board: bool,
}

/// Opening fence on `line`, if any: three or more backticks or tildes,
/// indented by at most three spaces.
fn opening_fence(line: &str) -> Option<Fence> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }

    let info = rest[len..].trim();
    // Backtick fences cannot carry backticks in their info string.
    if marker == '`' && info.contains('`') {
        return None;
    }
    let language = info.split_whitespace().next().unwrap_or("");
    Some(Fence {
        marker,
        len,
        is_board: language == BOARD_LANGUAGE,
    })
}

fn closes(fence: &Fence, line: &str) -> bool {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return false;
    }
    let rest = line[indent..].trim_end();
    let len = rest.chars().take_while(|c| *c == fence.marker).count();
    len >= fence.len && rest.chars().count() == len
}

/// Bodies of every `soundboard` block, in document order.
///
/// An unclosed block runs to the end of the document.
pub fn board_blocks(markdown: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut open: Option<(Fence, Vec<&str>)> = None;

    for line in markdown.lines() {
        match open.take() {
            None => {
                open = opening_fence(line).map(|fence| (fence, Vec::new()));
            }
            Some((fence, mut body)) => {
                if closes(&fence, line) {
                    if fence.is_board {
                        blocks.push(body.join("\n"));
                    }
                } else {
                    body.push(line);
                    open = Some((fence, body));
                }
            }
        }
    }

    if let Some((fence, body)) = open {
        if fence.is_board {
            blocks.push(body.join("\n"));
        }
    }

    blocks
}
