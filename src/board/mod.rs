/*
Boards
======

A board is the soundboard rendered from one `soundboard` block in one
document. The block text lists sounds; each sound becomes a clickable unit.

    ```soundboard
    name: Thunder   url: [[sfx/thunder.mp3]]  image: [[img/storm.png]]
    name: Rain      url: [[sfx/rain.ogg]]     loop: true  volume: 40%
    ```

Vocabulary
----------

  entry         One sound definition in the block text, starting at `name:`.

  sound spec    The parsed, defaulted form of an entry. Immutable; compared
                structurally to detect edits to the block.

  document id   Identity of the board: the document path plus the index of
                the block inside that document.

  sound id      Position of a sound within its board. Stable for the life of
                the board, so two sounds sharing a name stay distinct.
*/

pub mod parse;

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use parse::{parse, parse_with_report, ParseReport, SkipReason, SkippedEntry};

/// One parsed sound definition.
///
/// Equality is field-wise over name, references, loop flag and volume. Two
/// parses of the same text compare equal, which is what the store relies on
/// to leave an unchanged board alone.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SoundSpec {
    /// Display label
    pub name: String,
    /// Raw audio reference, either `[[internal/link]]` or a direct locator
    pub audio_ref: String,
    /// Raw image reference, same two shapes
    pub image_ref: Option<String>,
    /// Repeat until stopped by hand
    pub looping: bool,
    /// Playback gain (0.0-1.0)
    pub volume: f32,
}

impl SoundSpec {
    pub fn new(name: impl Into<String>, audio_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            audio_ref: audio_ref.into(),
            image_ref: None,
            looping: false,
            volume: 1.0,
        }
    }

    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }
}

/// Identity of one board: a document path and the block index inside it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId {
    path: String,
    block: usize,
}

impl DocumentId {
    /// The first (or only) board of a document
    pub fn new(path: impl Into<String>) -> Self {
        Self::block(path, 0)
    }

    pub fn block(path: impl Into<String>, block: usize) -> Self {
        Self {
            path: path.into().replace('\\', "/"),
            block,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn block_index(&self) -> usize {
        self.block
    }

    /// Folder containing the document, `""` for a document at the root.
    pub fn folder(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.path, self.block)
    }
}

/// Index of a sound within its board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(pub usize);

impl SoundId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
