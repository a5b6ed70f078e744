use thiserror::Error;

use crate::{
    audio::PlaybackError,
    board::{DocumentId, SoundId},
};

/// Non-fatal failures reported by the playback controller.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("no board is loaded for {0}")]
    UnknownBoard(DocumentId),

    #[error("board {document} has no sound {sound}")]
    UnknownSound { document: DocumentId, sound: SoundId },

    /// The audio reference did not resolve when the board was built
    #[error("no audio available for `{name}`")]
    Unresolved { name: String },

    #[error("could not play `{name}`: {source}")]
    Playback {
        name: String,
        #[source]
        source: PlaybackError,
    },
}
