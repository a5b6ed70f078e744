pub mod audio; // Handle/backend seams and file decoding
pub mod board; // Sound specs and the block parser
pub mod error;
pub mod host; // Markdown views, mounts and click routing
#[cfg(feature = "rtrb")]
pub mod output; // Realtime mixer behind a cpal stream
pub mod playback; // Per-sound state machine
pub mod resolve; // Internal links to locators
pub mod store; // Per-board audio state and reconciliation

pub use board::{parse, DocumentId, SoundId, SoundSpec};
pub use error::BoardError;
pub use host::ViewHost;
pub use playback::PlaybackController;
pub use store::AudioStore;
