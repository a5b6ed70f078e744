//! Realtime audio output: a voice mixer behind a cpal stream.
//!
//! ```ignore
//! use soundboard::output::CpalBackend;
//!
//! let backend = CpalBackend::open_default()?;
//! let store = AudioStore::new(VaultResolver::new("notes"), backend);
//! ```

mod device;
mod link;
mod mixer;

pub use device::CpalBackend;
pub use link::{MixerLink, VoiceHandle};
pub use mixer::{Mixer, MixerCommand, MixerEvent};

/// Voices the mixer holds at once. `MixerLink::open` refuses clips past it.
pub const MAX_VOICES: usize = 64;

/// Capacity of the UI → audio command ring
pub const COMMAND_QUEUE_LEN: usize = 256;

/// Capacity of the audio → UI event ring
pub const EVENT_QUEUE_LEN: usize = 256;
