//! The audio primitive the boards drive.
//!
//! `AudioHandle` is one loaded, controllable clip; `AudioBackend` opens them.
//! Both are used from the UI thread only. Natural end of playback is reported
//! by the backend as a `Completion` the host forwards to the controller.

pub mod decode;

use thiserror::Error;

use crate::resolve::Locator;

pub use decode::{decode_file, DecodeError, SoundData};

/// Backend-unique identity of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u64);

/// A handle reached the end of its clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub handle: HandleId,
    /// The run (see [`AudioHandle::run`]) that finished
    pub run: u32,
}

/// Per-clip playback settings applied when a handle is opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackParams {
    pub looping: bool,
    /// Gain, 0.0-1.0
    pub volume: f32,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            looping: false,
            volume: 1.0,
        }
    }
}

/// A loaded clip.
pub trait AudioHandle {
    fn id(&self) -> HandleId;

    /// Counts successful `start` calls. Lets the controller tell a completion of
    /// the current run from one that was already in flight when it restarted.
    fn run(&self) -> u32;

    /// Begin playback from the current position.
    fn start(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    /// Move the play position back to the first frame.
    fn rewind(&mut self);

    /// Free the underlying resources. The handle is unusable afterwards.
    fn release(&mut self);
}

/// Opens handles for resolved locators.
pub trait AudioBackend {
    fn open(
        &mut self,
        locator: &Locator,
        params: PlaybackParams,
    ) -> Result<Box<dyn AudioHandle>, PlaybackError>;

    /// Completions reported since the last call. Hosts call this regularly,
    /// so backends also finish deferred work (such as loading) here.
    fn drain_completions(&mut self) -> Vec<Completion>;
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("network streaming is not supported: {0}")]
    Remote(Locator),

    #[error("failed to decode clip: {0}")]
    Decode(#[from] DecodeError),

    #[error("audio command queue is full")]
    QueueFull,

    #[error("handle was released")]
    Released,

    #[error("clip is still loading")]
    Loading,

    #[error("clip failed to load: {0}")]
    LoadFailed(String),

    #[error("audio output error: {0}")]
    Device(String),

    #[error("playback rejected: {0}")]
    Rejected(String),
}
