//! Runtime state of boards and their sounds.

use std::fmt;

use crate::{
    audio::{AudioHandle, HandleId},
    board::{DocumentId, SoundId, SoundSpec},
    resolve::Locator,
};

/// One sound of a live board. Owns its audio handle exclusively.
pub struct SoundState {
    id: SoundId,
    spec: SoundSpec,
    playing: bool,
    handle: Option<Box<dyn AudioHandle>>,
    image: Option<Locator>,
}

impl SoundState {
    pub(crate) fn new(
        id: SoundId,
        spec: SoundSpec,
        handle: Option<Box<dyn AudioHandle>>,
        image: Option<Locator>,
    ) -> Self {
        Self {
            id,
            spec,
            playing: false,
            handle,
            image,
        }
    }

    pub fn id(&self) -> SoundId {
        self.id
    }

    pub fn spec(&self) -> &SoundSpec {
        &self.spec
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// False when the audio reference failed to resolve or open
    pub fn has_audio(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<&dyn AudioHandle> {
        self.handle.as_deref()
    }

    pub fn handle_id(&self) -> Option<HandleId> {
        self.handle.as_ref().map(|h| h.id())
    }

    /// Resolved image, if the spec had one and it resolved
    pub fn image(&self) -> Option<&Locator> {
        self.image.as_ref()
    }

    pub(crate) fn handle_mut(&mut self) -> Option<&mut (dyn AudioHandle + 'static)> {
        self.handle.as_deref_mut()
    }

    pub(crate) fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Pause and rewind to the start, then mark idle.
    pub(crate) fn stop(&mut self) {
        if let Some(handle) = self.handle.as_deref_mut() {
            handle.pause();
            handle.rewind();
        }
        self.playing = false;
    }

    /// Release and drop the handle.
    pub(crate) fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
        }
    }
}

impl fmt::Debug for SoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundState")
            .field("id", &self.id)
            .field("spec", &self.spec)
            .field("playing", &self.playing)
            .field("handle", &self.handle_id())
            .field("image", &self.image)
            .finish()
    }
}

/// The ordered sounds of one board.
///
/// At most one sound is playing at any time.
#[derive(Debug)]
pub struct BoardState {
    document: DocumentId,
    generation: u64,
    sounds: Vec<SoundState>,
}

impl BoardState {
    pub(crate) fn new(document: DocumentId, generation: u64, sounds: Vec<SoundState>) -> Self {
        Self {
            document,
            generation,
            sounds,
        }
    }

    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    /// Changes every time the board is rebuilt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn sounds(&self) -> &[SoundState] {
        &self.sounds
    }

    pub fn sound(&self, id: SoundId) -> Option<&SoundState> {
        self.sounds.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    /// The sound currently playing, if any
    pub fn playing(&self) -> Option<SoundId> {
        self.sounds.iter().find(|s| s.is_playing()).map(|s| s.id)
    }

    /// Structural comparison of this board's specs against a fresh parse.
    pub fn matches(&self, specs: &[SoundSpec]) -> bool {
        self.sounds.len() == specs.len()
            && self.sounds.iter().zip(specs).all(|(s, spec)| &s.spec == spec)
    }

    pub(crate) fn sound_mut(&mut self, id: SoundId) -> Option<&mut SoundState> {
        self.sounds.get_mut(id.index())
    }

    pub(crate) fn sounds_mut(&mut self) -> &mut [SoundState] {
        &mut self.sounds
    }
}
