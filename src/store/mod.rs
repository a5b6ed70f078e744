/*
Audio State Store
=================

Session-wide map from board identity to the live state of that board.

The host re-renders a block every time its document is redrawn, which is far
more often than the block text changes. Rebuilding the board on every render
would cut off whatever is playing, so the store compares the fresh parse with
what it already holds:

    no board yet            build it
    same specs, same order  keep everything, return the same board
    anything differs        tear the old board down, then build

Building resolves each audio reference and opens a handle for it. A sound whose
audio cannot be resolved or opened keeps a `None` handle and still renders.

Teardown silences playing sounds, releases every handle and forgets the board.
It runs when the view holding the board unloads, before every rebuild, and for
all boards when the store itself is dropped.
*/

mod state;

use std::collections::HashMap;

use crate::{
    audio::{AudioBackend, Completion, HandleId, PlaybackParams},
    board::{DocumentId, SoundId, SoundSpec},
    resolve::{resolve_audio, resolve_image, Resolver},
};

pub use state::{BoardState, SoundState};

/// Owns every live board of the session.
pub struct AudioStore {
    resolver: Box<dyn Resolver>,
    backend: Box<dyn AudioBackend>,
    boards: HashMap<DocumentId, BoardState>,
    /// Which sound owns each open handle
    owners: HashMap<HandleId, (DocumentId, SoundId)>,
    next_generation: u64,
}

impl AudioStore {
    pub fn new(resolver: impl Resolver + 'static, backend: impl AudioBackend + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            backend: Box::new(backend),
            boards: HashMap::new(),
            owners: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Bring the board of `document` in line with `specs`.
    ///
    /// Calling this again with structurally equal specs returns the same board
    /// with the same handles.
    pub fn reconcile(&mut self, document: &DocumentId, specs: Vec<SoundSpec>) -> &BoardState {
        let unchanged = self
            .boards
            .get(document)
            .is_some_and(|board| board.matches(&specs));

        if !unchanged {
            if self.teardown(document) {
                tracing::info!(%document, "soundboard changed, rebuilding");
            }
            let board = self.build(document, specs);
            self.boards.insert(document.clone(), board);
        }

        &self.boards[document]
    }

    /// Silence and release everything held for `document`. Returns false if
    /// there was no board.
    pub fn teardown(&mut self, document: &DocumentId) -> bool {
        let Some(mut board) = self.boards.remove(document) else {
            return false;
        };

        for sound in board.sounds_mut() {
            if let Some(id) = sound.handle_id() {
                self.owners.remove(&id);
            }
            if sound.is_playing() {
                sound.stop();
            }
            sound.release();
        }

        tracing::info!(%document, sounds = board.len(), "soundboard torn down");
        true
    }

    pub fn teardown_all(&mut self) {
        let documents: Vec<DocumentId> = self.boards.keys().cloned().collect();
        for document in &documents {
            self.teardown(document);
        }
    }

    pub fn board(&self, document: &DocumentId) -> Option<&BoardState> {
        self.boards.get(document)
    }

    pub(crate) fn board_mut(&mut self, document: &DocumentId) -> Option<&mut BoardState> {
        self.boards.get_mut(document)
    }

    pub fn documents(&self) -> impl Iterator<Item = &DocumentId> {
        self.boards.keys()
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    /// The board and sound owning `handle`, if it is still live.
    pub fn owner_of(&self, handle: HandleId) -> Option<(&DocumentId, SoundId)> {
        self.owners.get(&handle).map(|(doc, sound)| (doc, *sound))
    }

    pub(crate) fn drain_completions(&mut self) -> Vec<Completion> {
        self.backend.drain_completions()
    }

    fn build(&mut self, document: &DocumentId, specs: Vec<SoundSpec>) -> BoardState {
        let generation = self.next_generation;
        self.next_generation += 1;

        let mut sounds = Vec::with_capacity(specs.len());
        for (index, spec) in specs.into_iter().enumerate() {
            let id = SoundId(index);
            let params = PlaybackParams {
                looping: spec.looping,
                volume: spec.volume,
            };

            let handle = resolve_audio(&*self.resolver, &spec.audio_ref).and_then(|locator| {
                tracing::debug!(%document, sound = %spec.name, %locator, "creating audio");
                match self.backend.open(&locator, params) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        tracing::warn!(%document, sound = %spec.name, %locator, "failed to open audio: {e}");
                        None
                    }
                }
            });
            if let Some(handle) = &handle {
                self.owners.insert(handle.id(), (document.clone(), id));
            }

            let image = spec
                .image_ref
                .as_deref()
                .and_then(|raw| resolve_image(&*self.resolver, raw, document));

            sounds.push(SoundState::new(id, spec, handle, image));
        }

        tracing::info!(%document, generation, sounds = sounds.len(), "soundboard built");
        BoardState::new(document.clone(), generation, sounds)
    }
}

impl Drop for AudioStore {
    fn drop(&mut self) {
        self.teardown_all();
    }
}
