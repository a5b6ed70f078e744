/*
Playback Controller
===================

Each sound is either Idle or Playing. A click on a sound:

    1. stops every other playing sound on the same board
    2. stops the clicked sound if it was playing
       otherwise rewinds it and starts it from the beginning

so a board never has more than one sound playing and clicking a playing sound
silences the board.

    Idle ──click──▶ Playing ──click──▶ Idle
                       │
                       └──clip ends (not looping)──▶ Idle

A looping clip never ends on its own; only a click or a teardown stops it.

Stopping always means pause + rewind. Completions arrive from the backend
some time after the fact, so a completion is ignored when its sound has been
torn down, stopped, switched to looping, or restarted since (the completion
carries the run it belongs to).

Failures stay local. A sound without audio, or one whose handle refuses to
start, reports an error and stays Idle; the siblings stopped in step 1 stay
stopped.
*/

mod binding;

pub use binding::{PlaybackBinding, Transition, Unbound};

use crate::{
    audio::Completion,
    board::{DocumentId, SoundId, SoundSpec},
    error::BoardError,
    store::{AudioStore, BoardState},
};

/// Drives the per-sound state machines of every board in a store.
pub struct PlaybackController {
    store: AudioStore,
}

impl PlaybackController {
    pub fn new(store: AudioStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &AudioStore {
        &self.store
    }

    pub fn board(&self, document: &DocumentId) -> Option<&BoardState> {
        self.store.board(document)
    }

    /// See [`AudioStore::reconcile`].
    pub fn reconcile(&mut self, document: &DocumentId, specs: Vec<SoundSpec>) -> &BoardState {
        self.store.reconcile(document, specs)
    }

    /// See [`AudioStore::teardown`].
    pub fn teardown(&mut self, document: &DocumentId) -> bool {
        self.store.teardown(document)
    }

    pub fn teardown_all(&mut self) {
        self.store.teardown_all();
    }

    /// Handle a click on `sound`. Returns the transitions it caused, which have
    /// already been reported to `binding`.
    pub fn activate(
        &mut self,
        document: &DocumentId,
        sound: SoundId,
        binding: &mut dyn PlaybackBinding,
    ) -> Result<Vec<Transition>, BoardError> {
        let board = self
            .store
            .board_mut(document)
            .ok_or_else(|| BoardError::UnknownBoard(document.clone()))?;
        if sound.index() >= board.len() {
            return Err(BoardError::UnknownSound {
                document: document.clone(),
                sound,
            });
        }

        let mut transitions = Vec::new();
        let mut report = |transition: Transition| {
            binding.playing_changed(&transition);
            transitions.push(transition);
        };

        for sibling in board.sounds_mut() {
            if sibling.id() != sound && sibling.is_playing() {
                sibling.stop();
                report(Transition::new(document, sibling.id(), false));
            }
        }

        let target = &mut board.sounds_mut()[sound.index()];
        if target.is_playing() {
            target.stop();
            report(Transition::new(document, sound, false));
            return Ok(transitions);
        }

        let name = target.spec().name.clone();
        let Some(handle) = target.handle_mut() else {
            tracing::warn!(%document, sound = %name, "no audio object available for this sound");
            return Err(BoardError::Unresolved { name });
        };

        handle.rewind();
        if let Err(source) = handle.start() {
            tracing::warn!(%document, sound = %name, "error playing sound: {source}");
            return Err(BoardError::Playback { name, source });
        }

        target.set_playing(true);
        report(Transition::new(document, sound, true));
        Ok(transitions)
    }

    /// Apply a natural end of playback.
    pub fn complete(
        &mut self,
        completion: Completion,
        binding: &mut dyn PlaybackBinding,
    ) -> Option<Transition> {
        let Some((document, sound)) = self
            .store
            .owner_of(completion.handle)
            .map(|(doc, sound)| (doc.clone(), sound))
        else {
            tracing::debug!(handle = completion.handle.0, "completion for a released handle");
            return None;
        };

        let state = self.store.board_mut(&document)?.sound_mut(sound)?;
        let current_run = state.handle().map(|h| h.run());
        if !state.is_playing() || state.spec().looping || current_run != Some(completion.run) {
            tracing::debug!(%document, %sound, "ignoring stale completion");
            return None;
        }

        state.set_playing(false);
        let transition = Transition::new(&document, sound, false);
        binding.playing_changed(&transition);
        Some(transition)
    }

    /// Drain the backend's completions and apply them.
    pub fn pump(&mut self, binding: &mut dyn PlaybackBinding) -> Vec<Transition> {
        let completions = self.store.drain_completions();
        completions
            .into_iter()
            .filter_map(|completion| self.complete(completion, binding))
            .collect()
    }
}
