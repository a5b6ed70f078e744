//! Notification of playback state changes to whatever displays them.

use crate::board::{DocumentId, SoundId};

/// A sound switched between idle and playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub document: DocumentId,
    pub sound: SoundId,
    pub playing: bool,
}

impl Transition {
    pub(crate) fn new(document: &DocumentId, sound: SoundId, playing: bool) -> Self {
        Self {
            document: document.clone(),
            sound,
            playing,
        }
    }
}

/// Receives every transition right after the state has been updated.
pub trait PlaybackBinding {
    fn playing_changed(&mut self, transition: &Transition);
}

/// Binding that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unbound;

impl PlaybackBinding for Unbound {
    fn playing_changed(&mut self, _transition: &Transition) {}
}

/// Collects transitions, in order.
impl PlaybackBinding for Vec<Transition> {
    fn playing_changed(&mut self, transition: &Transition) {
        self.push(transition.clone());
    }
}
