//! What a rendered board looks like to the host.

use crate::{board::{DocumentId, SoundId}, resolve::Locator};

/// Image shown above a sound's button.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePanel {
    pub src: Locator,
    pub alt: String,
}

/// One clickable sound.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundUnit {
    pub sound: SoundId,
    pub label: String,
    pub playing: bool,
    pub image: Option<ImagePanel>,
    /// Last failure reported for this sound, shown until the next click
    pub error: Option<String>,
}

/// The container a board is rendered into.
#[derive(Debug, Clone, PartialEq)]
pub struct Mount {
    document: DocumentId,
    units: Vec<SoundUnit>,
}

impl Mount {
    pub fn new(document: DocumentId) -> Self {
        Self {
            document,
            units: Vec::new(),
        }
    }

    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    pub fn units(&self) -> &[SoundUnit] {
        &self.units
    }

    pub fn unit(&self, sound: SoundId) -> Option<&SoundUnit> {
        self.units.iter().find(|u| u.sound == sound)
    }

    pub fn unit_mut(&mut self, sound: SoundId) -> Option<&mut SoundUnit> {
        self.units.iter_mut().find(|u| u.sound == sound)
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.units.clear();
    }

    pub(crate) fn push(&mut self, unit: SoundUnit) {
        self.units.push(unit);
    }
}
