/*
View Host
=========

Glue between the documents on screen and the playback controller.

A document may hold several `soundboard` blocks. Each block gets its own view,
identified by `path#index`, with a `Mount` the processor renders units into
and the unload hook the processor registered for it.

    render_document ──▶ render_block (per block) ──▶ process_block ──▶ reconcile
                    └─▶ unload views whose block disappeared

    click ──▶ activate ──▶ transitions ──▶ unit.playing
    pump  ──▶ completions ──▶ transitions ──▶ unit.playing

Errors never leave the host: a failed click is logged and left on the unit
that caused it. Its returned transitions still list the siblings it stopped.
*/

pub mod markdown;
mod mount;
mod processor;

use std::collections::BTreeMap;

pub use markdown::board_blocks;
pub use mount::{ImagePanel, Mount, SoundUnit};
pub use processor::{process_block, RenderContext, UnloadHook};

use crate::{
    board::{DocumentId, SoundId},
    playback::{PlaybackBinding, PlaybackController, Transition},
};

struct View {
    mount: Mount,
    unload: Option<UnloadHook>,
}

/// Applies transitions to the mounted units and keeps them.
struct MountBinding<'a> {
    views: &'a mut BTreeMap<DocumentId, View>,
    applied: Vec<Transition>,
}

impl<'a> MountBinding<'a> {
    fn new(views: &'a mut BTreeMap<DocumentId, View>) -> Self {
        Self {
            views,
            applied: Vec::new(),
        }
    }
}

impl PlaybackBinding for MountBinding<'_> {
    fn playing_changed(&mut self, transition: &Transition) {
        self.applied.push(transition.clone());
        let unit = self
            .views
            .get_mut(&transition.document)
            .and_then(|view| view.mount.unit_mut(transition.sound));
        if let Some(unit) = unit {
            unit.playing = transition.playing;
        }
    }
}

/// Every mounted board of the session and the controller behind them.
pub struct ViewHost {
    controller: PlaybackController,
    views: BTreeMap<DocumentId, View>,
}

impl ViewHost {
    pub fn new(controller: PlaybackController) -> Self {
        Self {
            controller,
            views: BTreeMap::new(),
        }
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn mount(&self, document: &DocumentId) -> Option<&Mount> {
        self.views.get(document).map(|view| &view.mount)
    }

    /// Mounted boards in `path#index` order.
    pub fn mounts(&self) -> impl Iterator<Item = &Mount> {
        self.views.values().map(|view| &view.mount)
    }

    /// Mounted boards of one document, in block order.
    pub fn document_mounts<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Mount> + 'a {
        self.views
            .iter()
            .filter(move |(id, _)| id.path() == path)
            .map(|(_, view)| &view.mount)
    }

    /// Render (or re-render) one block.
    pub fn render_block(&mut self, document: &DocumentId, source: &str) -> &Mount {
        let view = self.views.entry(document.clone()).or_insert_with(|| View {
            mount: Mount::new(document.clone()),
            unload: None,
        });

        let mut ctx = RenderContext::new();
        process_block(source, &mut view.mount, &mut ctx, &mut self.controller);
        if let Some(hook) = ctx.take_unload() {
            view.unload = Some(hook);
        }
        &view.mount
    }

    /// Render every board of a Markdown document. Views of blocks the
    /// document no longer has are unloaded. Returns the rendered boards.
    pub fn render_document(&mut self, path: &str, markdown: &str) -> Vec<DocumentId> {
        let blocks = board_blocks(markdown);
        let rendered: Vec<DocumentId> = blocks
            .iter()
            .enumerate()
            .map(|(index, source)| {
                let document = DocumentId::block(path, index);
                self.render_block(&document, source);
                document
            })
            .collect();

        let path = normalize_path(path);
        let vanished: Vec<DocumentId> = self
            .views
            .keys()
            .filter(|id| id.path() == path && id.block_index() >= rendered.len())
            .cloned()
            .collect();
        for document in vanished {
            self.unload(&document);
        }

        tracing::debug!(%path, boards = rendered.len(), "document rendered");
        rendered
    }

    /// Unload one view, running its hook. Returns false when nothing was mounted.
    pub fn unload(&mut self, document: &DocumentId) -> bool {
        let Some(mut view) = self.views.remove(document) else {
            return false;
        };
        if let Some(hook) = view.unload.take() {
            hook(&mut self.controller);
        }
        true
    }

    /// Unload every view of one document.
    pub fn unload_document(&mut self, path: &str) {
        let path = normalize_path(path);
        let documents: Vec<DocumentId> = self
            .views
            .keys()
            .filter(|id| id.path() == path)
            .cloned()
            .collect();
        for document in documents {
            self.unload(&document);
        }
    }

    pub fn unload_all(&mut self) {
        let views = std::mem::take(&mut self.views);
        for (_, mut view) in views {
            if let Some(hook) = view.unload.take() {
                hook(&mut self.controller);
            }
        }
    }

    /// Forward a click on a unit to the controller. Returns every transition
    /// applied, including siblings stopped before a failed start.
    pub fn click(&mut self, document: &DocumentId, sound: SoundId) -> Vec<Transition> {
        if let Some(unit) = self
            .views
            .get_mut(document)
            .and_then(|view| view.mount.unit_mut(sound))
        {
            unit.error = None;
        }

        let mut binding = MountBinding::new(&mut self.views);
        let result = self.controller.activate(document, sound, &mut binding);
        let applied = binding.applied;

        if let Err(err) = result {
            tracing::warn!(%document, %sound, "{err}");
            if let Some(unit) = self
                .views
                .get_mut(document)
                .and_then(|view| view.mount.unit_mut(sound))
            {
                unit.error = Some(err.to_string());
            }
        }
        applied
    }

    /// Apply whatever playback ended since the last call.
    pub fn pump(&mut self) -> Vec<Transition> {
        let mut binding = MountBinding::new(&mut self.views);
        self.controller.pump(&mut binding)
    }
}

impl Drop for ViewHost {
    fn drop(&mut self) {
        self.unload_all();
    }
}

/// Path as stored in a `DocumentId`.
fn normalize_path(path: &str) -> String {
    DocumentId::new(path).path().to_owned()
}
