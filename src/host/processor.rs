//! The block processor: board text in, rendered units out.

use crate::{
    board::{parse, DocumentId},
    playback::PlaybackController,
};

use super::mount::{ImagePanel, Mount, SoundUnit};

/// Runs once when the view holding a board goes away.
pub type UnloadHook = Box<dyn FnOnce(&mut PlaybackController)>;

/// Per-render services the host offers a processor.
#[derive(Default)]
pub struct RenderContext {
    unload: Option<UnloadHook>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the hook to run when the view unloads. A later registration
    /// replaces an earlier one.
    pub fn on_view_unload(&mut self, hook: impl FnOnce(&mut PlaybackController) + 'static) {
        self.unload = Some(Box::new(hook));
    }

    pub(crate) fn take_unload(&mut self) -> Option<UnloadHook> {
        self.unload.take()
    }
}

/// Render the board in `source` into `mount`.
pub fn process_block(
    source: &str,
    mount: &mut Mount,
    ctx: &mut RenderContext,
    controller: &mut PlaybackController,
) {
    let document = mount.document().clone();
    let specs = parse(source);
    let board = controller.reconcile(&document, specs);

    mount.clear();
    for state in board.sounds() {
        let spec = state.spec();
        mount.push(SoundUnit {
            sound: state.id(),
            label: spec.name.clone(),
            playing: state.is_playing(),
            image: state.image().map(|src| ImagePanel {
                src: src.clone(),
                alt: spec.name.clone(),
            }),
            error: None,
        });
    }

    ctx.on_view_unload(move |controller| {
        controller.teardown(&document);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{AudioBackend, AudioHandle, Completion, HandleId, PlaybackError, PlaybackParams},
        board::SoundId,
        resolve::{Locator, Resolver},
        store::AudioStore,
    };

    struct Silent(u64);

    impl AudioHandle for Silent {
        fn id(&self) -> HandleId {
            HandleId(self.0)
        }
        fn run(&self) -> u32 {
            0
        }
        fn start(&mut self) -> Result<(), PlaybackError> {
            Ok(())
        }
        fn pause(&mut self) {}
        fn rewind(&mut self) {}
        fn release(&mut self) {}
    }

    #[derive(Default)]
    struct SilentBackend(u64);

    impl AudioBackend for SilentBackend {
        fn open(
            &mut self,
            _locator: &Locator,
            _params: PlaybackParams,
        ) -> Result<Box<dyn AudioHandle>, PlaybackError> {
            self.0 += 1;
            Ok(Box::new(Silent(self.0)))
        }
        fn drain_completions(&mut self) -> Vec<Completion> {
            Vec::new()
        }
    }

    struct Vault;

    impl Resolver for Vault {
        fn resolve_internal_link(&self, path: &str) -> Option<Locator> {
            (path == "art/horn.png").then(|| Locator::new("/vault/art/horn.png"))
        }
    }

    fn controller() -> PlaybackController {
        PlaybackController::new(AudioStore::new(Vault, SilentBackend::default()))
    }

    #[test]
    fn renders_one_unit_per_sound() {
        let mut controller = controller();
        let mut mount = Mount::new(DocumentId::new("session.md"));
        let mut ctx = RenderContext::new();

        process_block(
            "name: Horn url: horn.mp3 image: [[art/horn.png]] name: Rain url: rain.ogg",
            &mut mount,
            &mut ctx,
            &mut controller,
        );

        assert_eq!(mount.units().len(), 2);
        let horn = mount.unit(SoundId(0)).unwrap();
        assert_eq!(horn.label, "Horn");
        assert!(!horn.playing);
        let image = horn.image.as_ref().unwrap();
        assert_eq!(image.src.as_str(), "/vault/art/horn.png");
        assert_eq!(image.alt, "Horn");
        assert!(mount.unit(SoundId(1)).unwrap().image.is_none());
    }

    #[test]
    fn mount_is_cleared_before_each_render() {
        let mut controller = controller();
        let mut mount = Mount::new(DocumentId::new("session.md"));
        let mut ctx = RenderContext::new();

        process_block("name: A url: a.mp3 name: B url: b.mp3", &mut mount, &mut ctx, &mut controller);
        process_block("name: A url: a.mp3", &mut mount, &mut ctx, &mut controller);
        assert_eq!(mount.units().len(), 1);
    }

    #[test]
    fn unload_hook_tears_the_board_down() {
        let mut controller = controller();
        let document = DocumentId::new("session.md");
        let mut mount = Mount::new(document.clone());
        let mut ctx = RenderContext::new();

        process_block("name: A url: a.mp3", &mut mount, &mut ctx, &mut controller);
        assert!(controller.board(&document).is_some());

        let hook = ctx.take_unload().expect("hook registered");
        hook(&mut controller);
        assert!(controller.board(&document).is_none());
    }
}
