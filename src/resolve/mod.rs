//! Reference resolution.
//!
//! Sound and image references come in two shapes: an internal link wrapped in
//! `[[` and `]]` that the hosting collection has to resolve, and a direct
//! locator that is used as written. Resolution failures are not errors here,
//! they yield `None` and the caller renders without the resource.

pub mod vault;

use std::fmt;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::board::DocumentId;

pub use vault::VaultResolver;

const LINK_OPEN: &str = "[[";
const LINK_CLOSE: &str = "]]";

/// A playable or displayable location produced by resolution.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Locators with a network scheme; everything else is a filesystem path.
    pub fn is_remote(&self) -> bool {
        let lower = self.0.to_ascii_lowercase();
        ["http://", "https://", "ftp://"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
    }

    /// Filesystem view of the locator, `None` for remote locators.
    pub fn as_path(&self) -> Option<&Path> {
        if self.is_remote() {
            return None;
        }
        Some(Path::new(self.0.strip_prefix("file://").unwrap_or(&self.0)))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two reference shapes a block may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    /// `[[path]]`, resolved by the host. Holds the bare path.
    Internal(&'a str),
    /// Anything else, handed to [`Resolver::resolve_direct`].
    Direct(&'a str),
}

impl<'a> Reference<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let raw = raw.trim();
        match raw
            .strip_prefix(LINK_OPEN)
            .and_then(|rest| rest.strip_suffix(LINK_CLOSE))
        {
            Some(inner) => Reference::Internal(link_target(inner)),
            None => Reference::Direct(raw),
        }
    }
}

/// `clip.mp3|Alias` and `clip.mp3#part` both target `clip.mp3`.
fn link_target(inner: &str) -> &str {
    let end = inner.find(['|', '#']).unwrap_or(inner.len());
    inner[..end].trim()
}

/// Host capability that turns references into locators.
pub trait Resolver {
    fn resolve_internal_link(&self, path: &str) -> Option<Locator>;

    /// Locator for a direct reference. Passed through unchanged by default.
    fn resolve_direct(&self, location: &str) -> Locator {
        Locator::new(location)
    }
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn resolve_internal_link(&self, path: &str) -> Option<Locator> {
        (**self).resolve_internal_link(path)
    }

    fn resolve_direct(&self, location: &str) -> Locator {
        (**self).resolve_direct(location)
    }
}

impl<R: Resolver + ?Sized> Resolver for Box<R> {
    fn resolve_internal_link(&self, path: &str) -> Option<Locator> {
        (**self).resolve_internal_link(path)
    }

    fn resolve_direct(&self, location: &str) -> Locator {
        (**self).resolve_direct(location)
    }
}

/// Resolve an audio reference.
pub fn resolve_audio(resolver: &dyn Resolver, raw: &str) -> Option<Locator> {
    match Reference::parse(raw) {
        Reference::Internal(path) => {
            let found = resolver.resolve_internal_link(path);
            if found.is_none() {
                tracing::warn!(path, "audio file not found");
            }
            found
        }
        Reference::Direct(location) => Some(resolver.resolve_direct(location)),
    }
}

/// Resolve an image reference. Internal links that miss are retried relative to
/// the folder of the document holding the board.
pub fn resolve_image(resolver: &dyn Resolver, raw: &str, document: &DocumentId) -> Option<Locator> {
    match Reference::parse(raw) {
        Reference::Internal(path) => {
            let found = resolver.resolve_internal_link(path).or_else(|| {
                let folder = document.folder();
                if folder.is_empty() {
                    return None;
                }
                resolver.resolve_internal_link(&format!("{folder}/{path}"))
            });
            if found.is_none() {
                tracing::warn!(path, %document, "image not found");
            }
            found
        }
        Reference::Direct(location) => Some(resolver.resolve_direct(location)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Known(HashSet<&'static str>);

    impl Known {
        fn new(paths: &[&'static str]) -> Self {
            Self(paths.iter().copied().collect())
        }
    }

    impl Resolver for Known {
        fn resolve_internal_link(&self, path: &str) -> Option<Locator> {
            self.0
                .contains(path)
                .then(|| Locator::new(format!("/vault/{path}")))
        }
    }

    #[test]
    fn reference_shapes() {
        assert_eq!(Reference::parse("[[a/b.mp3]]"), Reference::Internal("a/b.mp3"));
        assert_eq!(Reference::parse("  [[a.mp3]] "), Reference::Internal("a.mp3"));
        assert_eq!(Reference::parse("https://x/y.mp3"), Reference::Direct("https://x/y.mp3"));
        assert_eq!(Reference::parse("[[unclosed.mp3"), Reference::Direct("[[unclosed.mp3"));
    }

    #[test]
    fn link_alias_and_heading_are_stripped() {
        assert_eq!(Reference::parse("[[a.mp3|Boom]]"), Reference::Internal("a.mp3"));
        assert_eq!(Reference::parse("[[a.mp3#intro]]"), Reference::Internal("a.mp3"));
    }

    #[test]
    fn direct_audio_passes_through() {
        let resolver = Known::new(&[]);
        assert_eq!(
            resolve_audio(&resolver, "https://cdn/x.mp3"),
            Some(Locator::new("https://cdn/x.mp3"))
        );
    }

    #[test]
    fn internal_audio_uses_resolver() {
        let resolver = Known::new(&["sfx/a.mp3"]);
        assert_eq!(
            resolve_audio(&resolver, "[[sfx/a.mp3]]"),
            Some(Locator::new("/vault/sfx/a.mp3"))
        );
        assert_eq!(resolve_audio(&resolver, "[[sfx/missing.mp3]]"), None);
    }

    #[test]
    fn audio_has_no_folder_fallback() {
        let resolver = Known::new(&["notes/a.mp3"]);
        assert_eq!(resolve_audio(&resolver, "[[a.mp3]]"), None);
    }

    #[test]
    fn image_falls_back_to_document_folder() {
        let resolver = Known::new(&["notes/dnd/storm.png"]);
        let doc = DocumentId::new("notes/dnd/session.md");
        assert_eq!(
            resolve_image(&resolver, "[[storm.png]]", &doc),
            Some(Locator::new("/vault/notes/dnd/storm.png"))
        );
        let root_doc = DocumentId::new("session.md");
        assert_eq!(resolve_image(&resolver, "[[storm.png]]", &root_doc), None);
    }

    #[test]
    fn locator_paths() {
        assert!(Locator::new("https://x/y.mp3").as_path().is_none());
        assert_eq!(
            Locator::new("file:///tmp/a.wav").as_path(),
            Some(Path::new("/tmp/a.wav"))
        );
        assert_eq!(Locator::new("/tmp/a.wav").as_path(), Some(Path::new("/tmp/a.wav")));
    }
}
