//! Filesystem-backed resolver: internal links are paths relative to a vault root.
//! Relative direct paths are anchored there too, not at the working directory.

use std::path::{Component, Path, PathBuf};

use super::{Locator, Resolver};

/// Resolves `[[path]]` links against files under a root directory.
#[derive(Debug, Clone)]
pub struct VaultResolver {
    root: PathBuf,
}

impl VaultResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Vault-relative path for a file inside the vault, with `/` separators.
    pub fn relative_path(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

impl Resolver for VaultResolver {
    fn resolve_internal_link(&self, path: &str) -> Option<Locator> {
        let relative = Path::new(path);
        // Links never leave the vault.
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || path.is_empty() {
            return None;
        }

        let full = self.root.join(relative);
        if !full.is_file() {
            return None;
        }
        Some(Locator::new(full.to_string_lossy().into_owned()))
    }

    fn resolve_direct(&self, location: &str) -> Locator {
        let locator = Locator::new(location);
        match locator.as_path() {
            Some(path) if path.is_relative() => {
                Locator::new(self.root.join(path).to_string_lossy().into_owned())
            }
            _ => locator,
        }
    }
}
