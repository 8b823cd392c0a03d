// src/walk/mod.rs

//! Path classification and input→output mapping for the directory walker.
//!
//! The traversal itself lives in the engine (it registers watches and
//! compiles as it goes); this module owns the pure decisions: is a path an
//! index artifact, a mirrorable asset, or noise, and where it lands in
//! the output tree.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::Settings;

/// How the walker treats a file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Name matches the configured index pattern: a compilation entry point.
    Index,
    /// Extension is on the copy-assets allowlist: mirrored verbatim.
    Asset,
    /// Everything else.
    Ignored,
}

/// Compiled classification rules derived from [`Settings`].
#[derive(Debug, Clone)]
pub struct Classifier {
    index_set: GlobSet,
    asset_exts: HashSet<String>,
    vendor_dirs: HashSet<String>,
}

impl Classifier {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let glob = Glob::new(&settings.index_name)
            .with_context(|| format!("invalid index_name glob: {}", settings.index_name))?;
        builder.add(glob);
        let index_set = builder.build()?;

        let asset_exts = settings
            .copy_assets
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();

        let vendor_dirs = settings.vendor_dirs.iter().cloned().collect();

        Ok(Self {
            index_set,
            asset_exts,
            vendor_dirs,
        })
    }

    /// Classify a file path by name and extension. Directories are not
    /// classified here; the walker stats them first.
    pub fn classify(&self, path: &Path) -> PathClass {
        if let Some(name) = path.file_name().map(OsStr::to_string_lossy) {
            if self.index_set.is_match(name.as_ref()) {
                return PathClass::Index;
            }
        }
        if let Some(ext) = path.extension().map(OsStr::to_string_lossy) {
            if self.asset_exts.contains(&ext.to_lowercase()) {
                return PathClass::Asset;
            }
        }
        PathClass::Ignored
    }

    /// True if any component of `path` names a vendored-module directory.
    ///
    /// Dependencies living under a vendor boundary are reported by the
    /// pipeline like any other, but never watched.
    pub fn is_vendored(&self, path: &Path) -> bool {
        path.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|s| self.vendor_dirs.contains(s))
        })
    }
}

/// Compute the mirrored output path for `path`: substitute the input root
/// prefix with the output root.
///
/// Fails if `path` is not under `input_root`; the walker only ever hands in
/// paths it discovered beneath the root, so a failure here means an event
/// for a foreign path slipped through.
pub fn mirror_path(input_root: &Path, output_root: &Path, path: &Path) -> Result<PathBuf> {
    let rel = path
        .strip_prefix(input_root)
        .map_err(|_| anyhow!("path {:?} is not under input root {:?}", path, input_root))?;
    Ok(output_root.join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        let mut settings = Settings::new("/in", "/out");
        settings.copy_assets = vec!["png".into(), ".SVG".into()];
        Classifier::from_settings(&settings).unwrap()
    }

    #[test]
    fn classifies_by_name_and_extension() {
        let c = classifier();
        assert_eq!(c.classify(Path::new("/in/a/index.css")), PathClass::Index);
        assert_eq!(c.classify(Path::new("/in/a/logo.png")), PathClass::Asset);
        assert_eq!(c.classify(Path::new("/in/a/icon.svg")), PathClass::Asset);
        assert_eq!(c.classify(Path::new("/in/a/_mixins.css")), PathClass::Ignored);
        assert_eq!(c.classify(Path::new("/in/a/notes.txt")), PathClass::Ignored);
    }

    #[test]
    fn index_pattern_can_be_a_glob() {
        let mut settings = Settings::new("/in", "/out");
        settings.index_name = "*.entry.css".into();
        let c = Classifier::from_settings(&settings).unwrap();
        assert_eq!(c.classify(Path::new("/in/main.entry.css")), PathClass::Index);
        assert_eq!(c.classify(Path::new("/in/index.css")), PathClass::Ignored);
    }

    #[test]
    fn vendor_boundary_is_detected_anywhere_in_the_path() {
        let c = classifier();
        assert!(c.is_vendored(Path::new("/in/node_modules/x/index.css")));
        assert!(c.is_vendored(Path::new("/in/a/node_modules/y/util.css")));
        assert!(!c.is_vendored(Path::new("/in/a/b/index.css")));
    }

    #[test]
    fn mirror_path_substitutes_the_prefix() {
        let out = mirror_path(Path::new("/in"), Path::new("/out"), Path::new("/in/a/b/index.css"))
            .unwrap();
        assert_eq!(out, PathBuf::from("/out/a/b/index.css"));

        assert!(mirror_path(Path::new("/in"), Path::new("/out"), Path::new("/elsewhere/x")).is_err());
    }
}
