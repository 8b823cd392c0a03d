// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level settings, deserializable from a TOML file.
///
/// ```toml
/// input = "styles"
/// output = "public/css"
/// index_name = "index.css"
/// copy_assets = ["png", "svg"]
/// watch = true
/// ```
///
/// Everything except `input` and `output` has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root input directory. Must exist and be readable.
    pub input: PathBuf,

    /// Root output directory. Created on demand; mirrors the input tree.
    pub output: PathBuf,

    /// Glob matched against a file's *name* (not its full path) to decide
    /// whether it is a compilable index artifact.
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// File extensions mirrored verbatim into the output tree.
    ///
    /// Compared case-insensitively; a leading dot is accepted and stripped.
    #[serde(default)]
    pub copy_assets: Vec<String>,

    /// Directory names treated as vendored-module boundaries.
    ///
    /// Dependencies reported from under one of these are never watched.
    #[serde(default = "default_vendor_dirs")]
    pub vendor_dirs: Vec<String>,

    /// Live filesystem watching vs a one-shot build.
    #[serde(default = "default_watch")]
    pub watch: bool,

    /// Enable diagnostic output. Off by default: the watcher is silent
    /// except for fatal startup failures.
    #[serde(default)]
    pub verbose: bool,
}

fn default_index_name() -> String {
    "index.css".to_string()
}

fn default_vendor_dirs() -> Vec<String> {
    vec!["node_modules".to_string()]
}

fn default_watch() -> bool {
    true
}

impl Settings {
    /// Minimal constructor for the common case; field defaults match the
    /// serde defaults used when loading from TOML.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            index_name: default_index_name(),
            copy_assets: Vec::new(),
            vendor_dirs: default_vendor_dirs(),
            watch: default_watch(),
            verbose: false,
        }
    }
}
