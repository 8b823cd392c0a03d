// src/config/loader.rs

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::model::Settings;
use crate::config::validate::validate_settings;

/// Load a settings file from a given path and return the raw `Settings`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (input root existence, etc.). Use [`load_and_validate`] for
/// that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading settings file at {:?}", path))?;

    let settings: Settings = toml::from_str(&contents)
        .with_context(|| format!("parsing TOML settings from {:?}", path))?;

    Ok(settings)
}

/// Load a settings file from path and run validation.
///
/// This is the recommended entry point when settings come from disk:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + default functions).
/// - Checks that the input root exists and is a directory, that the output
///   root is non-empty, and that the index-name glob compiles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let settings = load_from_path(&path)?;
    validate_settings(&settings)?;
    Ok(settings)
}
