// src/config/validate.rs

use anyhow::{Context, Result, anyhow};
use globset::Glob;

use crate::config::model::Settings;

/// Run semantic validation against loaded settings.
///
/// This checks:
/// - `input` is non-empty, exists and is a directory
/// - `output` is non-empty
/// - `output` is not nested inside `input` (the walker would otherwise
///   rediscover its own output)
/// - `index_name` compiles as a glob
/// - asset extensions and vendor directory names are non-empty strings
///
/// An unreadable or missing input root is the one fatal startup condition;
/// everything the watcher hits later is handled per file.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_roots(settings)?;
    validate_index_pattern(settings)?;
    validate_lists(settings)?;
    Ok(())
}

fn validate_roots(settings: &Settings) -> Result<()> {
    if settings.input.as_os_str().is_empty() {
        return Err(anyhow!("`input` must not be empty"));
    }
    if settings.output.as_os_str().is_empty() {
        return Err(anyhow!("`output` must not be empty"));
    }

    let meta = std::fs::metadata(&settings.input)
        .with_context(|| format!("input root {:?} is not accessible", settings.input))?;
    if !meta.is_dir() {
        return Err(anyhow!("input root {:?} is not a directory", settings.input));
    }

    if settings.output.starts_with(&settings.input) {
        return Err(anyhow!(
            "output root {:?} must not be inside input root {:?}",
            settings.output,
            settings.input
        ));
    }

    Ok(())
}

fn validate_index_pattern(settings: &Settings) -> Result<()> {
    if settings.index_name.is_empty() {
        return Err(anyhow!("`index_name` must not be empty"));
    }
    Glob::new(&settings.index_name)
        .with_context(|| format!("invalid `index_name` glob: {}", settings.index_name))?;
    Ok(())
}

fn validate_lists(settings: &Settings) -> Result<()> {
    for ext in settings.copy_assets.iter() {
        if ext.trim_start_matches('.').is_empty() {
            return Err(anyhow!("`copy_assets` contains an empty extension"));
        }
    }
    for dir in settings.vendor_dirs.iter() {
        if dir.is_empty() {
            return Err(anyhow!("`vendor_dirs` contains an empty name"));
        }
    }
    Ok(())
}
