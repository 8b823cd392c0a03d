// src/assets.rs

//! The asset mirror: verbatim copies of allow-listed files into the output
//! tree. Each mirrored asset carries its own independent watch (owned by
//! the engine); this module only performs the copy itself.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Copy `input` to `output` byte-for-byte, creating parent directories as
/// needed. Errors propagate with context; callers treat them as recoverable
/// (log and abandon this one copy attempt).
pub fn mirror(input: &Path, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating asset directory {:?}", parent))?;
    }

    fs::copy(input, output)
        .with_context(|| format!("copying asset {:?} to {:?}", input, output))?;
    info!(asset = ?input, output = ?output, "asset mirrored");
    Ok(())
}
