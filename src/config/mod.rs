// src/config/mod.rs

//! Configuration loading and validation for csswatch.
//!
//! Responsibilities:
//! - Define the TOML-backed settings model (`model.rs`).
//! - Load a settings file from disk (`loader.rs`).
//! - Validate basic invariants like a readable input root (`validate.rs`).
//!
//! Transform plugins are code values, not data; they are supplied to
//! [`crate::run`] alongside the settings and never appear in this module.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::Settings;
pub use validate::validate_settings;
