// src/engine/mod.rs

//! The reconciliation engine.
//!
//! This module ties together:
//! - the directory walker (initial traversal and re-walks of created
//!   subtrees)
//! - the compile driver and dependency reconciliation
//! - the asset mirror
//! - the single event loop that reacts to:
//!   - index/dependency content changes
//!   - structural directory events
//!   - asset changes
//!   - shutdown signals

pub mod runtime;

pub use runtime::{Runtime, RuntimeEvent};
