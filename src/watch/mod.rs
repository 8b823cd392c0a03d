// src/watch/mod.rs

//! Filesystem watch subscriptions.
//!
//! This module is responsible for:
//! - The abstract [`EventSource`] interface the engine subscribes through
//!   (`subscribe(path, kind) -> token` / `unsubscribe(token)`).
//! - A `notify`-backed implementation for live watching.
//! - A no-op implementation for one-shot builds and tests.
//!
//! It does **not** know about indexes, dependencies, or assets; it only
//! turns raw filesystem changes into token-addressed runtime events.

pub mod notify_source;
pub mod source;

pub use notify_source::NotifySource;
pub use source::{EventSource, NullSource, WatchKind, WatchToken};
