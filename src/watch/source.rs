// src/watch/source.rs

use std::path::Path;

use anyhow::Result;

/// Handle for one active watch subscription. Closable exactly once;
/// unsubscribing an already-closed token is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchToken(u64);

impl WatchToken {
    /// Construct a token from a raw id. Custom [`EventSource`]
    /// implementations mint their own tokens with this.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// What a subscription is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    /// Content changes and removal of one file.
    File,
    /// Entry creation/removal (and child changes) inside one directory,
    /// non-recursively.
    Directory,
}

/// Abstract source of filesystem change notifications.
///
/// The engine never talks to a platform notification API directly; it
/// subscribes paths here and receives token-addressed events back on its
/// channel. Implementations: [`crate::watch::NotifySource`] over the
/// platform watcher, [`NullSource`] for one-shot builds.
pub trait EventSource {
    /// Start watching `path`. The same path may be subscribed under several
    /// tokens (e.g. one index file that is also another index's dependency).
    fn subscribe(&mut self, path: &Path, kind: WatchKind) -> Result<WatchToken>;

    /// Stop watching. Unknown tokens are ignored.
    fn unsubscribe(&mut self, token: WatchToken) -> Result<()>;
}

/// An event source that registers nothing and never delivers an event.
///
/// Used when `watch = false`: the walker still asks for subscriptions, but
/// a one-shot build has no use for them.
#[derive(Debug, Default)]
pub struct NullSource {
    next: u64,
}

impl EventSource for NullSource {
    fn subscribe(&mut self, _path: &Path, _kind: WatchKind) -> Result<WatchToken> {
        let token = WatchToken(self.next);
        self.next += 1;
        Ok(token)
    }

    fn unsubscribe(&mut self, _token: WatchToken) -> Result<()> {
        Ok(())
    }
}
