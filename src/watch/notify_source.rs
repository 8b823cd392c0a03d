// src/watch/notify_source.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::RuntimeEvent;
use crate::watch::source::{EventSource, WatchKind, WatchToken};

/// One live subscription.
#[derive(Debug, Clone)]
struct Subscription {
    path: PathBuf,
    kind: WatchKind,
}

/// Token bookkeeping shared between the subscribing side (the engine) and
/// the event bridge task.
#[derive(Debug, Default)]
struct SubTable {
    next: u64,
    by_token: HashMap<WatchToken, Subscription>,
    by_path: HashMap<PathBuf, Vec<WatchToken>>,
}

impl SubTable {
    fn insert(&mut self, path: PathBuf, kind: WatchKind) -> (WatchToken, bool) {
        let token = WatchToken::new(self.next);
        self.next += 1;

        let tokens = self.by_path.entry(path.clone()).or_default();
        let first_for_path = tokens.is_empty();
        tokens.push(token);

        self.by_token.insert(token, Subscription { path, kind });
        (token, first_for_path)
    }

    fn remove(&mut self, token: WatchToken) -> Option<(PathBuf, bool)> {
        let sub = self.by_token.remove(&token)?;
        let mut last_for_path = false;
        if let Some(tokens) = self.by_path.get_mut(&sub.path) {
            tokens.retain(|t| *t != token);
            if tokens.is_empty() {
                self.by_path.remove(&sub.path);
                last_for_path = true;
            }
        }
        Some((sub.path, last_for_path))
    }

    /// Tokens interested in a change at `path`: exact-path subscriptions of
    /// either kind, plus directory subscriptions on the parent.
    fn resolve(&self, path: &Path) -> Vec<WatchToken> {
        let mut hits = Vec::new();
        if let Some(tokens) = self.by_path.get(path) {
            hits.extend(tokens.iter().copied());
        }
        if let Some(parent) = path.parent() {
            if let Some(tokens) = self.by_path.get(parent) {
                for token in tokens {
                    let dir_kind = self
                        .by_token
                        .get(token)
                        .is_some_and(|s| s.kind == WatchKind::Directory);
                    if dir_kind {
                        hits.push(*token);
                    }
                }
            }
        }
        hits
    }
}

/// [`EventSource`] backed by the platform watcher from `notify`.
///
/// Each distinct subscribed path holds exactly one non-recursive OS watch,
/// shared by however many tokens point at it. Raw notify events are bridged
/// into the async world over an unbounded channel and resolved to tokens by
/// a spawned forwarder task, which delivers [`RuntimeEvent::PathChanged`]
/// into the engine's channel. Event kinds reported by the platform are
/// deliberately discarded; the engine re-stats paths at handling time.
pub struct NotifySource {
    watcher: RecommendedWatcher,
    table: Arc<Mutex<SubTable>>,
}

impl std::fmt::Debug for NotifySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifySource").finish_non_exhaustive()
    }
}

impl NotifySource {
    /// Create the watcher and spawn the bridge task feeding `runtime_tx`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(runtime_tx: mpsc::UnboundedSender<RuntimeEvent>) -> Result<Self> {
        let table = Arc::new(Mutex::new(SubTable::default()));

        // Channel from the blocking notify callback into the async world.
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<Event>();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if raw_tx.send(event).is_err() {
                        // Bridge task is gone; nothing left to notify.
                    }
                }
                Err(err) => {
                    eprintln!("csswatch: file watch error: {err}");
                }
            },
            Config::default(),
        )?;

        let bridge_table = Arc::clone(&table);
        tokio::spawn(async move {
            while let Some(event) = raw_rx.recv().await {
                debug!(?event, "received notify event");
                for path in event.paths.iter() {
                    let tokens = {
                        let table = bridge_table.lock().expect("subscription table poisoned");
                        table.resolve(path)
                    };
                    for token in tokens {
                        let sent = runtime_tx.send(RuntimeEvent::PathChanged {
                            token,
                            path: path.clone(),
                        });
                        if sent.is_err() {
                            debug!("runtime channel closed, stopping event bridge");
                            return;
                        }
                    }
                }
            }
            debug!("notify event bridge ended");
        });

        Ok(Self { watcher, table })
    }
}

impl EventSource for NotifySource {
    fn subscribe(&mut self, path: &Path, kind: WatchKind) -> Result<WatchToken> {
        let (token, first_for_path) = {
            let mut table = self.table.lock().expect("subscription table poisoned");
            table.insert(path.to_path_buf(), kind)
        };

        if first_for_path {
            let watched = self
                .watcher
                .watch(path, RecursiveMode::NonRecursive)
                .with_context(|| format!("watching {:?}", path));
            if let Err(err) = watched {
                let mut table = self.table.lock().expect("subscription table poisoned");
                table.remove(token);
                return Err(err);
            }
        }

        debug!(?token, ?path, ?kind, "subscribed");
        Ok(token)
    }

    fn unsubscribe(&mut self, token: WatchToken) -> Result<()> {
        let removed = {
            let mut table = self.table.lock().expect("subscription table poisoned");
            table.remove(token)
        };

        match removed {
            Some((path, true)) => {
                // The path may already be gone; notify then errors and the
                // OS watch is gone with the path.
                if let Err(err) = self.watcher.unwatch(&path) {
                    debug!(?path, %err, "unwatch after removal");
                }
                debug!(?token, ?path, "unsubscribed (last for path)");
            }
            Some((path, false)) => {
                debug!(?token, ?path, "unsubscribed");
            }
            None => {
                warn!(?token, "unsubscribe for unknown token ignored");
            }
        }
        Ok(())
    }
}
