// src/registry.rs

//! The dependency watch registry.
//!
//! Owns, per index artifact, the watch on the index file itself plus one
//! watch per dependency its last compile reported. After every compile the
//! engine hands the fresh dependency set to [`DepRegistry::reconcile`],
//! which diffs it against the previous set and opens/closes watches so that
//! the active subscriptions always equal exactly what the last report named.
//!
//! Invariant: no dependency watch outlives its owning entry, and no path is
//! watched twice under the same index.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, warn};

use crate::watch::{EventSource, WatchKind, WatchToken};

/// Watch state for one index artifact.
#[derive(Debug)]
pub struct IndexEntry {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Watch on the index file itself.
    pub index_token: WatchToken,
    /// Dependency path → its watch handle.
    pub deps: HashMap<PathBuf, WatchToken>,
}

/// Watches opened and closed by one reconciliation, so the engine can keep
/// its token routing table in step.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub added: Vec<(PathBuf, WatchToken)>,
    pub removed: Vec<WatchToken>,
}

/// Registry of all tracked index artifacts.
#[derive(Debug, Default)]
pub struct DepRegistry {
    entries: HashMap<PathBuf, IndexEntry>,
}

impl DepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly discovered index artifact, subscribing its own file
    /// watch. The entry starts with an empty dependency set; the first
    /// reconcile fills it in. Inserting an already-tracked index returns
    /// the existing token.
    pub fn insert(
        &mut self,
        source: &mut dyn EventSource,
        input: &Path,
        output: &Path,
    ) -> Result<WatchToken> {
        if let Some(entry) = self.entries.get(input) {
            return Ok(entry.index_token);
        }

        let token = source.subscribe(input, WatchKind::File)?;
        self.entries.insert(
            input.to_path_buf(),
            IndexEntry {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                index_token: token,
                deps: HashMap::new(),
            },
        );
        debug!(index = ?input, ?token, "index tracked");
        Ok(token)
    }

    pub fn contains(&self, index: &Path) -> bool {
        self.entries.contains_key(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn output_of(&self, index: &Path) -> Option<&Path> {
        self.entries.get(index).map(|e| e.output.as_path())
    }

    /// The index file's own watch token.
    pub fn token_of(&self, index: &Path) -> Option<WatchToken> {
        self.entries.get(index).map(|e| e.index_token)
    }

    /// The watch token of one dependency of `index`.
    pub fn dep_token(&self, index: &Path, dep: &Path) -> Option<WatchToken> {
        self.entries.get(index).and_then(|e| e.deps.get(dep).copied())
    }

    /// Current dependency set of an index, for diffing and tests.
    pub fn deps_of(&self, index: &Path) -> Option<HashSet<PathBuf>> {
        self.entries
            .get(index)
            .map(|e| e.deps.keys().cloned().collect())
    }

    /// All tracked indexes at or under `prefix`, for subtree removal.
    pub fn indexes_under(&self, prefix: &Path) -> Vec<PathBuf> {
        self.entries
            .keys()
            .filter(|p| p.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Diff the previous dependency set against `new_deps` and adjust
    /// watches: close watches for dropped paths, open watches for added
    /// ones. Both directions are idempotent per path.
    ///
    /// An index transiently reported as its own dependency is skipped; its
    /// own index watch takes precedence so a change triggers one recompile,
    /// not two. Paths that fail to subscribe (typically already deleted
    /// again) are skipped with a warning; a later compile either drops the
    /// reference or reports it again once it is back.
    pub fn reconcile(
        &mut self,
        source: &mut dyn EventSource,
        index: &Path,
        new_deps: &HashSet<PathBuf>,
    ) -> Result<ReconcileOutcome> {
        let Some(entry) = self.entries.get_mut(index) else {
            warn!(index = ?index, "reconcile for untracked index ignored");
            return Ok(ReconcileOutcome::default());
        };

        let mut outcome = ReconcileOutcome::default();

        let removed_paths: Vec<PathBuf> = entry
            .deps
            .keys()
            .filter(|p| !new_deps.contains(*p))
            .cloned()
            .collect();

        for path in removed_paths {
            if let Some(token) = entry.deps.remove(&path) {
                source.unsubscribe(token)?;
                outcome.removed.push(token);
                debug!(index = ?index, dep = ?path, "dependency watch closed");
            }
        }

        for path in new_deps.iter() {
            if path == index || entry.deps.contains_key(path) {
                continue;
            }
            match source.subscribe(path, WatchKind::File) {
                Ok(token) => {
                    entry.deps.insert(path.clone(), token);
                    outcome.added.push((path.clone(), token));
                    debug!(index = ?index, dep = ?path, "dependency watch opened");
                }
                Err(err) => {
                    warn!(index = ?index, dep = ?path, %err, "could not watch dependency");
                }
            }
        }

        Ok(outcome)
    }

    /// Stop watching a single dependency of `index`, keeping the entry and
    /// every other watch intact. Used when the dependency file itself
    /// disappears: the reference may be dropped by the next compile, or the
    /// file may come back and be re-reported.
    pub fn remove_dep(
        &mut self,
        source: &mut dyn EventSource,
        index: &Path,
        dep: &Path,
    ) -> Result<Option<WatchToken>> {
        let Some(entry) = self.entries.get_mut(index) else {
            return Ok(None);
        };
        let Some(token) = entry.deps.remove(dep) else {
            return Ok(None);
        };
        source.unsubscribe(token)?;
        debug!(index = ?index, dep = ?dep, "dependency watch closed (file gone)");
        Ok(Some(token))
    }

    /// Tear down everything owned by `index`: its own watch and every
    /// dependency watch. Returns all freed tokens; a no-op for untracked
    /// paths.
    pub fn teardown(&mut self, source: &mut dyn EventSource, index: &Path) -> Vec<WatchToken> {
        let Some(entry) = self.entries.remove(index) else {
            return Vec::new();
        };

        let mut freed = Vec::with_capacity(entry.deps.len() + 1);

        if let Err(err) = source.unsubscribe(entry.index_token) {
            warn!(index = ?index, %err, "closing index watch");
        }
        freed.push(entry.index_token);

        for (dep, token) in entry.deps {
            if let Err(err) = source.unsubscribe(token) {
                warn!(index = ?index, dep = ?dep, %err, "closing dependency watch");
            }
            freed.push(token);
        }

        debug!(index = ?index, watches = freed.len(), "index torn down");
        freed
    }
}
