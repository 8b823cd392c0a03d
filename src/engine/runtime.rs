// src/engine/runtime.rs

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::assets;
use crate::compile::{self, CompileOutcome};
use crate::config::Settings;
use crate::registry::DepRegistry;
use crate::transform::Pipeline;
use crate::walk::{Classifier, PathClass, mirror_path};
use crate::watch::{EventSource, WatchKind, WatchToken};

/// Events consumed by the runtime loop.
///
/// Event sources send `PathChanged`; the Ctrl-C handler sends
/// `ShutdownRequested`. All of them are processed in arrival order on one
/// control flow, so no watch map is ever touched concurrently.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    PathChanged { token: WatchToken, path: PathBuf },
    ShutdownRequested,
}

/// What a live token is attached to. The runtime dispatches purely on this;
/// the platform's reported event kind is never trusted, existence is
/// re-checked at handling time.
#[derive(Debug, Clone)]
enum Route {
    Directory { input: PathBuf },
    Index { input: PathBuf },
    Dependency { index: PathBuf },
    Asset { input: PathBuf },
}

#[derive(Debug)]
struct AssetWatch {
    output: PathBuf,
    token: WatchToken,
}

/// The reconciliation runtime: owns every watch map and drives the walker,
/// the compile driver, and the registry from one event loop.
pub struct Runtime<S: EventSource> {
    input_root: PathBuf,
    output_root: PathBuf,
    classifier: Classifier,
    pipeline: Pipeline,
    source: S,
    events_rx: mpsc::UnboundedReceiver<RuntimeEvent>,

    registry: DepRegistry,
    /// Tracked input directory → its watch.
    dirs: HashMap<PathBuf, WatchToken>,
    /// Tracked asset → its output path and watch.
    assets: HashMap<PathBuf, AssetWatch>,
    /// Live token → what it is watching.
    routes: HashMap<WatchToken, Route>,
    /// blake3 of each index's last compiled content. Duplicate change
    /// notifications for identical bytes skip the recompile.
    content_hashes: HashMap<PathBuf, blake3::Hash>,
}

impl<S: EventSource> Runtime<S> {
    pub fn new(
        settings: &Settings,
        pipeline: Pipeline,
        source: S,
        events_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
    ) -> Result<Self> {
        let classifier = Classifier::from_settings(settings)?;
        Ok(Self {
            input_root: settings.input.clone(),
            output_root: settings.output.clone(),
            classifier,
            pipeline,
            source,
            events_rx,
            registry: DepRegistry::new(),
            dirs: HashMap::new(),
            assets: HashMap::new(),
            routes: HashMap::new(),
            content_hashes: HashMap::new(),
        })
    }

    /// Iterative traversal of `root` with an explicit stack.
    ///
    /// Registers a directory watch per visited directory, compiles every
    /// index artifact found, and mirrors every allow-listed asset. An
    /// unreadable directory aborts the walk; the initial caller treats that
    /// as fatal, while the directory event handler downgrades it to a
    /// warning for subtrees created at runtime.
    pub fn walk(&mut self, root: &Path) -> Result<()> {
        let mut stack = vec![root.to_path_buf()];

        while let Some(dir) = stack.pop() {
            self.track_dir(&dir)?;

            let entries =
                fs::read_dir(&dir).with_context(|| format!("reading directory {:?}", dir))?;

            for entry in entries {
                let entry = entry.with_context(|| format!("reading entry in {:?}", dir))?;
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .with_context(|| format!("inspecting {:?}", path))?;

                if file_type.is_dir() {
                    if !self.classifier.is_vendored(&path) {
                        stack.push(path);
                    }
                } else if file_type.is_file() {
                    self.discover_file(&path)?;
                }
                // Symlinks and other file types are ignored.
            }
        }

        Ok(())
    }

    /// Main event loop. Runs until the channel closes or shutdown is
    /// requested.
    pub async fn run(mut self) -> Result<()> {
        info!("csswatch runtime started");

        while let Some(event) = self.events_rx.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }

        info!("csswatch runtime exiting");
        Ok(())
    }

    /// Process one event; returns false when the loop should stop.
    pub fn handle_event(&mut self, event: RuntimeEvent) -> bool {
        debug!(?event, "runtime received event");
        match event {
            RuntimeEvent::PathChanged { token, path } => {
                self.handle_path_changed(token, &path);
                true
            }
            RuntimeEvent::ShutdownRequested => {
                info!("shutdown requested, stopping runtime");
                false
            }
        }
    }

    fn handle_path_changed(&mut self, token: WatchToken, path: &Path) {
        let Some(route) = self.routes.get(&token).cloned() else {
            // The watch was closed between the event firing and us seeing it.
            debug!(?token, ?path, "event for closed watch ignored");
            return;
        };

        match route {
            Route::Index { input } => self.on_index_event(&input),
            Route::Dependency { index } => self.on_dependency_event(&index, path),
            Route::Directory { input } => self.on_dir_event(&input, path),
            Route::Asset { input } => self.on_asset_event(&input),
        }
    }

    /// The index file itself changed or disappeared.
    fn on_index_event(&mut self, input: &Path) {
        if input.is_file() {
            self.recompile(input, false);
        } else {
            self.teardown_index(input);
        }
    }

    /// A watched dependency changed or disappeared.
    ///
    /// A missing dependency only closes its own watch: the next compile may
    /// drop the reference entirely, or the file may come back and be
    /// re-reported.
    fn on_dependency_event(&mut self, index: &Path, dep: &Path) {
        if dep.exists() {
            self.recompile(index, true);
            return;
        }

        match self.registry.remove_dep(&mut self.source, index, dep) {
            Ok(Some(token)) => {
                self.routes.remove(&token);
            }
            Ok(None) => {}
            Err(err) => warn!(index = ?index, dep = ?dep, %err, "removing dependency watch"),
        }
    }

    /// Structural notification for `path` inside watched directory `dir`.
    ///
    /// One re-stat-and-branch: whatever the platform claimed happened, the
    /// path either exists (creation or change) or it does not (removal).
    fn on_dir_event(&mut self, dir: &Path, path: &Path) {
        if path == dir {
            if !dir.exists() {
                self.remove_subtree(dir);
            }
            return;
        }

        if path.is_dir() {
            if !self.dirs.contains_key(path) && !self.classifier.is_vendored(path) {
                debug!(dir = ?path, "new directory discovered");
                if let Err(err) = self.walk(path) {
                    warn!(dir = ?path, error = %format!("{err:#}"), "walking new subtree");
                }
            }
        } else if path.is_file() {
            match self.classifier.classify(path) {
                PathClass::Index => {
                    if self.registry.contains(path) {
                        // Editors that save by rename bypass the file's own
                        // watch; the hash gate suppresses duplicates when
                        // both watches fire.
                        self.recompile(path, false);
                    } else if let Err(err) = self.discover_index(path) {
                        warn!(index = ?path, error = %format!("{err:#}"), "tracking new index");
                    }
                }
                PathClass::Asset => {
                    if self.assets.contains_key(path) {
                        self.copy_asset(path);
                    } else if let Err(err) = self.discover_asset(path) {
                        warn!(asset = ?path, error = %format!("{err:#}"), "tracking new asset");
                    }
                }
                PathClass::Ignored => {}
            }
        } else {
            // Gone (or no longer a plain file/dir): tear down whatever was
            // tracked at or under it. Unknown paths fall through silently.
            self.remove_subtree(path);
        }
    }

    /// A mirrored asset changed or disappeared.
    fn on_asset_event(&mut self, input: &Path) {
        if input.is_file() {
            self.copy_asset(input);
            return;
        }

        if let Some(watch) = self.assets.remove(input) {
            if let Err(err) = self.source.unsubscribe(watch.token) {
                warn!(asset = ?input, %err, "closing asset watch");
            }
            self.routes.remove(&watch.token);
            debug!(asset = ?input, "asset watch closed (file gone)");
        }
    }

    fn discover_file(&mut self, path: &Path) -> Result<()> {
        match self.classifier.classify(path) {
            PathClass::Index => self.discover_index(path),
            PathClass::Asset => self.discover_asset(path),
            PathClass::Ignored => Ok(()),
        }
    }

    fn track_dir(&mut self, dir: &Path) -> Result<()> {
        if self.dirs.contains_key(dir) {
            return Ok(());
        }
        let token = self.source.subscribe(dir, WatchKind::Directory)?;
        self.dirs.insert(dir.to_path_buf(), token);
        self.routes.insert(
            token,
            Route::Directory {
                input: dir.to_path_buf(),
            },
        );
        debug!(dir = ?dir, "directory tracked");
        Ok(())
    }

    fn discover_index(&mut self, input: &Path) -> Result<()> {
        if self.registry.contains(input) {
            return Ok(());
        }
        let output = mirror_path(&self.input_root, &self.output_root, input)?;
        let token = self.registry.insert(&mut self.source, input, &output)?;
        self.routes.insert(
            token,
            Route::Index {
                input: input.to_path_buf(),
            },
        );
        self.recompile(input, true);
        Ok(())
    }

    fn discover_asset(&mut self, input: &Path) -> Result<()> {
        if self.assets.contains_key(input) {
            return Ok(());
        }
        let output = mirror_path(&self.input_root, &self.output_root, input)?;

        if let Err(err) = assets::mirror(input, &output) {
            warn!(asset = ?input, error = %format!("{err:#}"), "mirroring asset");
        }

        let token = self.source.subscribe(input, WatchKind::File)?;
        self.assets.insert(
            input.to_path_buf(),
            AssetWatch {
                output,
                token,
            },
        );
        self.routes.insert(
            token,
            Route::Asset {
                input: input.to_path_buf(),
            },
        );
        Ok(())
    }

    fn copy_asset(&mut self, input: &Path) {
        if let Some(watch) = self.assets.get(input) {
            if let Err(err) = assets::mirror(input, &watch.output) {
                warn!(asset = ?input, error = %format!("{err:#}"), "re-mirroring asset");
            }
        }
    }

    /// Read, hash-gate, compile, reconcile.
    ///
    /// `force` bypasses the content gate; used for initial compiles and for
    /// dependency-triggered recompiles, where the index bytes are unchanged
    /// but the inputs behind them are not.
    fn recompile(&mut self, index: &Path, force: bool) {
        let Some(output) = self.registry.output_of(index).map(Path::to_path_buf) else {
            return;
        };

        let content = match fs::read_to_string(index) {
            Ok(content) => content,
            Err(err) => {
                warn!(index = ?index, %err, "reading index, compile skipped");
                return;
            }
        };

        let hash = blake3::hash(content.as_bytes());
        if !force && self.content_hashes.get(index) == Some(&hash) {
            debug!(index = ?index, "content unchanged, recompile skipped");
            return;
        }
        self.content_hashes.insert(index.to_path_buf(), hash);

        let outcome = compile::compile(&self.pipeline, &self.classifier, index, &output, &content);

        // A failed compile keeps the previous dependency set, so the
        // reconcile below diffs to nothing.
        let new_deps = match outcome {
            CompileOutcome::Compiled { deps } => deps,
            CompileOutcome::Failed => self.registry.deps_of(index).unwrap_or_default(),
        };

        match self.registry.reconcile(&mut self.source, index, &new_deps) {
            Ok(outcome) => {
                for (_, token) in outcome.added.iter() {
                    self.routes.insert(
                        *token,
                        Route::Dependency {
                            index: index.to_path_buf(),
                        },
                    );
                }
                for token in outcome.removed.iter() {
                    self.routes.remove(token);
                }
            }
            Err(err) => {
                warn!(index = ?index, error = %format!("{err:#}"), "reconciling dependencies");
            }
        }
    }

    fn teardown_index(&mut self, input: &Path) {
        for token in self.registry.teardown(&mut self.source, input) {
            self.routes.remove(&token);
        }
        self.content_hashes.remove(input);
    }

    /// Remove every piece of tracked state at or under `prefix`: index
    /// entries (with their dependency watches), directory watches, and
    /// asset watches. Called for file removals too, where the prefix match
    /// degenerates to the exact path.
    fn remove_subtree(&mut self, prefix: &Path) {
        for index in self.registry.indexes_under(prefix) {
            self.teardown_index(&index);
        }

        let removed_dirs: Vec<PathBuf> = self
            .dirs
            .keys()
            .filter(|p| p.starts_with(prefix))
            .cloned()
            .collect();
        for dir in removed_dirs {
            if let Some(token) = self.dirs.remove(&dir) {
                if let Err(err) = self.source.unsubscribe(token) {
                    warn!(dir = ?dir, %err, "closing directory watch");
                }
                self.routes.remove(&token);
                debug!(dir = ?dir, "directory watch closed");
            }
        }

        let removed_assets: Vec<PathBuf> = self
            .assets
            .keys()
            .filter(|p| p.starts_with(prefix))
            .cloned()
            .collect();
        for asset in removed_assets {
            if let Some(watch) = self.assets.remove(&asset) {
                if let Err(err) = self.source.unsubscribe(watch.token) {
                    warn!(asset = ?asset, %err, "closing asset watch");
                }
                self.routes.remove(&watch.token);
            }
        }
    }

    // Accessors used by tests and by embedding callers that want to inspect
    // the watch state.

    pub fn registry(&self) -> &DepRegistry {
        &self.registry
    }

    pub fn dir_token(&self, dir: &Path) -> Option<WatchToken> {
        self.dirs.get(dir).copied()
    }

    pub fn asset_token(&self, asset: &Path) -> Option<WatchToken> {
        self.assets.get(asset).map(|w| w.token)
    }

    /// Number of live watches across all owners.
    pub fn watch_count(&self) -> usize {
        self.routes.len()
    }
}
