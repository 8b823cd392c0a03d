// src/lib.rs

pub mod assets;
pub mod compile;
pub mod config;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod registry;
pub mod transform;
pub mod walk;
pub mod watch;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::{Settings, validate_settings};
use crate::engine::{Runtime, RuntimeEvent};
use crate::transform::{Pipeline, TransformStage};
use crate::watch::{NotifySource, NullSource};

/// High-level entry point.
///
/// This wires together:
/// - settings validation
/// - the transform pipeline
/// - the initial walk (compile everything, mirror assets, register watches)
/// - the notify-backed event source and Ctrl-C handling (watch mode)
/// - the runtime event loop
///
/// With `settings.watch = false` this performs a one-shot build and
/// returns. Otherwise it runs until Ctrl-C.
pub async fn run(mut settings: Settings, plugins: Vec<Box<dyn TransformStage>>) -> Result<()> {
    logging::init_logging(settings.verbose)?;
    validate_settings(&settings)?;

    // Event paths from the platform watcher come back absolute; walk from a
    // canonical root so prefix substitution lines up. Best-effort.
    if let Ok(canonical) = settings.input.canonicalize() {
        settings.input = canonical;
    }

    let pipeline = Pipeline::new(plugins);
    let (runtime_tx, runtime_rx) = mpsc::unbounded_channel::<RuntimeEvent>();

    if !settings.watch {
        let mut runtime = Runtime::new(&settings, pipeline, NullSource::default(), runtime_rx)?;
        runtime.walk(&settings.input)?;
        debug!("one-shot build complete");
        return Ok(());
    }

    let source = NotifySource::new(runtime_tx.clone())?;
    let mut runtime = Runtime::new(&settings, pipeline, source, runtime_rx)?;

    // Initial traversal; an unreadable root is the one fatal failure.
    runtime.walk(&settings.input)?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = runtime_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested);
        });
    }

    runtime.run().await
}
