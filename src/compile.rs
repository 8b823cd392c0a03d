// src/compile.rs

//! The compile driver: run one index artifact through the pipeline, write
//! the output (and source map, when one was produced), and extract the
//! dependency set from the pipeline's report.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::transform::{Message, Pipeline};
use crate::walk::Classifier;

/// Result of one compile attempt.
#[derive(Debug)]
pub enum CompileOutcome {
    /// The pipeline succeeded; `deps` is the filtered dependency report.
    Compiled { deps: HashSet<PathBuf> },
    /// The pipeline failed. Nothing was written; the caller keeps the
    /// previous output and the previous watch set. A broken edit must not
    /// make the watcher lose track of files that were known-good
    /// dependents.
    Failed,
}

/// Compile `input` to `output` through `pipeline`.
///
/// `content` is the index file's current bytes, read by the caller (which
/// also hashes them for change coalescing). On success the output file and
/// an optional adjacent `.map` are written. Output write errors are logged
/// and do not invalidate the dependency report: the transform itself
/// succeeded, so the watch set should still track what it named.
pub fn compile(
    pipeline: &Pipeline,
    classifier: &Classifier,
    input: &Path,
    output: &Path,
    content: &str,
) -> CompileOutcome {
    let result = match pipeline.process(content, input, output) {
        Ok(result) => result,
        Err(err) => {
            error!(index = ?input, error = %format!("{err:#}"), "compile failed");
            return CompileOutcome::Failed;
        }
    };

    if let Err(err) = write_output(output, &result.content, result.map.as_deref()) {
        error!(output = ?output, error = %format!("{err:#}"), "writing compiled output");
    } else {
        info!(index = ?input, output = ?output, "compiled");
    }

    let mut deps = HashSet::new();
    for message in result.messages {
        match message {
            Message::Dependency { file } => {
                if file == input {
                    // The index watch already covers this path.
                    continue;
                }
                if classifier.is_vendored(&file) {
                    continue;
                }
                deps.insert(file);
            }
            Message::Warning { text } => {
                warn!(index = ?input, "{text}");
            }
        }
    }

    CompileOutcome::Compiled { deps }
}

fn write_output(output: &Path, content: &str, map: Option<&str>) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {:?}", parent))?;
    }

    fs::write(output, content).with_context(|| format!("writing {:?}", output))?;

    if let Some(map) = map {
        let map_path = map_path(output);
        fs::write(&map_path, map).with_context(|| format!("writing {:?}", map_path))?;
    }

    Ok(())
}

/// Source maps sit alongside the output with `.map` appended to the full
/// file name (`index.css` → `index.css.map`).
fn map_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(".map");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::transform::{StageContext, StageOutput, TransformStage};
    use anyhow::anyhow;
    use tempfile::tempdir;

    fn classifier() -> Classifier {
        Classifier::from_settings(&Settings::new("/in", "/out")).unwrap()
    }

    struct Reporting {
        deps: Vec<PathBuf>,
    }

    impl TransformStage for Reporting {
        fn name(&self) -> &str {
            "reporting"
        }

        fn process(&self, content: &str, _ctx: &StageContext<'_>) -> Result<StageOutput> {
            Ok(StageOutput {
                content: content.to_string(),
                map: Some("{\"version\":3}".to_string()),
                messages: self
                    .deps
                    .iter()
                    .map(|file| Message::Dependency { file: file.clone() })
                    .collect(),
            })
        }
    }

    struct Broken;

    impl TransformStage for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn process(&self, _content: &str, _ctx: &StageContext<'_>) -> Result<StageOutput> {
            Err(anyhow!("unexpected token"))
        }
    }

    #[test]
    fn empty_pipeline_writes_input_bytes() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("nested/out.css");
        let pipeline = Pipeline::new(vec![]);

        let outcome = compile(
            &pipeline,
            &classifier(),
            Path::new("/in/index.css"),
            &output,
            "body {background: pink;}",
        );

        assert!(matches!(outcome, CompileOutcome::Compiled { ref deps } if deps.is_empty()));
        assert_eq!(fs::read_to_string(&output).unwrap(), "body {background: pink;}");
    }

    #[test]
    fn map_is_written_alongside_the_output() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.css");
        let pipeline = Pipeline::new(vec![Box::new(Reporting { deps: vec![] })]);

        compile(&pipeline, &classifier(), Path::new("/in/index.css"), &output, "a{}");

        assert!(dir.path().join("out.css.map").exists());
    }

    #[test]
    fn dependency_report_excludes_vendored_paths_and_the_index_itself() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.css");
        let pipeline = Pipeline::new(vec![Box::new(Reporting {
            deps: vec![
                PathBuf::from("/in/a.css"),
                PathBuf::from("/in/node_modules/x/reset.css"),
                PathBuf::from("/in/index.css"),
            ],
        })]);

        let outcome = compile(
            &pipeline,
            &classifier(),
            Path::new("/in/index.css"),
            &output,
            "a{}",
        );

        let CompileOutcome::Compiled { deps } = outcome else {
            panic!("expected success");
        };
        assert_eq!(deps, HashSet::from([PathBuf::from("/in/a.css")]));
    }

    #[test]
    fn pipeline_failure_writes_nothing() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.css");
        let pipeline = Pipeline::new(vec![Box::new(Broken)]);

        let outcome = compile(
            &pipeline,
            &classifier(),
            Path::new("/in/index.css"),
            &output,
            "a{}",
        );

        assert!(matches!(outcome, CompileOutcome::Failed));
        assert!(!output.exists());
    }
}
