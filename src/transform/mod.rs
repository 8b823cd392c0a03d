// src/transform/mod.rs

//! The pluggable transform pipeline.
//!
//! The core never parses style-sheet content itself. Everything it knows
//! about an index artifact's dependencies comes from the messages a stage
//! reports here. Stages are ordered; content threads through them, the last
//! source map produced wins, and messages accumulate across the chain.
//!
//! An empty pipeline is valid and passes content through byte-for-byte.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Compile context handed to every stage, mirroring the `(from, to)` pair
/// the engine was invoked with.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    /// Path of the index artifact being compiled.
    pub from: &'a Path,
    /// Path the compiled output will be written to.
    pub to: &'a Path,
}

/// A message reported by a stage alongside its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A file that contributed to this compile. The registry watches these.
    Dependency { file: PathBuf },
    /// Informational only; surfaced through the log, never acted upon.
    Warning { text: String },
}

/// Output of a single stage, and of the pipeline as a whole.
#[derive(Debug, Clone, Default)]
pub struct StageOutput {
    pub content: String,
    pub map: Option<String>,
    pub messages: Vec<Message>,
}

/// One transform stage in the configured chain.
///
/// Stages are injected at configuration time; the core never inspects their
/// internals. A stage that fails aborts the whole compile for this artifact
/// (the previous output and watch set are retained by the caller).
pub trait TransformStage: Send + Sync {
    /// Stage name used in log lines and error context.
    fn name(&self) -> &str;

    /// Transform `content`, optionally producing a source map and messages.
    fn process(&self, content: &str, ctx: &StageContext<'_>) -> Result<StageOutput>;
}

/// An ordered chain of transform stages.
pub struct Pipeline {
    stages: Vec<Box<dyn TransformStage>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn TransformStage>>) -> Self {
        Self { stages }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run the full chain over `content`.
    ///
    /// The map of the last stage that produced one is kept; messages from
    /// all stages are concatenated in stage order.
    pub fn process(&self, content: &str, from: &Path, to: &Path) -> Result<StageOutput> {
        let ctx = StageContext { from, to };

        let mut out = StageOutput {
            content: content.to_string(),
            map: None,
            messages: Vec::new(),
        };

        for stage in self.stages.iter() {
            let stage_out = stage
                .process(&out.content, &ctx)
                .with_context(|| format!("transform stage '{}' failed", stage.name()))?;

            out.content = stage_out.content;
            if stage_out.map.is_some() {
                out.map = stage_out.map;
            }
            out.messages.extend(stage_out.messages);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct Upper;

    impl TransformStage for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn process(&self, content: &str, _ctx: &StageContext<'_>) -> Result<StageOutput> {
            Ok(StageOutput {
                content: content.to_uppercase(),
                map: None,
                messages: Vec::new(),
            })
        }
    }

    struct Suffix(&'static str);

    impl TransformStage for Suffix {
        fn name(&self) -> &str {
            "suffix"
        }

        fn process(&self, content: &str, _ctx: &StageContext<'_>) -> Result<StageOutput> {
            Ok(StageOutput {
                content: format!("{content}{}", self.0),
                map: Some("{}".to_string()),
                messages: vec![Message::Dependency {
                    file: PathBuf::from("/dep/a.css"),
                }],
            })
        }
    }

    struct Broken;

    impl TransformStage for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn process(&self, _content: &str, _ctx: &StageContext<'_>) -> Result<StageOutput> {
            Err(anyhow!("syntax error"))
        }
    }

    #[test]
    fn empty_pipeline_is_a_passthrough() {
        let pipeline = Pipeline::new(vec![]);
        let out = pipeline
            .process("body {background: pink;}", Path::new("in.css"), Path::new("out.css"))
            .unwrap();
        assert_eq!(out.content, "body {background: pink;}");
        assert!(out.map.is_none());
        assert!(out.messages.is_empty());
    }

    #[test]
    fn stages_run_in_order_and_messages_accumulate() {
        let pipeline = Pipeline::new(vec![Box::new(Upper), Box::new(Suffix("!"))]);
        let out = pipeline
            .process("abc", Path::new("in.css"), Path::new("out.css"))
            .unwrap();
        assert_eq!(out.content, "ABC!");
        assert_eq!(out.map.as_deref(), Some("{}"));
        assert_eq!(out.messages.len(), 1);
    }

    #[test]
    fn stage_failure_carries_the_stage_name() {
        let pipeline = Pipeline::new(vec![Box::new(Broken)]);
        let err = pipeline
            .process("abc", Path::new("in.css"), Path::new("out.css"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("broken"));
    }
}
