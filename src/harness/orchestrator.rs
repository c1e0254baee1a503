//! Run orchestration
//!
//! ```text
//! BUILDING -> RUNNING -> COLLECTING -> DONE
//!                                  \-> PATCHING -> DONE
//! ```
//! with FAILED reachable from every stage. Scratch artifacts are removed
//! on every exit path.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::collaborators::{Builder, Executor, Formatter};
use super::scratch::Scratch;
use crate::common::{paths, Error, Result};
use crate::patch::{self, PatchStrategy};
use crate::protocol::{self, CallSite};
use crate::select::{self, Mismatch};

/// Per-run settings
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub strategy: PatchStrategy,
    /// Appended to the file under test to name the corrected file
    pub suffix: String,
    /// Report mismatches without writing a corrected file
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            strategy: PatchStrategy::default(),
            suffix: ".corrected".to_string(),
            dry_run: false,
        }
    }
}

/// Orchestrator stage, for logging transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Building,
    Running,
    Collecting,
    Patching,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Building => "building",
            Stage::Running => "running",
            Stage::Collecting => "collecting",
            Stage::Patching => "patching",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a run ended, when the harness itself did not fail
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every assertion in the file under test matched
    Clean { assertions: usize },
    /// Mismatches found; nothing written (dry run)
    Mismatched { mismatches: Vec<Mismatch> },
    /// Corrected source written beside the original
    Corrected {
        path: PathBuf,
        mismatches: Vec<Mismatch>,
        superseded: Vec<CallSite>,
    },
    /// The test program itself exited nonzero; nothing was patched
    ChildFailed { code: i32 },
}

impl RunOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::ChildFailed { code } => *code,
            _ => 0,
        }
    }
}

/// Sequences build, run, collect, select and patch for one file at a time
#[derive(Debug)]
pub struct Orchestrator<B, E, F> {
    builder: B,
    executor: E,
    formatter: F,
    options: RunOptions,
}

impl<B: Builder, E: Executor, F: Formatter> Orchestrator<B, E, F> {
    pub fn new(builder: B, executor: E, formatter: F, options: RunOptions) -> Self {
        Self {
            builder,
            executor,
            formatter,
            options,
        }
    }

    /// Run one file under test
    #[tracing::instrument(skip(self), fields(file = %file.display()))]
    pub async fn run(&self, file: &Path) -> Result<RunOutcome> {
        let file = paths::resolve(file);
        let source = tokio::fs::read_to_string(&file)
            .await
            .map_err(|e| Error::file_read(&file, &e))?;

        let scratch = Scratch::beside(&file)?;
        let result = self.run_stages(&file, &source, scratch.artifact()).await;

        for failure in scratch.cleanup() {
            tracing::warn!(error = %failure, "Cleanup failed");
        }

        match &result {
            Ok(outcome) => tracing::debug!(stage = %Stage::Done, exit_code = outcome.exit_code(), "Run finished"),
            Err(e) => tracing::debug!(stage = %Stage::Failed, error = %e, "Run failed"),
        }
        result
    }

    async fn run_stages(&self, file: &Path, source: &str, artifact: &Path) -> Result<RunOutcome> {
        tracing::debug!(stage = %Stage::Building, artifact = %artifact.display());
        let report = self.builder.build(file, artifact).await?;
        if !report.errors.is_empty() {
            return Err(Error::Build {
                errors: report.errors,
            });
        }

        tracing::debug!(stage = %Stage::Running);
        let execution = self.executor.execute(artifact).await?;
        if execution.exit_code != 0 {
            tracing::warn!(code = execution.exit_code, "Test program exited with nonzero code");
            return Ok(RunOutcome::ChildFailed {
                code: execution.exit_code,
            });
        }

        tracing::debug!(stage = %Stage::Collecting, lines = execution.stdout.len());
        let records = protocol::collect(&execution.stdout)?;
        let mismatches = select::select(&records, file);
        if mismatches.is_empty() {
            return Ok(RunOutcome::Clean {
                assertions: records.len(),
            });
        }
        tracing::info!(count = mismatches.len(), "Found mismatching assertions");

        if self.options.dry_run {
            return Ok(RunOutcome::Mismatched { mismatches });
        }

        tracing::debug!(stage = %Stage::Patching, strategy = ?self.options.strategy);
        let patched = patch::apply(self.options.strategy, file, source, &mismatches)?;
        let text = match self.formatter.format(&patched.text, file).await {
            Ok(formatted) => formatted,
            Err(e) => {
                tracing::warn!(error = %e, "Formatter failed, writing unformatted output");
                patched.text
            }
        };

        let path = paths::corrected_path(file, &self.options.suffix);
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| Error::file_write(&path, &e))?;
        tracing::info!(path = %path.display(), edits = patched.applied, "Wrote corrected file");

        Ok(RunOutcome::Corrected {
            path,
            mismatches,
            superseded: patched.superseded,
        })
    }
}
