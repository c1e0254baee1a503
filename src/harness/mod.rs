//! Harness: drive a file under test through build, run and patch

mod collaborators;
mod orchestrator;
mod scratch;

use std::path::Path;

pub use collaborators::{
    BuildReport, Builder, CommandBuilder, CommandFormatter, Execution, Executor, Formatter,
    NoopFormatter, ProcessExecutor,
};
pub use orchestrator::{Orchestrator, RunOptions, RunOutcome};

use crate::common::config::Config;
use crate::common::Result;

/// Orchestrator backed by the configured external commands
pub type CommandOrchestrator = Orchestrator<CommandBuilder, ProcessExecutor, Box<dyn Formatter>>;

/// Build an orchestrator from configuration
///
/// Tools are resolved relative to `near` (the directory of the file under
/// test), so a project-local `node_modules/.bin` takes precedence.
pub fn from_config(config: &Config, options: RunOptions, near: &Path) -> Result<CommandOrchestrator> {
    let builder = CommandBuilder::from_config(&config.build, near)?;
    let executor = ProcessExecutor::from_config(&config.run, near)?;
    let formatter: Box<dyn Formatter> = if config.format.enabled {
        Box::new(CommandFormatter::from_config(&config.format, near)?)
    } else {
        Box::new(NoopFormatter)
    };
    Ok(Orchestrator::new(builder, executor, formatter, options))
}
