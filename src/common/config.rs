//! Configuration file handling
//!
//! The harness drives three external tools: a bundler that turns the file
//! under test into something runnable, the runtime that executes it, and a
//! formatter applied to the corrected output. Each is a command plus an
//! argument template.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::{Error, Result};
use crate::patch::PatchStrategy;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// Build step settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Test program execution settings
    #[serde(default)]
    pub run: RunConfig,

    /// Formatter settings
    #[serde(default)]
    pub format: FormatConfig,

    /// Corrected output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Build step: `{entry}` and `{out}` are substituted in `args`
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BuildConfig {
    #[serde(default = "default_build_command")]
    pub command: String,

    #[serde(default = "default_build_args")]
    pub args: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: default_build_command(),
            args: default_build_args(),
        }
    }
}

fn default_build_command() -> String {
    "esbuild".to_string()
}

fn default_build_args() -> Vec<String> {
    [
        "{entry}",
        "--bundle",
        "--sourcemap",
        "--platform=node",
        "--main-fields=module,main",
        "--log-level=error",
        "--outfile={out}",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Execution step: `{artifact}` is substituted in `args`
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RunConfig {
    #[serde(default = "default_run_command")]
    pub command: String,

    #[serde(default = "default_run_args")]
    pub args: Vec<String>,

    /// Environment variable set to "true" to enable instrumentation
    #[serde(default = "default_env_flag")]
    pub env_flag: String,

    /// Wall-clock limit for the test program; 0 disables it
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            command: default_run_command(),
            args: default_run_args(),
            env_flag: default_env_flag(),
            timeout_secs: 0,
        }
    }
}

fn default_run_command() -> String {
    "node".to_string()
}

fn default_run_args() -> Vec<String> {
    vec!["--enable-source-maps".to_string(), "{artifact}".to_string()]
}

fn default_env_flag() -> String {
    crate::protocol::ENV_FLAG.to_string()
}

/// Formatter applied to corrected source, fed on stdin
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FormatConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_format_command")]
    pub command: String,

    #[serde(default = "default_format_args")]
    pub args: Vec<String>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_format_command(),
            args: default_format_args(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format_command() -> String {
    "prettier".to_string()
}

fn default_format_args() -> Vec<String> {
    vec!["--parser".to_string(), "typescript".to_string()]
}

/// Corrected file settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    /// Suffix appended to the file under test
    #[serde(default = "default_suffix")]
    pub suffix: String,

    #[serde(default)]
    pub strategy: PatchStrategy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            strategy: PatchStrategy::default(),
        }
    }
}

fn default_suffix() -> String {
    ".corrected".to_string()
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.output.suffix.is_empty() {
            return Err(Error::Config(
                "output.suffix must not be empty: the corrected file would overwrite the original"
                    .to_string(),
            ));
        }
        if self.build.command.trim().is_empty() || self.run.command.trim().is_empty() {
            return Err(Error::Config("build and run commands must be set".to_string()));
        }
        Ok(())
    }
}

/// Locate a configured tool
///
/// A command containing a path separator is used as given. A bare name is
/// looked up in `node_modules/.bin` of `near` and its ancestors first, then
/// on PATH.
pub fn resolve_tool(command: &str, near: &Path) -> Result<PathBuf> {
    let path = Path::new(command);
    if path.components().count() > 1 {
        return if path.exists() {
            Ok(path.to_path_buf())
        } else {
            Err(Error::ToolNotFound(command.to_string()))
        };
    }

    let local = near
        .ancestors()
        .map(|dir| dir.join("node_modules").join(".bin").join(command))
        .find(|candidate| candidate.is_file());
    if let Some(local) = local {
        return Ok(local);
    }

    which::which(command).map_err(|_| Error::ToolNotFound(command.to_string()))
}

/// Substitute `{name}` placeholders in an argument template
pub fn expand_args(template: &[String], vars: &[(&str, &Path)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (name, value)| {
                acc.replace(&format!("{{{name}}}"), &value.to_string_lossy())
            })
        })
        .collect()
}
