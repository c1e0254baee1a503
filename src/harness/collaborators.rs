//! External collaborators: build, execute, format
//!
//! The orchestrator only sees these traits. The command-backed
//! implementations drive the tools named in [`crate::common::config`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::common::config::{expand_args, resolve_tool, BuildConfig, FormatConfig, RunConfig};
use crate::common::{Error, Result};

/// Errors reported by a build; empty means success
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub errors: Vec<String>,
}

/// Everything a finished test program run produced that the harness keeps
#[derive(Debug, Clone)]
pub struct Execution {
    /// Complete stdout, one entry per line
    pub stdout: Vec<String>,
    pub exit_code: i32,
}

/// Turns the file under test into a runnable artifact
#[async_trait]
pub trait Builder: Send + Sync {
    async fn build(&self, entry: &Path, out: &Path) -> Result<BuildReport>;
}

/// Runs an artifact with instrumentation enabled
///
/// Implementations buffer stdout until exit and forward stderr as it arrives.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, artifact: &Path) -> Result<Execution>;
}

/// Formats corrected source text
#[async_trait]
pub trait Formatter: Send + Sync {
    async fn format(&self, source: &str, file: &Path) -> Result<String>;
}

#[async_trait]
impl<T: Formatter + ?Sized> Formatter for Box<T> {
    async fn format(&self, source: &str, file: &Path) -> Result<String> {
        (**self).format(source, file).await
    }
}

fn tool_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Build by invoking a bundler command
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandBuilder {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }

    pub fn from_config(config: &BuildConfig, near: &Path) -> Result<Self> {
        Ok(Self::new(resolve_tool(&config.command, near)?, config.args.clone()))
    }
}

#[async_trait]
impl Builder for CommandBuilder {
    async fn build(&self, entry: &Path, out: &Path) -> Result<BuildReport> {
        let args = expand_args(&self.args, &[("entry", entry), ("out", out)]);
        tracing::debug!(program = %self.program.display(), ?args, "Building");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::tool_failed(&tool_name(&self.program), e.to_string()))?;

        if output.status.success() {
            return Ok(BuildReport::default());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut errors: Vec<String> = stderr
            .lines()
            .chain(stdout.lines())
            .filter(|l| !l.trim().is_empty())
            .map(String::from)
            .collect();
        if errors.is_empty() {
            errors.push(format!("{} exited with {}", tool_name(&self.program), output.status));
        }
        Ok(BuildReport { errors })
    }
}

/// Decode one stdout line; invalid UTF-8 is replaced, not rejected
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Execute an artifact through a runtime command
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: PathBuf,
    args: Vec<String>,
    env_flag: String,
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(program: PathBuf, args: Vec<String>, env_flag: String) -> Self {
        Self {
            program,
            args,
            env_flag,
            timeout: None,
        }
    }

    /// Kill the test program after `limit`
    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    pub fn from_config(config: &RunConfig, near: &Path) -> Result<Self> {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        Ok(Self::new(
            resolve_tool(&config.command, near)?,
            config.args.clone(),
            config.env_flag.clone(),
        )
        .with_timeout(timeout))
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(&self, artifact: &Path) -> Result<Execution> {
        let args = expand_args(&self.args, &[("artifact", artifact)]);
        tracing::debug!(program = %self.program.display(), ?args, "Running test program");

        let mut child = Command::new(&self.program)
            .args(&args)
            .env(&self.env_flag, "true")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            // Passed straight through, byte for byte, as it is written
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::tool_failed(&tool_name(&self.program), e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("Failed to get test program stdout".to_string()))?;

        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).split(b'\n');
            let mut buffered = Vec::new();
            while let Some(line) = lines.next_segment().await? {
                buffered.push(decode_line(&line));
            }
            Ok::<_, std::io::Error>(buffered)
        });

        let status = match self.timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, child.wait()).await;
                match waited {
                    Ok(status) => status?,
                    Err(_) => {
                        tracing::warn!(timeout_secs = limit.as_secs(), "Test program timed out, killing it");
                        child.kill().await?;
                        return Err(Error::Timeout(limit.as_secs()));
                    }
                }
            }
            None => child.wait().await?,
        };

        let stdout = stdout_task
            .await
            .map_err(|e| Error::Internal(format!("stdout reader failed: {e}")))??;

        // Killed by a signal: no code to propagate, report as a failure.
        let exit_code = status.code().unwrap_or(1);
        tracing::debug!(exit_code, lines = stdout.len(), "Test program exited");

        Ok(Execution { stdout, exit_code })
    }
}

/// Format by piping source through a formatter command
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandFormatter {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }

    pub fn from_config(config: &FormatConfig, near: &Path) -> Result<Self> {
        Ok(Self::new(resolve_tool(&config.command, near)?, config.args.clone()))
    }
}

#[async_trait]
impl Formatter for CommandFormatter {
    async fn format(&self, source: &str, file: &Path) -> Result<String> {
        let args = expand_args(&self.args, &[("file", file)]);
        let name = tool_name(&self.program);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::tool_failed(&name, e.to_string()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Internal("Failed to get formatter stdin".to_string()))?;
        let input = source.to_string();
        let writer = tokio::spawn(async move {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await
        });

        let output = child.wait_with_output().await?;
        writer
            .await
            .map_err(|e| Error::Internal(format!("formatter writer failed: {e}")))??;

        if !output.status.success() {
            return Err(Error::tool_failed(
                &name,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        String::from_utf8(output.stdout)
            .map_err(|e| Error::tool_failed(&name, format!("output is not UTF-8: {e}")))
    }
}

/// Leaves source untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFormatter;

#[async_trait]
impl Formatter for NoopFormatter {
    async fn format(&self, source: &str, _file: &Path) -> Result<String> {
        Ok(source.to_string())
    }
}
