//! CLI command handling
//!
//! Dispatches CLI commands and formats output. Results go to stdout,
//! diagnostics to stderr through tracing.

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{paths, Error, Result};
use crate::harness::{self, RunOptions, RunOutcome};

/// TypeScript side of the marker protocol
pub const RUNTIME_SOURCE: &str = include_str!("../../runtime/expecttest.ts");

/// Per-file entry of the `--json` report
#[derive(Debug, Serialize)]
struct FileReport {
    file: PathBuf,
    exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<RunOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Dispatch a CLI command, returning the process exit code
pub async fn dispatch(command: Commands, config_path: Option<&Path>) -> Result<i32> {
    match command {
        Commands::Run {
            files,
            strategy,
            suffix,
            no_format,
            timeout,
            dry_run,
            json,
        } => {
            let mut config = load_config(config_path)?;
            if no_format {
                config.format.enabled = false;
            }
            if let Some(secs) = timeout {
                config.run.timeout_secs = secs;
            }
            let suffix = suffix.unwrap_or_else(|| config.output.suffix.clone());
            if suffix.is_empty() {
                return Err(Error::Config("--suffix must not be empty".to_string()));
            }
            let options = RunOptions {
                strategy: strategy.unwrap_or(config.output.strategy),
                suffix,
                dry_run,
            };

            let mut exit_code = 0;
            let mut reports = Vec::new();
            for file in files {
                let report = run_file(&config, options.clone(), &file).await;
                if exit_code == 0 {
                    exit_code = report.exit_code;
                }
                if json {
                    reports.push(report);
                } else {
                    print_report(&report);
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            }
            Ok(exit_code)
        }

        Commands::Runtime => {
            print!("{RUNTIME_SOURCE}");
            Ok(0)
        }

        Commands::Config => {
            match config_path.map(Path::to_path_buf).or_else(paths::config_path) {
                Some(path) if path.exists() => println!("Config file: {}", path.display()),
                Some(path) => println!("Config file: {} (not present, using defaults)", path.display()),
                None => println!("Config file: none (no config directory on this platform)"),
            }
            let config = load_config(config_path)?;
            let rendered =
                toml::to_string_pretty(&config).map_err(|e| Error::Internal(e.to_string()))?;
            println!("\n{rendered}");
            Ok(0)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Run one file; harness errors are folded into the report
async fn run_file(config: &Config, options: RunOptions, file: &Path) -> FileReport {
    let near = paths::resolve(file)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let result = match harness::from_config(config, options, &near) {
        Ok(orchestrator) => orchestrator.run(file).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => FileReport {
            file: file.to_path_buf(),
            exit_code: outcome.exit_code(),
            outcome: Some(outcome),
            error: None,
        },
        Err(e) => {
            tracing::debug!(file = %file.display(), error = ?e, "Harness error");
            FileReport {
                file: file.to_path_buf(),
                exit_code: e.exit_code(),
                outcome: None,
                error: Some(e.to_string()),
            }
        }
    }
}

fn print_report(report: &FileReport) {
    let name = report.file.display().to_string();

    if let Some(error) = &report.error {
        eprintln!("{} {}: {}", "✗".red(), name.bold(), error);
        return;
    }

    match &report.outcome {
        Some(RunOutcome::Clean { assertions }) => {
            println!("{} {} ({} assertions match)", "✓".green(), name.bold(), assertions);
        }
        Some(RunOutcome::Mismatched { mismatches }) => {
            println!("{} {}: {} mismatches", "~".yellow(), name.bold(), mismatches.len());
            for mismatch in mismatches {
                println!("  {}", mismatch.call_site.to_string().dimmed());
                println!("    {} {:?}", "expected:".red(), mismatch.expected);
                println!("    {} {:?}", "actual:  ".green(), mismatch.actual);
            }
        }
        Some(RunOutcome::Corrected {
            path,
            mismatches,
            superseded,
        }) => {
            println!(
                "{} {}: found diff in {} assertions, wrote {}",
                "~".yellow(),
                name.bold(),
                mismatches.len(),
                path.display()
            );
            for site in superseded {
                println!(
                    "  {} {} ran with several values; kept the last",
                    "!".yellow(),
                    site.to_string().dimmed()
                );
            }
        }
        Some(RunOutcome::ChildFailed { code }) => {
            eprintln!(
                "{} {}: test program exited with code {}",
                "✗".red(),
                name.bold(),
                code
            );
        }
        None => {}
    }
}
