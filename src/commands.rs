//! CLI command definitions
//!
//! Defines the clap commands for the expect-test CLI.

use clap::Subcommand;
use std::path::PathBuf;

use crate::patch::PatchStrategy;

#[derive(Subcommand)]
pub enum Commands {
    /// Run test files and write corrected copies where assertions changed
    Run {
        /// Files under test
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// How call-sites are located in source (default from config: structural)
        #[arg(long, value_enum)]
        strategy: Option<PatchStrategy>,

        /// Suffix for the corrected file (default from config: .corrected)
        #[arg(long)]
        suffix: Option<String>,

        /// Skip the formatter pass on corrected output
        #[arg(long)]
        no_format: bool,

        /// Kill the test program after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Report mismatches without writing corrected files
        #[arg(long)]
        dry_run: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the TypeScript instrumentation helper
    Runtime,

    /// Show the configuration file location and effective settings
    Config,
}
