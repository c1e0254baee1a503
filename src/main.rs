//! expect-test - inline expect-test harness
//!
//! Runs a test file with instrumented assertions, compares what each
//! assertion observed against the literal written at its call-site, and
//! writes a corrected copy of the file where they differ.

use std::path::PathBuf;

use clap::Parser;
use expect_harness::common::logging;
use expect_harness::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "expect-test", about = "Self-updating inline expect tests")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    let code = match cli::dispatch(cli.command, cli.config.as_deref()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    };

    std::process::exit(code);
}
