//! klass command-line tool
//!
//! - `klass selftest`: run the bundled suite through the test runner
//! - `klass bridge`: read status envelopes and turn them into an exit code

mod commands;
mod output;
mod suite;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "klass")]
#[command(about = "Metaobject protocol self-test and status bridge", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bundled self-test suite
    Selftest {
        /// Only run tests whose `Class#method` name contains this pattern
        #[arg(short, long)]
        filter: Vec<String>,
        /// Output format: default or json
        #[arg(long, default_value = "default")]
        reporter: String,
        /// Color output: auto, always, never
        #[arg(long, default_value = "auto")]
        color: String,
        /// Omit error cause chains from failure messages
        #[arg(long)]
        no_stack: bool,
    },

    /// Read status envelopes (one JSON object per line) and report them
    Bridge {
        /// Input file; standard input when omitted
        file: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Selftest {
            filter,
            reporter,
            color,
            no_stack,
        } => commands::selftest::execute(commands::selftest::SelftestArgs {
            filters: filter,
            reporter,
            color,
            show_stack: !no_stack,
        })?,

        Commands::Bridge { file } => commands::bridge::execute(file.as_deref())?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
