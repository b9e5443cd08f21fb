use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a source file
    Run {
        /// Path to the source file
        file: PathBuf,
    },

    /// Check a source file for syntax errors
    Check {
        /// Path to the source file to check
        file: PathBuf,
    },

    /// Watch a source file and re-run it whenever it changes
    Watch {
        /// Path to the source file to watch
        file: PathBuf,
    },

    /// Start an interactive REPL session
    Repl,
}
