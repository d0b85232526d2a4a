use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal summary
    Terminal,
    /// Machine-readable JSON report
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "diffmap")]
#[command(about = "Statement-level differencing for Rust function bodies", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Diff the matching functions of two Rust source files
    Diff {
        /// The "before" source file
        before: PathBuf,

        /// The "after" source file
        after: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: OutputFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only diff the named function
        #[arg(long = "function")]
        function: Option<String>,

        /// Disable the fuzzy matching passes (common-substring and
        /// edit-distance)
        #[arg(long = "no-fuzzy")]
        no_fuzzy: bool,

        /// Configuration file
        #[arg(long, env = "DIFFMAP_CONFIG")]
        config: Option<PathBuf>,
    },
}
