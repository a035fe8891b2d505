use clap::{Args, Parser, Subcommand};
use mintset::EmptyPagesPolicy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mintset")]
#[command(about = "Build printable maths practice sets from past-paper PDFs")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for settings otherwise read from `MINTSET_*` variables.
#[derive(Args)]
pub struct GlobalArgs {
    /// Base directory for relative source paths
    #[arg(long, global = true)]
    pub document_root: Option<PathBuf>,

    /// Directory for downloaded source PDFs
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Per-attempt download timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// What an empty page list selects: "whole" or "none"
    #[arg(long, global = true)]
    pub empty_pages: Option<EmptyPagesPolicy>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assemble a practice set from a JSON list of selection records
    Build {
        /// JSON array of records
        #[arg(long)]
        records: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Leave out solution pages
        #[arg(long)]
        no_solutions: bool,
    },

    /// Sample questions from a question bank and assemble them
    Generate {
        /// JSON array of question bank rows
        #[arg(long)]
        bank: PathBuf,

        /// Number of questions
        #[arg(short, long = "count", default_value = "5")]
        n: usize,

        /// Only questions from this year
        #[arg(long)]
        year: Option<String>,

        /// Only questions from this paper (e.g. P1)
        #[arg(long)]
        paper: Option<String>,

        /// Only questions on this topic
        #[arg(long)]
        topic: Option<String>,

        /// Seed for a reproducible draw
        #[arg(long)]
        seed: Option<u64>,

        /// File recording questions already used; they are avoided until exhausted
        #[arg(long)]
        history: Option<PathBuf>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Leave out solution pages
        #[arg(long)]
        no_solutions: bool,
    },

    /// Print the zero-based page indices a page specification selects
    Pages {
        /// Page specification (e.g. "2-4,6")
        spec: String,
    },

    /// Resolve every source and report pages without building
    Check {
        /// JSON array of records
        #[arg(long)]
        records: PathBuf,

        /// Leave out solution sources
        #[arg(long)]
        no_solutions: bool,
    },

    /// Show cache location and usage
    Cache,

    /// Run as MCP server
    Mcp,
}
