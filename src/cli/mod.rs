//! CLI argument definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// diacache - Render Dia diagrams to PNG with an on-disk cache.
///
/// Robot Mode: Use --robot or --format=json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "diacache", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "DIACACHE_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only log errors)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (.toml, .yaml or .yml)
    #[arg(long, short = 'c', global = true, env = "DIACACHE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a diagram to PNG, reusing the cached file when fresh
    Export(ExportArgs),

    /// Print the cache file a diagram would be rendered to
    CachePath(ExportArgs),

    /// Open a diagram in the Dia editor
    Open(SourceArgs),

    /// Show the effective configuration
    Config,

    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

/// Which diagram to operate on.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Diagram path within its book, e.g. /diagrams/architecture.dia
    pub path: String,

    /// Book prefix, e.g. /docs (empty for the root book)
    #[arg(long, short = 'b', default_value = "")]
    pub book: String,

    /// Root directory of the book (defaults to the configured root, then the
    /// current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Target width in pixels
    #[arg(long, short = 'W', value_parser = clap::value_parser!(u32).range(1..))]
    pub width: Option<u32>,

    /// Target height in pixels
    #[arg(long, short = 'H', value_parser = clap::value_parser!(u32).range(1..))]
    pub height: Option<u32>,

    /// Cache root directory (overrides the configuration)
    #[arg(long, env = "DIACACHE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
