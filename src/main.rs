//! diacache CLI - Render Dia diagrams to PNG with an on-disk cache.
//!
//! Provides both human-friendly and agent-friendly (robot mode) output.
#![forbid(unsafe_code)]

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use clap::Parser;
use console::style;
use serde::Serialize;
use tracing::debug;

use diacache::cli::{Cli, Commands, CompletionsArgs, ExportArgs, SourceArgs};
use diacache::config::{default_config_path, load_effective, ExporterConfig};
use diacache::error::{DiaError, Result};
use diacache::export::{DiagramExporter, ExportResult};
use diacache::logging::init_logging;
use diacache::source::DiagramRef;

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> &'static str {
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("false")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
    init_logging(cli.use_json(), cli.verbose, cli.quiet);

    if let Err(e) = run(&cli) {
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Export(args) => cmd_export(cli, args),
        Commands::CachePath(args) => cmd_cache_path(cli, args),
        Commands::Open(args) => cmd_open(cli, args),
        Commands::Config => cmd_config(cli),
        Commands::Version => cmd_version(cli),
        Commands::Completions(args) => cmd_completions(cli, args),
    }
}

// === Commands ===

/// JSON shape of a finished export.
#[derive(Serialize)]
struct ExportReport<'a> {
    reference: String,
    #[serde(flatten)]
    result: &'a ExportResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<DateTime<Utc>>,
}

fn cmd_export(cli: &Cli, args: &ExportArgs) -> Result<()> {
    let config = load_effective(cli.config.as_deref())?;
    let (exporter, reference) = exporter_for(&config, &args.source)?;
    let cache_root = cache_root(&config, args)?;

    let result = exporter.export(&reference, args.width, args.height, &cache_root)?;

    if cli.use_json() {
        let modified = std::fs::metadata(&result.artifact_path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        output_json(
            cli,
            &ExportReport {
                reference: reference.to_string(),
                result: &result,
                modified,
            },
        );
    } else {
        let status = if result.cache_hit {
            style("cached").cyan()
        } else {
            style("rendered").green()
        };
        println!("{} {}", status.bold(), reference);
        println!("  {} {}", style("png: ").dim(), result.artifact_path.display());
        println!("  {} {}x{}", style("size:").dim(), result.width, result.height);
    }
    Ok(())
}

fn cmd_cache_path(cli: &Cli, args: &ExportArgs) -> Result<()> {
    let config = load_effective(cli.config.as_deref())?;
    let reference = DiagramRef::new(args.source.book.as_str(), args.source.path.as_str())?;
    let cache_root = cache_root(&config, args)?;
    let path = diacache::export::cache_path(&cache_root, &reference, args.width, args.height);

    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "reference": reference.to_string(),
                "cache_path": path,
                "exists": path.is_file(),
            }),
        );
    } else {
        println!("{}", path.display());
    }
    Ok(())
}

fn cmd_open(cli: &Cli, args: &SourceArgs) -> Result<()> {
    let config = load_effective(cli.config.as_deref())?;
    let (exporter, reference) = exporter_for(&config, args)?;
    let source = exporter.open(&reference)?;

    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "opened": source,
                "editor": exporter.profile().open_executable(),
            }),
        );
    } else {
        println!("{} {}", style("opened").green().bold(), source.display());
    }
    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let config = load_effective(cli.config.as_deref())?;
    let exporter = config.exporter();
    let config_path = cli.config.clone().or_else(default_config_path);
    let cache_dir = config.cache_dir()?;
    let timeout_secs = exporter.timeout().map(|t| t.as_secs());

    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "config_path": config_path,
                "config_loaded": config_path.as_deref().is_some_and(Path::is_file),
                "platform": exporter.profile().name(),
                "dia": exporter.profile().export_executable(),
                "dia_open": exporter.profile().open_executable(),
                "cache_dir": cache_dir,
                "timeout_secs": timeout_secs,
                "books": config.books,
            }),
        );
    } else {
        let config_line = config_path.as_ref().map_or_else(
            || "none".to_string(),
            |p| {
                if p.is_file() {
                    p.display().to_string()
                } else {
                    format!("{} (not found, using defaults)", p.display())
                }
            },
        );
        println!("{} {config_line}", style("config:  ").bold());
        println!("{} {}", style("platform:").bold(), exporter.profile().name());
        println!(
            "{} {}",
            style("dia:     ").bold(),
            exporter.profile().export_executable().display()
        );
        println!("{} {}", style("cache:   ").bold(), cache_dir.display());
        println!(
            "{} {}",
            style("timeout: ").bold(),
            timeout_secs.map_or_else(|| "none".to_string(), |s| format!("{s}s"))
        );
        if config.books.is_empty() {
            println!("{} none", style("books:   ").bold());
        } else {
            println!("{}", style("books:").bold());
            for (book, root) in &config.books {
                let book = if book.is_empty() { "/" } else { book.as_str() };
                println!("  {book} -> {}", root.display());
            }
        }
    }
    Ok(())
}

fn cmd_version(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "version": build_info::VERSION,
                "git_sha": build_info::git_sha(),
                "git_dirty": build_info::git_dirty() == "true",
                "build_timestamp": build_info::build_timestamp(),
                "rustc_version": build_info::rustc_semver(),
                "target": build_info::target(),
            }),
        );
    } else {
        println!("diacache {}", build_info::VERSION);
        println!(
            "git: {}{}",
            build_info::git_sha(),
            if build_info::git_dirty() == "true" {
                " (dirty)"
            } else {
                ""
            }
        );
        println!("built: {}", build_info::build_timestamp());
        println!("rustc: {}", build_info::rustc_semver());
        println!("target: {}", build_info::target());
    }
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_completions(_cli: &Cli, args: &CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "diacache", &mut io::stdout());
    Ok(())
}

// === Utility Functions ===

/// Exporter whose resolver knows the requested book.
///
/// `--root` wins; otherwise the configured root is used, falling back to the
/// current directory for books the configuration does not list.
fn exporter_for(
    config: &ExporterConfig,
    source: &SourceArgs,
) -> Result<(DiagramExporter, DiagramRef)> {
    let reference = DiagramRef::new(source.book.as_str(), source.path.as_str())?;
    let mut resolver = config.resolver();

    match &source.root {
        Some(root) => resolver.insert(source.book.as_str(), root.as_path()),
        None if resolver.root(&source.book).is_none() => {
            let cwd = std::env::current_dir()?;
            debug!(book = %source.book, root = %cwd.display(), "Using current directory as book root");
            resolver.insert(source.book.as_str(), cwd);
        }
        None => {}
    }

    Ok((config.exporter_with(resolver), reference))
}

fn cache_root(config: &ExporterConfig, args: &ExportArgs) -> Result<std::path::PathBuf> {
    match &args.cache_dir {
        Some(dir) => Ok(dir.clone()),
        None => config.cache_dir(),
    }
}

fn output_json<T: Serialize>(cli: &Cli, data: &T) {
    let json = if cli.use_compact_json() {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(e) => output_error(cli, &DiaError::Other(format!("JSON serialization failed: {e}"))),
    }
}

fn output_error(cli: &Cli, error: &DiaError) {
    if cli.use_json() {
        let json = serde_json::json!({
            "error": true,
            "message": error.to_string(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        });
        eprintln!("{json:#}");
    } else {
        eprintln!("{}: {}", style("Error").red().bold(), error);
        if let Some(suggestion) = error.suggestion() {
            eprintln!("{}: {}", style("Hint").yellow(), suggestion);
        }
    }
}
