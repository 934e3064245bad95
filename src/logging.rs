//! Structured logging initialization for the diacache CLI.
//!
//! Supports both human-friendly and machine-readable (JSON) output formats,
//! with TTY detection and verbosity control. Logs always go to stderr so the
//! export result on stdout stays parseable.

use std::io::{self, IsTerminal};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Pick the default filter directive for the given flags.
pub(crate) fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "diacache=error"
    } else {
        match verbose {
            0 => "diacache=info",
            1 => "diacache=debug",
            _ => "diacache=trace",
        }
    }
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogStyle {
    /// JSON lines, for robot mode.
    Json,
    /// Colored multi-field output on a terminal.
    Pretty,
    /// Plain single-line output when stderr is piped or redirected.
    Compact,
}

impl LogStyle {
    pub(crate) const fn select(robot_mode: bool, stderr_is_tty: bool) -> Self {
        match (robot_mode, stderr_is_tty) {
            (true, _) => Self::Json,
            (false, true) => Self::Pretty,
            (false, false) => Self::Compact,
        }
    }
}

/// Initialize the tracing subscriber based on CLI flags and environment.
///
/// * `robot_mode` - JSON lines for machine consumption
/// * `verbose` - 0 = info, 1 = debug, 2+ = trace
/// * `quiet` - errors only
///
/// `RUST_LOG` overrides the filter (e.g. "diacache=trace,image=warn").
pub fn init_logging(robot_mode: bool, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(io::stderr);
    let registry = tracing_subscriber::registry().with(filter);

    match LogStyle::select(robot_mode, io::stderr().is_terminal()) {
        LogStyle::Json => registry.with(layer.json().with_target(true)).init(),
        LogStyle::Pretty => registry.with(layer.with_target(false)).init(),
        LogStyle::Compact => registry
            .with(layer.with_ansi(false).with_target(false).compact())
            .init(),
    }
}
