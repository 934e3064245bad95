//! Host platform profiles for the dia binary.
//!
//! dia reports failures differently per platform. On Windows the exit code is
//! reliable. Elsewhere dia (0.97.x) exits 0 even on failure and writes both
//! progress and errors to stderr, so success is recognised by finding its
//! `<input> --> <output>` line among unrelated noise such as
//! `Xlib:  extension "RANDR" missing on display ":0".`

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{DiaError, Result};
use crate::process::ProcessOutput;

pub const UNIX_DIA_PATH: &str = "/usr/bin/dia";
pub const WINDOWS_DIA_PATH: &str = r"C:\Program Files (x86)\Dia\bin\dia.exe";
pub const WINDOWS_DIAW_PATH: &str = r"C:\Program Files (x86)\Dia\bin\diaw.exe";

/// How to locate dia and judge whether a run succeeded on one platform.
pub trait PlatformProfile: Send + Sync + fmt::Debug {
    /// Short name for logs and `config` output.
    fn name(&self) -> &'static str;

    /// Executable used for headless export.
    fn export_executable(&self) -> &Path;

    /// Executable used to open a diagram interactively.
    fn open_executable(&self) -> &Path;

    /// Decide whether an export run succeeded.
    ///
    /// `expected_line` is the line dia prints on a successful export.
    fn validate_output(&self, tool: &Path, output: &ProcessOutput, expected_line: &str)
        -> Result<()>;
}

/// Line dia prints after exporting `input` to `output`.
pub fn success_line(input: &Path, output: &Path) -> String {
    format!("{} --> {}", input.display(), output.display())
}

fn check_exit_code(tool: &Path, output: &ProcessOutput) -> Result<()> {
    if output.exit_code != 0 {
        return Err(DiaError::Export {
            tool: tool.display().to_string(),
            detail: format!("non-zero exit value: {}", output.exit_code),
        });
    }
    Ok(())
}

/// Profile for Linux and other Unix hosts: stderr is authoritative.
#[derive(Debug, Clone)]
pub struct UnixProfile {
    dia: PathBuf,
}

impl Default for UnixProfile {
    fn default() -> Self {
        Self {
            dia: PathBuf::from(UNIX_DIA_PATH),
        }
    }
}

impl UnixProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `dia` for both export and open.
    pub fn with_executable(dia: impl Into<PathBuf>) -> Self {
        Self { dia: dia.into() }
    }
}

impl PlatformProfile for UnixProfile {
    fn name(&self) -> &'static str {
        "unix"
    }

    fn export_executable(&self) -> &Path {
        &self.dia
    }

    fn open_executable(&self) -> &Path {
        &self.dia
    }

    fn validate_output(
        &self,
        tool: &Path,
        output: &ProcessOutput,
        expected_line: &str,
    ) -> Result<()> {
        check_exit_code(tool, output)?;

        if output.stderr.lines().any(|line| line == expected_line) {
            trace!(expected_line, "Found dia success line");
            return Ok(());
        }

        debug!(stderr = %output.stderr, "dia success line missing from stderr");
        Err(DiaError::Export {
            tool: tool.display().to_string(),
            detail: output.stderr.clone(),
        })
    }
}

/// Profile for Windows hosts: exit code is authoritative.
#[derive(Debug, Clone)]
pub struct WindowsProfile {
    dia: PathBuf,
    diaw: PathBuf,
}

impl Default for WindowsProfile {
    fn default() -> Self {
        Self {
            dia: PathBuf::from(WINDOWS_DIA_PATH),
            diaw: PathBuf::from(WINDOWS_DIAW_PATH),
        }
    }
}

impl WindowsProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the export executable; the GUI launcher stays at its default.
    pub fn with_executable(dia: impl Into<PathBuf>) -> Self {
        Self {
            dia: dia.into(),
            ..Self::default()
        }
    }
}

impl PlatformProfile for WindowsProfile {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn export_executable(&self) -> &Path {
        &self.dia
    }

    fn open_executable(&self) -> &Path {
        &self.diaw
    }

    fn validate_output(
        &self,
        tool: &Path,
        output: &ProcessOutput,
        _expected_line: &str,
    ) -> Result<()> {
        check_exit_code(tool, output)
    }
}

/// True if an OS identifier names Windows.
pub fn is_windows_os(os: &str) -> bool {
    os.to_lowercase().contains("windows")
}

/// Select the profile for the current host.
///
/// `dia_override` replaces the export executable, e.g. from configuration.
pub fn detect_profile(dia_override: Option<&Path>) -> Box<dyn PlatformProfile> {
    let os = std::env::consts::OS;
    let profile: Box<dyn PlatformProfile> = match (is_windows_os(os), dia_override) {
        (true, Some(dia)) => Box::new(WindowsProfile::with_executable(dia)),
        (true, None) => Box::new(WindowsProfile::new()),
        (false, Some(dia)) => Box::new(UnixProfile::with_executable(dia)),
        (false, None) => Box::new(UnixProfile::new()),
    };
    debug!(
        os,
        profile = profile.name(),
        dia = %profile.export_executable().display(),
        "Selected platform profile"
    );
    profile
}
