//! Rendering Dia diagrams to cached PNG files.
//!
//! [`DiagramExporter::export`] resolves a diagram reference, reuses the cached
//! PNG when it is newer than the source, and otherwise runs dia to render it.
//! Renders go to a temporary sibling file that only replaces the cache entry
//! once dia reported success and the PNG header could be read, so a failed or
//! interrupted run never leaves a broken cache entry behind.

pub mod cache;
mod lock;

pub use cache::{cache_path, is_fresh, size_spec, strip_dia_extension, DIA_EXTENSION, NAMESPACE};
pub use lock::KeyLocks;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::PoisonError;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::element::DiagramElement;
use crate::error::{DiaError, Result};
use crate::image_ops::probe_size;
use crate::platform::{detect_profile, success_line, PlatformProfile};
use crate::process::{ProcessRunner, SystemRunner};
use crate::source::{DiagramRef, SourceResolver};

/// Default limit on a single dia run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A rendered diagram in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportResult {
    /// Absolute path of the PNG. Valid as long as the cache entry is.
    pub artifact_path: PathBuf,
    /// Measured width, which may differ from the requested one.
    pub width: u32,
    /// Measured height, which may differ from the requested one.
    pub height: u32,
    /// True if the cached PNG was reused without running dia.
    pub cache_hit: bool,
}

/// Arguments for a headless dia export.
///
/// The input file is always last.
pub fn export_args(output: &Path, input: &Path, size: Option<&str>) -> Vec<String> {
    let mut args = vec![
        format!("--export={}", output.display()),
        "--filter=png".to_string(),
    ];
    if let Some(size) = size {
        args.push(format!("--size={size}"));
    }
    args.push("--log-to-stderr".to_string());
    args.push(input.display().to_string());
    args
}

fn temp_sibling(artifact: &Path) -> PathBuf {
    let name = artifact
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    artifact.with_file_name(format!("{name}.{}.tmp.png", Uuid::new_v4().simple()))
}

fn remove_if_present(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed temporary render"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove temporary render"),
    }
}

/// Renders diagrams through dia and caches the PNGs on disk.
///
/// Safe to share between threads; concurrent exports of the same cache entry
/// are serialised.
pub struct DiagramExporter {
    resolver: Box<dyn SourceResolver>,
    profile: Box<dyn PlatformProfile>,
    runner: Box<dyn ProcessRunner>,
    timeout: Option<Duration>,
    locks: KeyLocks,
}

impl std::fmt::Debug for DiagramExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramExporter")
            .field("profile", &self.profile)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DiagramExporter {
    /// Exporter for the current host using the system dia binary.
    pub fn new(resolver: impl SourceResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            profile: detect_profile(None),
            runner: Box::new(SystemRunner::new()),
            timeout: Some(DEFAULT_TIMEOUT),
            locks: KeyLocks::new(),
        }
    }

    pub fn with_profile(mut self, profile: impl PlatformProfile + 'static) -> Self {
        self.profile = Box::new(profile);
        self
    }

    pub fn with_boxed_profile(mut self, profile: Box<dyn PlatformProfile>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_runner(mut self, runner: impl ProcessRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    /// Limit on a single dia run; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn profile(&self) -> &dyn PlatformProfile {
        self.profile.as_ref()
    }

    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Cache file for `reference` at the requested size, without exporting.
    pub fn cache_path(
        &self,
        reference: &DiagramRef,
        width: Option<u32>,
        height: Option<u32>,
        cache_root: &Path,
    ) -> PathBuf {
        cache_path(cache_root, reference, width, height)
    }

    /// Render `reference` to PNG, reusing the cached file when fresh.
    ///
    /// # Errors
    ///
    /// - [`DiaError::NotFound`] if the source file does not exist
    /// - [`DiaError::Export`] if dia cannot be started or reports failure
    /// - [`DiaError::Timeout`] if dia runs past the configured timeout
    /// - [`DiaError::Io`] / [`DiaError::ImageProbe`] for filesystem failures
    #[instrument(skip_all, fields(reference = %reference, ?width, ?height))]
    pub fn export(
        &self,
        reference: &DiagramRef,
        width: Option<u32>,
        height: Option<u32>,
        cache_root: &Path,
    ) -> Result<ExportResult> {
        let source = self.resolver.resolve(reference)?;
        if !source.is_file() {
            return Err(DiaError::NotFound {
                path: source.display().to_string(),
            });
        }
        let source = fs::canonicalize(&source)?;

        let artifact = cache_path(cache_root, reference, width, height);
        let (Some(parent), Some(file_name)) = (artifact.parent(), artifact.file_name()) else {
            return Err(DiaError::InvalidReference(format!(
                "{reference} has no cache file name under {}",
                cache_root.display()
            )));
        };
        fs::create_dir_all(parent)?;
        let artifact = fs::canonicalize(parent)?.join(file_name);

        let lock = self.locks.lock_for(&artifact);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if is_fresh(&source, &artifact)? {
            let (width, height) = probe_size(&artifact)?;
            debug!(artifact = %artifact.display(), width, height, "Cache hit");
            return Ok(ExportResult {
                artifact_path: artifact,
                width,
                height,
                cache_hit: true,
            });
        }

        debug!(artifact = %artifact.display(), "Cache miss or stale entry");
        let (width, height) = self.render(&source, &artifact, size_spec(width, height))?;
        Ok(ExportResult {
            artifact_path: artifact,
            width,
            height,
            cache_hit: false,
        })
    }

    /// Export the diagram an element points at.
    ///
    /// `current_book` is used when the element names no book.
    pub fn export_element(
        &self,
        element: &DiagramElement,
        current_book: &str,
        cache_root: &Path,
    ) -> Result<ExportResult> {
        let reference = element.diagram_ref(current_book)?;
        let (width, height) = element.size();
        self.export(&reference, width, height, cache_root)
    }

    fn render(&self, source: &Path, artifact: &Path, size: Option<String>) -> Result<(u32, u32)> {
        let tool = self.profile.export_executable();
        let staging = temp_sibling(artifact);
        let args = export_args(&staging, source, size.as_deref());
        info!(
            tool = %tool.display(),
            source = %source.display(),
            size = size.as_deref().unwrap_or("native"),
            "Rendering diagram"
        );

        let result = self
            .runner
            .run(tool, &args, self.timeout)
            .and_then(|output| {
                self.profile
                    .validate_output(tool, &output, &success_line(source, &staging))
            })
            .and_then(|()| probe_size(&staging))
            .and_then(|dims| {
                fs::rename(&staging, artifact)?;
                Ok(dims)
            });

        match &result {
            Ok((width, height)) => {
                debug!(artifact = %artifact.display(), width, height, "Rendered diagram");
            }
            Err(e) => {
                warn!(source = %source.display(), error = %e, "Diagram render failed");
                remove_if_present(&staging);
            }
        }
        result
    }

    /// Open a diagram in the interactive editor without waiting for it.
    ///
    /// Returns the source file that was opened.
    pub fn open(&self, reference: &DiagramRef) -> Result<PathBuf> {
        let source = self.resolver.resolve(reference)?;
        if !source.is_file() {
            return Err(DiaError::NotFound {
                path: source.display().to_string(),
            });
        }
        let source = fs::canonicalize(&source)?;
        let editor = self.profile.open_executable();
        info!(editor = %editor.display(), source = %source.display(), "Opening diagram");
        self.runner
            .spawn(editor, &[source.display().to_string()])?;
        Ok(source)
    }
}
