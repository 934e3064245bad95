//! Cache file naming and freshness.
//!
//! Cache paths look like
//! `<root>/diacache.DiagramExporter/<book segments>/<path without .dia>-<W|_>x<H|_>.png`
//! and are stable across runs so rendered PNGs survive restarts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::Result;
use crate::source::DiagramRef;

/// Directory under the cache root owned by the exporter.
pub const NAMESPACE: &str = "diacache.DiagramExporter";

/// Extension stripped from source paths, matched case-insensitively.
pub const DIA_EXTENSION: &str = ".dia";

/// Placeholder for an unconstrained dimension in cache file names.
const WILDCARD: &str = "_";

/// Strip a trailing `.dia` (any case) from a path.
pub fn strip_dia_extension(path: &str) -> &str {
    let split = path.len().saturating_sub(DIA_EXTENSION.len());
    match path.get(split..) {
        Some(ext) if ext.eq_ignore_ascii_case(DIA_EXTENSION) => &path[..split],
        _ => path,
    }
}

/// Value for dia's `--size` option, or `None` to render at native size.
pub fn size_spec(width: Option<u32>, height: Option<u32>) -> Option<String> {
    match (width, height) {
        (None, None) => None,
        (Some(w), None) => Some(format!("{w}x")),
        (None, Some(h)) => Some(format!("x{h}")),
        (Some(w), Some(h)) => Some(format!("{w}x{h}")),
    }
}

fn dimension(value: Option<u32>) -> String {
    value.map_or_else(|| WILDCARD.to_string(), |v| v.to_string())
}

/// Cache file for a diagram rendered at the requested size.
pub fn cache_path(
    cache_root: &Path,
    reference: &DiagramRef,
    width: Option<u32>,
    height: Option<u32>,
) -> PathBuf {
    let mut path = cache_root.join(NAMESPACE);
    for segment in reference.book_segments() {
        path.push(segment);
    }

    let name = format!(
        "{}-{}x{}.png",
        strip_dia_extension(reference.path()),
        dimension(width),
        dimension(height)
    );
    for segment in name.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }

    trace!(reference = %reference, cache_path = %path.display(), "Computed cache path");
    path
}

/// True if `artifact` exists and was modified strictly after `source`.
///
/// Equal timestamps count as stale.
pub fn is_fresh(source: &Path, artifact: &Path) -> Result<bool> {
    let artifact_modified = match fs::metadata(artifact) {
        Ok(meta) => meta.modified()?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let source_modified = fs::metadata(source)?.modified()?;
    Ok(artifact_modified > source_modified)
}
