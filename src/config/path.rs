//! Path resolution helpers for configuration files.
//!
//! Supports absolute paths, paths relative to the config file, and "~" home
//! directory expansion.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{DiaError, Result};

/// Resolve a path from a config file.
///
/// Resolution rules:
/// 1. Paths starting with `~`: expanded to home directory
/// 2. Absolute paths: used as-is
/// 3. Relative paths: resolved relative to the config file's directory
pub fn resolve_path(path: &Path, config_dir: &Path) -> Result<PathBuf> {
    trace!(
        path = %path.display(),
        config_dir = %config_dir.display(),
        "Resolving path"
    );

    let path_str = path.to_string_lossy();

    if path_str == "~" || path_str.starts_with("~/") {
        let home = home_dir()?;
        let resolved = match path_str.strip_prefix("~/") {
            Some(rest) if !rest.is_empty() => home.join(rest),
            _ => home,
        };
        debug!(
            original = %path.display(),
            resolved = %resolved.display(),
            "Expanded home directory path"
        );
        return Ok(resolved);
    }

    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let resolved = config_dir.join(path);
    debug!(
        original = %path.display(),
        resolved = %resolved.display(),
        "Resolved relative path"
    );
    Ok(resolved)
}

/// Resolve the user's home directory (cross-platform).
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| DiaError::ConfigParse("Could not determine home directory".to_string()))
}
