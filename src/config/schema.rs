//! Exporter configuration structure.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::path::resolve_path;
use crate::error::{DiaError, Result};
use crate::export::{DiagramExporter, DEFAULT_TIMEOUT};
use crate::platform::detect_profile;
use crate::source::{BookResolver, DiagramRef, SourceResolver};

/// Configuration for the exporter and CLI.
///
/// # Example TOML
///
/// ```toml
/// cache_dir = "~/.cache/diacache"
/// dia_path = "/opt/dia/bin/dia"
/// timeout_secs = 120
///
/// [books]
/// "" = "~/site"
/// "/docs" = "./books/docs"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Cache root. Defaults to the platform cache directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Export executable replacing the platform default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dia_path: Option<PathBuf>,

    /// Limit on a single dia run in seconds; `0` disables the limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Book prefix to root directory. `""` is the root book.
    pub books: BTreeMap<String, PathBuf>,
}

impl ExporterConfig {
    /// Check that every book key is a valid book prefix.
    pub fn validate(&self) -> Result<()> {
        for book in self.books.keys() {
            // A probe reference surfaces the prefix rules in one place.
            DiagramRef::new(book.as_str(), "/probe.dia").map_err(|e| {
                DiaError::ConfigParse(format!("Invalid book prefix '{book}': {e}"))
            })?;
        }
        Ok(())
    }

    /// Resolve `~` and relative paths against the config file directory.
    pub fn resolve_paths(&mut self, config_dir: &Path) -> Result<()> {
        if let Some(dir) = &self.cache_dir {
            self.cache_dir = Some(resolve_path(dir, config_dir)?);
        }
        if let Some(dia) = &self.dia_path {
            self.dia_path = Some(resolve_path(dia, config_dir)?);
        }
        for root in self.books.values_mut() {
            *root = resolve_path(root.as_path(), config_dir)?;
        }
        Ok(())
    }

    /// Effective dia timeout.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            None => Some(DEFAULT_TIMEOUT),
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }

    /// Effective cache root.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        dirs::cache_dir()
            .map(|d| d.join("diacache"))
            .ok_or_else(|| {
                DiaError::ConfigParse(
                    "Could not determine cache directory, set cache_dir".to_string(),
                )
            })
    }

    /// Resolver over the configured books.
    pub fn resolver(&self) -> BookResolver {
        self.books
            .iter()
            .fold(BookResolver::new(), |resolver, (book, root)| {
                resolver.with_book(book.as_str(), root.as_path())
            })
    }

    /// Exporter wired to this configuration and the host platform.
    pub fn exporter(&self) -> DiagramExporter {
        self.exporter_with(self.resolver())
    }

    /// Like [`exporter`](Self::exporter) with a caller-supplied resolver.
    pub fn exporter_with(&self, resolver: impl SourceResolver + 'static) -> DiagramExporter {
        debug!(
            dia_path = ?self.dia_path,
            books = self.books.len(),
            timeout = ?self.timeout(),
            "Building exporter from configuration"
        );
        DiagramExporter::new(resolver)
            .with_boxed_profile(detect_profile(self.dia_path.as_deref()))
            .with_timeout(self.timeout())
    }
}
