//! Loading exporter configuration from YAML or TOML files.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, trace};

use super::schema::ExporterConfig;
use crate::error::{DiaError, Result};

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml).
    Yaml,
    /// TOML format (.toml).
    Toml,
}

impl ConfigFormat {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Default configuration file: `<config dir>/diacache/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("diacache").join("config.toml"))
}

/// Load a configuration file, resolving its relative paths.
///
/// # Errors
///
/// Returns an error if:
/// - The file does not exist or cannot be read
/// - The format cannot be detected from the extension
/// - The file content cannot be parsed or fails validation
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExporterConfig> {
    let path = path.as_ref();
    info!("Loading configuration file");

    let format = ConfigFormat::from_extension(path).ok_or_else(|| {
        DiaError::ConfigParse(format!(
            "Unknown config format for '{}': expected .yaml, .yml, or .toml",
            path.display()
        ))
    })?;
    debug!(format = ?format, "Detected config format");

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DiaError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            DiaError::Io(e)
        }
    })?;

    let mut config = load_config_from_str(&content, format)?;
    let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(config_dir)?;
    Ok(config)
}

/// Parse a configuration from a string with a specified format.
///
/// Relative paths are left as written.
#[instrument(skip(content), fields(format = ?format, content_len = content.len()))]
pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<ExporterConfig> {
    trace!("Parsing config content");

    let config: ExporterConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| DiaError::ConfigParse(format!("YAML: {e}")))?,
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| DiaError::ConfigParse(format!("TOML: {e}")))?
        }
    };

    config.validate()?;

    info!(
        books = config.books.len(),
        cache_dir = ?config.cache_dir,
        dia_path = ?config.dia_path,
        "Configuration loaded and validated"
    );
    Ok(config)
}

/// Load the effective configuration.
///
/// An explicit path must exist. Without one, the default file is used if
/// present, otherwise built-in defaults apply.
pub fn load_effective(explicit: Option<&Path>) -> Result<ExporterConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match default_config_path() {
        Some(path) if path.is_file() => load_config(path),
        _ => {
            debug!("No configuration file, using defaults");
            Ok(ExporterConfig::default())
        }
    }
}
