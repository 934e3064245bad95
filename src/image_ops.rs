//! Image header probing.

use std::path::Path;

use tracing::trace;

use crate::error::{DiaError, Result};

/// Read the pixel dimensions of an image from its header.
///
/// Only the header is decoded, so this stays cheap for large renders.
///
/// # Errors
///
/// Returns [`DiaError::ImageProbe`] if the file is missing, unreadable, or not
/// a recognised image format.
pub fn probe_size(path: &Path) -> Result<(u32, u32)> {
    let (width, height) = image::image_dimensions(path).map_err(|e| DiaError::ImageProbe {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    trace!(path = %path.display(), width, height, "Probed image size");
    Ok((width, height))
}
