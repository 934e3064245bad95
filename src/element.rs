//! The diagram element placed on a page.
//!
//! Elements are assembled with [`DiagramElementBuilder`] and are immutable
//! once built.

use serde::Serialize;
use tracing::trace;

use crate::error::{DiaError, Result};
use crate::export::DIA_EXTENSION;
use crate::source::DiagramRef;

/// A Dia diagram embedded in a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagramElement {
    id: Option<String>,
    label: Option<String>,
    domain: Option<String>,
    book: Option<String>,
    path: Option<String>,
    width: u32,
    height: u32,
}

impl DiagramElement {
    /// Prefix for generated element ids.
    pub const ID_PREFIX: &'static str = "dia";

    pub fn builder() -> DiagramElementBuilder {
        DiagramElementBuilder::default()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Display label.
    ///
    /// Falls back to the file name of `path` without its `.dia` extension.
    ///
    /// # Errors
    ///
    /// [`DiaError::InvalidElement`] if neither label nor path is set, or the
    /// derived file name is empty.
    pub fn label(&self) -> Result<&str> {
        if let Some(label) = &self.label {
            return Ok(label);
        }
        let path = self.path.as_deref().ok_or_else(|| {
            DiaError::InvalidElement("Cannot get label, neither label nor path set".to_string())
        })?;

        let filename = path.rsplit('/').next().unwrap_or(path);
        let filename = filename.strip_suffix(DIA_EXTENSION).unwrap_or(filename);
        if filename.is_empty() {
            return Err(DiaError::InvalidElement(format!(
                "Invalid filename for diagram: {path}"
            )));
        }
        trace!(path, label = filename, "Derived label from path");
        Ok(filename)
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn book(&self) -> Option<&str> {
        self.book.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Requested width, `0` when unconstrained.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Requested height, `0` when unconstrained.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Requested size for export, with `0` mapped to unconstrained.
    pub fn size(&self) -> (Option<u32>, Option<u32>) {
        let nonzero = |v: u32| (v != 0).then_some(v);
        (nonzero(self.width), nonzero(self.height))
    }

    /// Reference to the diagram source.
    ///
    /// `current_book` is used when the element names no book.
    pub fn diagram_ref(&self, current_book: &str) -> Result<DiagramRef> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| DiaError::InvalidElement("Diagram path not set".to_string()))?;
        DiagramRef::new(self.book.as_deref().unwrap_or(current_book), path)
    }
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    Some(value.into()).filter(|v| !v.is_empty())
}

/// Mutable stage of a [`DiagramElement`].
///
/// Empty strings are stored as unset.
#[derive(Debug, Clone, Default)]
pub struct DiagramElementBuilder {
    element: DiagramElement,
}

impl DiagramElementBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.element.id = non_empty(id);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.element.label = non_empty(label);
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.element.domain = non_empty(domain);
        self
    }

    pub fn book(mut self, book: impl Into<String>) -> Self {
        self.element.book = non_empty(book);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.element.path = non_empty(path);
        self
    }

    pub const fn width(mut self, width: u32) -> Self {
        self.element.width = width;
        self
    }

    pub const fn height(mut self, height: u32) -> Self {
        self.element.height = height;
        self
    }

    /// Freeze into an immutable element.
    pub fn build(self) -> DiagramElement {
        self.element
    }
}
