//! Diagram source references and their resolution to files on disk.
//!
//! A [`DiagramRef`] names a diagram by book prefix and book-relative path,
//! the same way pages address resources. A [`SourceResolver`] turns that
//! reference into a concrete file.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{DiaError, Result};

/// Reference to a diagram source within a book.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiagramRef {
    book_prefix: String,
    path: String,
}

impl DiagramRef {
    /// Create a reference.
    ///
    /// `book_prefix` is either empty (the root book) or a `/`-separated path
    /// starting with `/` and not ending with one. `path` must start with `/`.
    /// `.` and `..` segments are rejected in both.
    pub fn new(book_prefix: impl Into<String>, path: impl Into<String>) -> Result<Self> {
        let book_prefix = book_prefix.into();
        let path = path.into();

        if !book_prefix.is_empty() {
            if !book_prefix.starts_with('/') || book_prefix.ends_with('/') {
                return Err(DiaError::InvalidReference(format!(
                    "book prefix must start and not end with '/': {book_prefix}"
                )));
            }
            check_segments(&book_prefix)?;
        }
        if !path.starts_with('/') || path.len() == 1 {
            return Err(DiaError::InvalidReference(format!(
                "path must start with '/' and name a file: {path}"
            )));
        }
        check_segments(&path)?;

        Ok(Self { book_prefix, path })
    }

    /// Reference in the root book.
    pub fn root(path: impl Into<String>) -> Result<Self> {
        Self::new("", path)
    }

    pub fn book_prefix(&self) -> &str {
        &self.book_prefix
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Non-empty `/`-separated segments of the book prefix.
    pub fn book_segments(&self) -> impl Iterator<Item = &str> {
        self.book_prefix.split('/').filter(|s| !s.is_empty())
    }

    /// Non-empty `/`-separated segments of the path.
    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for DiagramRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.book_prefix, self.path)
    }
}

fn check_segments(value: &str) -> Result<()> {
    if value.split('/').any(|s| s == "." || s == "..") {
        return Err(DiaError::InvalidReference(format!(
            "relative segments are not allowed: {value}"
        )));
    }
    Ok(())
}

/// Resolves a diagram reference to the file holding its source.
pub trait SourceResolver: Send + Sync {
    /// Resolve `reference` to a file path.
    ///
    /// The returned path does not have to exist; the exporter checks that.
    fn resolve(&self, reference: &DiagramRef) -> Result<PathBuf>;
}

/// Resolver mapping book prefixes to root directories.
#[derive(Debug, Clone, Default)]
pub struct BookResolver {
    books: HashMap<String, PathBuf>,
}

impl BookResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the root directory of a book.
    pub fn with_book(mut self, book_prefix: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.insert(book_prefix, root);
        self
    }

    pub fn insert(&mut self, book_prefix: impl Into<String>, root: impl Into<PathBuf>) {
        let book_prefix = book_prefix.into();
        let root = root.into();
        debug!(book = %book_prefix, root = %root.display(), "Registered book root");
        self.books.insert(book_prefix, root);
    }

    /// Root directory of a book, if registered.
    pub fn root(&self, book_prefix: &str) -> Option<&Path> {
        self.books.get(book_prefix).map(PathBuf::as_path)
    }
}

impl SourceResolver for BookResolver {
    fn resolve(&self, reference: &DiagramRef) -> Result<PathBuf> {
        let root = self
            .root(reference.book_prefix())
            .ok_or_else(|| DiaError::BookNotFound {
                book: if reference.book_prefix().is_empty() {
                    "/".to_string()
                } else {
                    reference.book_prefix().to_string()
                },
            })?;

        let resolved = reference
            .path_segments()
            .fold(root.to_path_buf(), |acc, seg| acc.join(seg));
        trace!(reference = %reference, resolved = %resolved.display(), "Resolved diagram source");
        Ok(resolved)
    }
}
