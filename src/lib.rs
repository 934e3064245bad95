//! diacache - Render Dia diagrams to PNG through the `dia` binary, with an
//! on-disk cache keyed by source path and requested size.
//!
//! # Modules
//!
//! - `export`: The exporter, cache naming and freshness checks
//! - `element`: Immutable diagram element placed on a page
//! - `source`: Diagram references and their resolution to files
//! - `platform`: Per-platform dia locations and output validation
//! - `process`: Blocking external process execution with timeouts
//! - `image_ops`: PNG header probing
//! - `config`: Configuration file handling
//! - `error`: Error types with user-recoverable hints
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use diacache::export::DiagramExporter;
//! use diacache::source::{BookResolver, DiagramRef};
//!
//! let resolver = BookResolver::new().with_book("/docs", "/srv/books/docs");
//! let exporter = DiagramExporter::new(resolver);
//! let reference = DiagramRef::new("/docs", "/diagrams/architecture.dia")?;
//! let png = exporter.export(&reference, Some(300), None, Path::new("/tmp/cache"))?;
//! println!("{} {}x{}", png.artifact_path.display(), png.width, png.height);
//! # Ok::<(), diacache::error::DiaError>(())
//! ```
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod element;
pub mod error;
pub mod export;
pub mod image_ops;
pub mod logging;
pub mod platform;
pub mod process;
pub mod source;
