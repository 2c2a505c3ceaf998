//! Course content tree and OLX export.
//!
//! This crate holds the strongly-typed course tree produced at the end of a
//! generation session and everything needed to turn it into an importable
//! course archive.
//!
//! # Types
//!
//! - [`Identifier`] - Stable node handle, used as `url_name` and file stem
//! - [`Component`] - Leaf content unit (HTML block or problem)
//! - [`Vertical`], [`Sequential`], [`Chapter`], [`Course`] - Container nodes
//! - [`OutlineRecord`], [`ChapterRecord`] - Loosely-shaped generation records
//! - [`RenderedFiles`] - Ordered map from relative path to file content
//!
//! # Operations
//!
//! - [`build_course`] - Convert an outline record into a [`Course`] tree
//! - [`Course::render`] - Render the whole tree to OLX files
//! - [`Exporter`] - Stage the rendered files and package them as `.tar.gz`
//! - [`CourseSummary`] - Metadata about a finished export
//!
//! # Example
//!
//! ```rust
//! use coursegen_olx::{build_course, ChapterRecord, CourseOptions, OutlineRecord};
//!
//! let outline = OutlineRecord::new(
//!     "Rust course of Ana",
//!     vec![ChapterRecord::stub("Chapter 1: Ownership", "Moves and borrows")],
//! );
//!
//! let course = build_course(&outline, &CourseOptions::default()).unwrap();
//! assert_eq!(course.slug(), "rust_course_of_ana");
//!
//! let files = course.render().unwrap();
//! assert!(files.contains("course.xml"));
//! ```

mod builder;
mod component;
mod container;
mod course;
pub mod export;
mod identifier;
mod record;
mod summary;
mod xml;

pub use builder::build_course;
pub use component::{Component, ComponentKind};
pub use container::{Chapter, RenderedFiles, Sequential, Vertical};
pub use course::{Course, CourseOptions, CoursePolicy, DiscussionTopic, PolicyTab};
pub use export::{ExportOutcome, Exporter};
pub use identifier::Identifier;
pub use record::{ChapterRecord, OutlineRecord, SequentialRecord, VerticalRecord};
pub use summary::CourseSummary;
pub use xml::escape_xml;

use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while building, rendering, or exporting a course.
#[derive(Debug, Error)]
pub enum OlxError {
    /// A required key was missing from a generation record.
    ///
    /// This is an upstream contract violation, never defaulted.
    #[error("missing required field '{field}' in {record}")]
    MissingField {
        /// Which record was malformed (e.g. `outline`, `chapter 3`).
        record: String,
        /// The missing key.
        field: String,
    },

    /// Two nodes in one tree carry the same identifier.
    #[error("duplicate identifier in course tree: {0}")]
    DuplicateIdentifier(String),

    /// Two rendered files map to the same relative path.
    #[error("duplicate output path: {0}")]
    DuplicatePath(String),

    /// A string cannot be used as a node identifier.
    #[error("invalid identifier '{0}': only letters, digits, '_' and '-' are allowed")]
    InvalidIdentifier(String),

    /// Failed to stage or package the archive.
    #[error("export to '{path}' failed: {message}")]
    Export {
        /// Path involved in the failure.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Failed to serialize policy or summary JSON.
    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read or write files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OlxError {
    /// Creates a new `MissingField` error.
    #[must_use]
    pub fn missing_field(record: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            record: record.into(),
            field: field.into(),
        }
    }

    /// Creates a new `Export` error.
    #[must_use]
    pub fn export(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Export {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for OLX operations.
pub type Result<T> = std::result::Result<T, OlxError>;
