//! Staging and packaging of a rendered course.
//!
//! Export is a two-step process: every rendered file is written below a
//! staging directory named `{slug}-{run}`, then that directory is packed into
//! `{slug}-{run}.tar.gz` next to it. The archive is only created once the
//! whole tree has been staged.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{Course, OlxError, Result};

/// Paths produced by a successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Directory holding the staged OLX tree.
    pub staging_dir: PathBuf,
    /// The packaged `.tar.gz` archive.
    pub archive_path: PathBuf,
    /// Number of files in the staged tree.
    pub file_count: usize,
}

/// Writes courses below one output directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
}

impl Exporter {
    /// Creates an exporter rooted at `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Returns the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Stages and packages a course.
    ///
    /// Any staging directory left by an earlier export of the same
    /// `{slug}-{run}` is removed first, so repeated exports produce the
    /// same file set.
    ///
    /// # Errors
    ///
    /// Returns an error if identifiers collide, a path cannot be written, or
    /// the archive cannot be created. Nothing is packaged after a failure.
    pub fn export(&self, course: &Course) -> Result<ExportOutcome> {
        course.validate_identifiers()?;
        let files = course.render()?;

        let root_name = course.archive_root_name();
        let staging_dir = self.output_dir.join(&root_name);
        let archive_path = self.output_dir.join(format!("{root_name}.tar.gz"));

        if staging_dir.exists() {
            debug!(path = %staging_dir.display(), "Removing stale staging directory");
            fs::remove_dir_all(&staging_dir).map_err(|e| {
                OlxError::export(&staging_dir, format!("cannot remove old output: {e}"))
            })?;
        }
        fs::create_dir_all(&staging_dir)?;

        for (relative, content) in files.iter() {
            let path = staging_dir.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content)
                .map_err(|e| OlxError::export(&path, format!("cannot write file: {e}")))?;
        }

        let file_count = count_files(&staging_dir)?;
        debug!(files = file_count, path = %staging_dir.display(), "Staged course");

        write_archive(&staging_dir, &root_name, &archive_path)?;
        info!(
            archive = %archive_path.display(),
            files = file_count,
            "Course exported"
        );

        Ok(ExportOutcome {
            staging_dir,
            archive_path,
            file_count,
        })
    }
}

fn count_files(dir: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| OlxError::export(dir, e.to_string()))?;
        if entry.file_type().is_file() {
            count += 1;
        }
    }
    Ok(count)
}

fn write_archive(staging_dir: &Path, root_name: &str, archive_path: &Path) -> Result<()> {
    let file = File::create(archive_path)
        .map_err(|e| OlxError::export(archive_path, format!("cannot create archive: {e}")))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(root_name, staging_dir)
        .map_err(|e| OlxError::export(archive_path, format!("cannot add files: {e}")))?;
    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .map_err(|e| OlxError::export(archive_path, format!("cannot finish archive: {e}")))?;
    Ok(())
}
