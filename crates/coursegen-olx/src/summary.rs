//! Course metadata written after a successful export.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Course, ExportOutcome, Result};

/// What a caller needs to know about a finished export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSummary {
    /// Course title.
    pub title: String,
    /// Course slug, also the course identifier.
    pub slug: String,
    /// Run code.
    pub run: String,
    /// Organization code.
    pub org: String,
    /// Number of chapters.
    pub chapter_count: usize,
    /// Number of sequentials.
    pub sequential_count: usize,
    /// Number of verticals.
    pub vertical_count: usize,
    /// Number of components.
    pub component_count: usize,
    /// Location of the `.tar.gz` archive.
    pub archive_path: PathBuf,
}

impl CourseSummary {
    /// Summarizes an exported course.
    #[must_use]
    pub fn from_export(course: &Course, outcome: &ExportOutcome) -> Self {
        Self {
            title: course.title().to_string(),
            slug: course.slug().to_string(),
            run: course.run().to_string(),
            org: course.org().to_string(),
            chapter_count: course.chapters().len(),
            sequential_count: course.sequential_count(),
            vertical_count: course.vertical_count(),
            component_count: course.component_count(),
            archive_path: outcome.archive_path.clone(),
        }
    }

    /// Serializes the summary as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OlxError::Json`] if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the pretty JSON summary to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{Chapter, Component, CourseOptions, Sequential, Vertical};

    fn exported() -> (Course, ExportOutcome) {
        let mut course = Course::new("Summary Test", &CourseOptions::default()).unwrap();
        course.add_chapter(Chapter::new(
            "One",
            vec![Sequential::new(
                "Unit",
                vec![
                    Vertical::new("A", vec![Component::html("a"), Component::problem("<problem/>")]),
                    Vertical::new("B", vec![Component::problem("<problem/>")]),
                ],
            )],
        ));
        course.add_chapter(Chapter::empty("Two"));

        let outcome = ExportOutcome {
            staging_dir: PathBuf::from("out/summary_test-run1"),
            archive_path: PathBuf::from("out/summary_test-run1.tar.gz"),
            file_count: 0,
        };
        (course, outcome)
    }

    #[test]
    fn test_counts_every_level() {
        let (course, outcome) = exported();

        let summary = CourseSummary::from_export(&course, &outcome);

        assert_eq!(summary.slug, "summary_test");
        assert_eq!(summary.org, "DefaultOrg");
        assert_eq!(summary.chapter_count, 2);
        assert_eq!(summary.sequential_count, 1);
        assert_eq!(summary.vertical_count, 2);
        assert_eq!(summary.component_count, 3);
    }

    #[test]
    fn test_json_snapshot() {
        let (course, outcome) = exported();
        let summary = CourseSummary::from_export(&course, &outcome);

        insta::assert_snapshot!(summary.to_json_pretty().unwrap(), @r#"
        {
          "title": "Summary Test",
          "slug": "summary_test",
          "run": "run1",
          "org": "DefaultOrg",
          "chapter_count": 2,
          "sequential_count": 1,
          "vertical_count": 2,
          "component_count": 3,
          "archive_path": "out/summary_test-run1.tar.gz"
        }
        "#);
    }

    #[test]
    fn test_write_to_file_round_trips() {
        let temp = TempDir::new().unwrap();
        let (course, outcome) = exported();
        let summary = CourseSummary::from_export(&course, &outcome);
        let path = temp.path().join("summary.json");

        summary.write_to_file(&path).unwrap();

        let loaded: CourseSummary =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, summary);
    }
}
