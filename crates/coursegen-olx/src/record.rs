//! Generation-time records.
//!
//! These are the loosely-shaped values that flow between the generation loop
//! and a content provider. Everything is optional at the serde level so that
//! provider output parses whenever it is structurally JSON of roughly the
//! right shape; required keys are enforced later by [`crate::build_course`].

use serde::{Deserialize, Serialize};

/// Treats a blank title the same as a missing one.
fn present(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

// ============================================================================
// OutlineRecord
// ============================================================================

/// A course outline: title plus ordered chapter records.
///
/// The same record type carries the fully merged course once every chapter
/// has been enriched with content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineRecord {
    /// Course title. Required by the tree builder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_title: Option<String>,

    /// Chapters in learner order.
    #[serde(default)]
    pub chapters: Vec<ChapterRecord>,
}

impl OutlineRecord {
    /// Creates an outline with a title and chapter list.
    #[must_use]
    pub fn new(course_title: impl Into<String>, chapters: Vec<ChapterRecord>) -> Self {
        Self {
            course_title: Some(course_title.into()),
            chapters,
        }
    }

    /// Returns the course title, if present and not blank.
    #[must_use]
    pub fn course_title(&self) -> Option<&str> {
        present(self.course_title.as_ref())
    }

    /// Number of chapters that already carry detailed content.
    #[must_use]
    pub fn detailed_chapter_count(&self) -> usize {
        self.chapters.iter().filter(|c| c.is_detailed()).count()
    }
}

// ============================================================================
// ChapterRecord
// ============================================================================

/// One chapter, either as an outline stub or with detailed content.
///
/// Content providers have historically emitted the title under either
/// `title` or `chapter_title`; both are accepted and `title` wins when both
/// are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    /// Chapter title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Alternate title key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_title: Option<String>,

    /// Short summary from the outline stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Detailed content. `None` means the chapter is still a stub.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequentials: Option<Vec<SequentialRecord>>,
}

impl ChapterRecord {
    /// Creates an outline stub with a title and description.
    #[must_use]
    pub fn stub(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: Some(description.into()),
            ..Self::default()
        }
    }

    /// Creates a chapter with detailed content.
    #[must_use]
    pub fn detailed(title: impl Into<String>, sequentials: Vec<SequentialRecord>) -> Self {
        Self {
            title: Some(title.into()),
            sequentials: Some(sequentials),
            ..Self::default()
        }
    }

    /// Returns the chapter title, preferring `title` over `chapter_title`.
    /// Blank values count as missing.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        present(self.title.as_ref()).or_else(|| present(self.chapter_title.as_ref()))
    }

    /// Returns `true` once the chapter carries a `sequentials` list.
    #[must_use]
    pub const fn is_detailed(&self) -> bool {
        self.sequentials.is_some()
    }
}

// ============================================================================
// SequentialRecord / VerticalRecord
// ============================================================================

/// One learning unit inside a detailed chapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequentialRecord {
    /// Unit title, also used for its verticals unless they carry their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Screens in learner order.
    #[serde(default)]
    pub verticals: Vec<VerticalRecord>,
}

impl SequentialRecord {
    /// Creates a sequential record.
    #[must_use]
    pub fn new(title: impl Into<String>, verticals: Vec<VerticalRecord>) -> Self {
        Self {
            title: Some(title.into()),
            verticals,
        }
    }

    /// Returns the unit title, if present and not blank.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        present(self.title.as_ref())
    }
}

/// One screen: an optional HTML payload and an optional problem payload.
///
/// A missing payload key simply omits that component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerticalRecord {
    /// Screen title. Falls back to the parent unit's title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// HTML body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// Complete `<problem>` markup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
}

impl VerticalRecord {
    /// Creates an empty vertical record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTML payload.
    #[must_use]
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Sets the problem payload.
    #[must_use]
    pub fn with_problem(mut self, problem: impl Into<String>) -> Self {
        self.problem = Some(problem.into());
        self
    }

    /// Sets an explicit screen title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Returns the screen title, if present and not blank.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        present(self.title.as_ref())
    }
}
