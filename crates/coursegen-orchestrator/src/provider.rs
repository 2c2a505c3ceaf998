//! The content provider capability consumed by the generation loop.
//!
//! A provider turns profiles and drafts into generation records and critique
//! text. The loop does not care whether answers come from templates, a test
//! stub or a chat model.

use coursegen_olx::{ChapterRecord, OutlineRecord};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::profile::{AssessmentResult, Skill, UserProfile};
use crate::transcript::Transcript;

// ============================================================================
// Draft
// ============================================================================

/// The record currently under review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Draft {
    /// Outline stage: title plus chapter stubs.
    Outline(OutlineRecord),
    /// Content of a single chapter.
    Chapter(ChapterRecord),
    /// The whole merged course.
    Course(OutlineRecord),
}

/// Shape tag of a [`Draft`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftKind {
    /// [`Draft::Outline`]
    Outline,
    /// [`Draft::Chapter`]
    Chapter,
    /// [`Draft::Course`]
    Course,
}

impl std::fmt::Display for DraftKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outline => write!(f, "outline"),
            Self::Chapter => write!(f, "chapter"),
            Self::Course => write!(f, "course"),
        }
    }
}

impl Draft {
    /// Returns the shape tag.
    #[must_use]
    pub const fn kind(&self) -> DraftKind {
        match self {
            Self::Outline(_) => DraftKind::Outline,
            Self::Chapter(_) => DraftKind::Chapter,
            Self::Course(_) => DraftKind::Course,
        }
    }

    /// Unwraps an outline draft.
    #[must_use]
    pub fn into_outline(self) -> Option<OutlineRecord> {
        match self {
            Self::Outline(outline) => Some(outline),
            _ => None,
        }
    }

    /// Unwraps a chapter draft.
    #[must_use]
    pub fn into_chapter(self) -> Option<ChapterRecord> {
        match self {
            Self::Chapter(chapter) => Some(chapter),
            _ => None,
        }
    }

    /// Unwraps a whole-course draft.
    #[must_use]
    pub fn into_course(self) -> Option<OutlineRecord> {
        match self {
            Self::Course(course) => Some(course),
            _ => None,
        }
    }

    /// Describes why the draft cannot stand in for the last good one, or
    /// `None` if it has the expected shape.
    ///
    /// Outlines need a course title and at least one chapter, each titled.
    /// Chapters need `sequentials`. A whole course needs both: every chapter
    /// titled and detailed.
    #[must_use]
    pub fn shape_problem(&self) -> Option<String> {
        match self {
            Self::Outline(outline) => outline_problem(outline),
            Self::Chapter(chapter) => (!chapter.is_detailed())
                .then(|| "chapter has no sequentials".to_string()),
            Self::Course(course) => outline_problem(course).or_else(|| {
                course
                    .chapters
                    .iter()
                    .position(|c| !c.is_detailed())
                    .map(|i| format!("course chapter {} has no sequentials", i + 1))
            }),
        }
    }

    /// Serializes the wrapped record as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        let json = match self {
            Self::Outline(record) | Self::Course(record) => serde_json::to_string_pretty(record)?,
            Self::Chapter(record) => serde_json::to_string_pretty(record)?,
        };
        Ok(json)
    }
}

/// Describes why `outline` is unusable as an outline, if it is.
pub(crate) fn outline_problem(outline: &OutlineRecord) -> Option<String> {
    if outline.course_title().is_none() {
        return Some("outline has no course_title".to_string());
    }
    if outline.chapters.is_empty() {
        return Some("outline has no chapters".to_string());
    }
    outline
        .chapters
        .iter()
        .position(|c| c.title().is_none())
        .map(|i| format!("chapter {} has no title", i + 1))
}

// ============================================================================
// Critique and completion
// ============================================================================

/// Review feedback on a draft.
///
/// `approved` carries an explicit verdict when the provider gives one. When
/// it is `None`, acceptance falls back to the marker check of
/// [`CompletionPredicate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Critique {
    /// Free-form feedback.
    pub text: String,
    /// Explicit verdict, if the provider produced one.
    pub approved: Option<bool>,
}

impl Critique {
    /// Creates a critique with no explicit verdict.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            approved: None,
        }
    }

    /// Creates a critique with an explicit verdict.
    #[must_use]
    pub fn with_verdict(text: impl Into<String>, approved: bool) -> Self {
        Self {
            text: text.into(),
            approved: Some(approved),
        }
    }
}

/// Text-based acceptance check: both markers must occur in the critique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPredicate {
    quality_marker: String,
    done_marker: String,
}

impl Default for CompletionPredicate {
    fn default() -> Self {
        Self::new("良好", "完成")
    }
}

impl CompletionPredicate {
    /// Creates a predicate from its two markers.
    #[must_use]
    pub fn new(quality_marker: impl Into<String>, done_marker: impl Into<String>) -> Self {
        Self {
            quality_marker: quality_marker.into(),
            done_marker: done_marker.into(),
        }
    }

    /// Returns `true` if `text` contains both markers.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        text.contains(&self.quality_marker) && text.contains(&self.done_marker)
    }

    /// Decides whether a critique accepts the draft.
    ///
    /// An explicit verdict wins; otherwise the markers decide.
    #[must_use]
    pub fn accepts(&self, critique: &Critique) -> bool {
        critique
            .approved
            .unwrap_or_else(|| self.matches(&critique.text))
    }
}

// ============================================================================
// ContentProvider
// ============================================================================

/// Source of generated course material.
///
/// Every call appends its exchange to `transcript`. Any call may fail; a
/// response that cannot be used as the expected shape must be reported as
/// [`crate::GenerationError::MalformedResponse`] so the loop can fall back,
/// while transport and authentication failures end the session.
pub trait ContentProvider {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Produces the initial course outline.
    fn generate_outline(
        &mut self,
        profile: &UserProfile,
        skill: &Skill,
        transcript: &mut Transcript,
    ) -> Result<OutlineRecord>;

    /// Reviews a draft.
    fn critique(&mut self, draft: &Draft, transcript: &mut Transcript) -> Result<Critique>;

    /// Revises a draft according to a critique.
    ///
    /// The returned draft should have the same shape as the input; the loop
    /// discards it otherwise.
    fn revise(
        &mut self,
        draft: &Draft,
        critique: &Critique,
        transcript: &mut Transcript,
    ) -> Result<Draft>;

    /// Produces detailed content for one chapter.
    fn generate_chapter(
        &mut self,
        title: &str,
        description: &str,
        profile: &UserProfile,
        transcript: &mut Transcript,
    ) -> Result<ChapterRecord>;

    /// Produces skill assessment questions.
    fn generate_assessment_questions(
        &mut self,
        skill: &Skill,
        transcript: &mut Transcript,
    ) -> Result<Vec<String>>;

    /// Grades question/answer pairs.
    fn analyze_responses(
        &mut self,
        skill: &Skill,
        answers: &[(String, String)],
        transcript: &mut Transcript,
    ) -> Result<AssessmentResult>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_requires_both_markers() {
        let predicate = CompletionPredicate::default();

        assert!(predicate.matches("课程整体结构良好，审校完成。"));
        assert!(!predicate.matches("课程整体结构良好，但需要修改。"));
        assert!(!predicate.matches("The course looks good and is complete."));
    }

    #[test]
    fn test_explicit_verdict_wins_over_markers() {
        let predicate = CompletionPredicate::default();

        assert!(predicate.accepts(&Critique::with_verdict("needs nothing", true)));
        assert!(!predicate.accepts(&Critique::with_verdict("良好 完成", false)));
        assert!(predicate.accepts(&Critique::new("良好 完成")));
        assert!(!predicate.accepts(&Critique::new("add more examples")));
    }

    #[test]
    fn test_custom_markers() {
        let predicate = CompletionPredicate::new("good", "done");
        assert!(predicate.accepts(&Critique::new("good work, done")));
    }

    #[test]
    fn test_draft_kind_and_unwrap() {
        let draft = Draft::Chapter(ChapterRecord::stub("A", "a"));

        assert_eq!(draft.kind(), DraftKind::Chapter);
        assert_eq!(draft.kind().to_string(), "chapter");
        assert!(draft.clone().into_outline().is_none());
        assert_eq!(draft.into_chapter().unwrap().title(), Some("A"));
    }

    #[test]
    fn test_shape_problem_requires_titled_chapters() {
        let untitled: OutlineRecord =
            serde_json::from_str(r#"{"course_title": "T", "chapters": [{"name": "Intro"}]}"#)
                .unwrap();
        assert_eq!(
            Draft::Outline(untitled).shape_problem().as_deref(),
            Some("chapter 1 has no title")
        );

        let empty = OutlineRecord::new("T", Vec::new());
        assert!(Draft::Outline(empty).shape_problem().is_some());

        let stub = OutlineRecord::new("T", vec![ChapterRecord::stub("A", "a")]);
        assert_eq!(Draft::Outline(stub).shape_problem(), None);
    }

    #[test]
    fn test_shape_problem_requires_detailed_course_chapters() {
        let stripped = OutlineRecord::new(
            "T",
            vec![
                ChapterRecord::detailed("A", Vec::new()),
                ChapterRecord::stub("B", "b"),
            ],
        );
        assert_eq!(
            Draft::Course(stripped.clone()).shape_problem().as_deref(),
            Some("course chapter 2 has no sequentials")
        );
        assert_eq!(Draft::Outline(stripped).shape_problem(), None);

        assert!(Draft::Chapter(ChapterRecord::stub("A", "a")).shape_problem().is_some());
        assert_eq!(
            Draft::Chapter(ChapterRecord::detailed("A", Vec::new())).shape_problem(),
            None
        );
    }

    #[test]
    fn test_draft_json() {
        let draft = Draft::Outline(OutlineRecord::new("T", Vec::new()));
        let json = draft.to_json_pretty().unwrap();
        assert!(json.contains("\"course_title\": \"T\""));
    }
}
