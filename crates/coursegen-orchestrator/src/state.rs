//! Generation state types.
//!
//! This module defines the stage machine of one generation session together
//! with the review history and fallback log collected along the way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};

// ============================================================================
// GenerationStage
// ============================================================================

/// Current stage of a generation session.
///
/// The stage advances through:
/// - `OutlineInit` -> `OutlineReview`
/// - `OutlineReview` -> `ChapterContent` -> `ChapterReview`, repeated per chapter
/// - then `FullCourseReview` (if enabled) -> `Building` -> `Done`
///
/// Any non-terminal stage may move to `Failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    /// Initial outline is being generated.
    #[default]
    OutlineInit,
    /// Outline is going through review rounds.
    OutlineReview,
    /// Content for the current chapter is being generated.
    ChapterContent,
    /// Current chapter is going through review rounds.
    ChapterReview,
    /// The merged course is going through review rounds.
    FullCourseReview,
    /// The course tree is being built.
    Building,
    /// The course tree is ready.
    Done,
    /// A fatal error ended the session.
    Failed,
}

impl GenerationStage {
    /// Returns `true` for `Done` and `Failed`.
    ///
    /// # Examples
    ///
    /// ```
    /// use coursegen_orchestrator::GenerationStage;
    ///
    /// assert!(GenerationStage::Done.is_terminal());
    /// assert!(!GenerationStage::ChapterReview.is_terminal());
    /// ```
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns `true` if the session may move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        use GenerationStage::{
            Building, ChapterContent, ChapterReview, Done, Failed, FullCourseReview, OutlineInit,
            OutlineReview,
        };

        match (*self, next) {
            (from, Failed) => !from.is_terminal(),
            (OutlineInit, OutlineReview)
            | (OutlineReview | ChapterReview, ChapterContent | FullCourseReview | Building)
            | (ChapterContent, ChapterReview)
            | (FullCourseReview, Building)
            | (Building, Done) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::OutlineInit => "outline_init",
            Self::OutlineReview => "outline_review",
            Self::ChapterContent => "chapter_content",
            Self::ChapterReview => "chapter_review",
            Self::FullCourseReview => "full_course_review",
            Self::Building => "building",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// ReviewRound and FallbackEvent
// ============================================================================

/// One critique, and possibly one revision, within a review stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRound {
    /// Stage the round belongs to.
    pub stage: GenerationStage,
    /// Zero-based chapter index for chapter reviews.
    pub chapter: Option<usize>,
    /// One-based round number within the stage.
    pub round: u32,
    /// Critique text.
    pub critique: String,
    /// Whether the critique accepted the draft.
    pub accepted: bool,
    /// Whether a revision replaced the draft.
    pub revised: bool,
    /// Whether a revision was attempted but discarded.
    pub fallback: bool,
    /// When the round finished.
    pub timestamp: DateTime<Utc>,
}

impl ReviewRound {
    /// Creates a round record stamped with the current time.
    #[must_use]
    pub fn new(
        stage: GenerationStage,
        chapter: Option<usize>,
        round: u32,
        critique: impl Into<String>,
        accepted: bool,
    ) -> Self {
        Self {
            stage,
            chapter,
            round,
            critique: critique.into(),
            accepted,
            revised: false,
            fallback: false,
            timestamp: Utc::now(),
        }
    }
}

/// A point where an unusable provider response was replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackEvent {
    /// Stage the fallback happened in.
    pub stage: GenerationStage,
    /// Zero-based chapter index, if chapter-specific.
    pub chapter: Option<usize>,
    /// What was wrong with the response.
    pub reason: String,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// GenerationState
// ============================================================================

/// Complete state of one generation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationState {
    /// Current stage.
    pub stage: GenerationStage,

    /// Zero-based index of the chapter being worked on, if any.
    pub current_chapter: Option<usize>,

    /// Every review round, in order.
    pub history: Vec<ReviewRound>,

    /// Every fallback, in order.
    pub fallbacks: Vec<FallbackEvent>,

    /// When the session started.
    pub started_at: DateTime<Utc>,

    /// When the state was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Default for GenerationState {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationState {
    /// Creates a state in `OutlineInit`.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            stage: GenerationStage::OutlineInit,
            current_chapter: None,
            history: Vec::new(),
            fallbacks: Vec::new(),
            started_at: now,
            updated_at: now,
        }
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::InvalidStateTransition` if the move is not
    /// allowed from the current stage.
    pub fn transition(&mut self, next: GenerationStage) -> Result<()> {
        if !self.stage.can_transition_to(next) {
            return Err(GenerationError::invalid_transition(self.stage, next));
        }
        self.stage = next;
        self.touch();
        Ok(())
    }

    /// Marks the session failed, unless it already ended.
    pub fn fail(&mut self) {
        if !self.stage.is_terminal() {
            self.stage = GenerationStage::Failed;
            self.touch();
        }
    }

    /// Appends a review round.
    pub fn record_round(&mut self, round: ReviewRound) {
        self.history.push(round);
        self.touch();
    }

    /// Appends a fallback event for the current stage and chapter.
    pub fn record_fallback(&mut self, reason: impl Into<String>) {
        self.fallbacks.push(FallbackEvent {
            stage: self.stage,
            chapter: self.current_chapter,
            reason: reason.into(),
            timestamp: Utc::now(),
        });
        self.touch();
    }

    /// Number of accepted revisions made in `stage`.
    #[must_use]
    pub fn revision_count(&self, stage: GenerationStage) -> usize {
        self.history
            .iter()
            .filter(|r| r.stage == stage && r.revised)
            .count()
    }

    /// Number of review rounds run in `stage`.
    #[must_use]
    pub fn round_count(&self, stage: GenerationStage) -> usize {
        self.history.iter().filter(|r| r.stage == stage).count()
    }

    /// Updates the `updated_at` timestamp to the current time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Returns the duration since the session started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // GenerationStage tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_stage_happy_path_transitions() {
        use GenerationStage::*;

        let path = [
            OutlineInit,
            OutlineReview,
            ChapterContent,
            ChapterReview,
            ChapterContent,
            ChapterReview,
            FullCourseReview,
            Building,
            Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_stage_rejects_skips_and_restarts() {
        use GenerationStage::*;

        assert!(!OutlineInit.can_transition_to(ChapterContent));
        assert!(!ChapterContent.can_transition_to(Building));
        assert!(!FullCourseReview.can_transition_to(ChapterContent));
        assert!(!Done.can_transition_to(OutlineInit));
        assert!(!Done.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Failed));
        assert!(Building.can_transition_to(Failed));
    }

    #[test]
    fn test_stage_serialization() {
        assert_eq!(
            serde_json::to_string(&GenerationStage::FullCourseReview).unwrap(),
            "\"full_course_review\""
        );
        assert_eq!(GenerationStage::ChapterReview.to_string(), "chapter_review");
        let stage: GenerationStage = serde_json::from_str("\"outline_init\"").unwrap();
        assert_eq!(stage, GenerationStage::OutlineInit);
    }

    // ------------------------------------------------------------------------
    // GenerationState tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_state_new() {
        let state = GenerationState::new();

        assert_eq!(state.stage, GenerationStage::OutlineInit);
        assert!(state.current_chapter.is_none());
        assert!(state.history.is_empty());
        assert!(state.fallbacks.is_empty());
        assert_eq!(state.started_at, state.updated_at);
    }

    #[test]
    fn test_state_invalid_transition_keeps_stage() {
        let mut state = GenerationState::new();

        let err = state.transition(GenerationStage::Done).unwrap_err();

        assert!(matches!(err, GenerationError::InvalidStateTransition { .. }));
        assert!(err.to_string().contains("outline_init"));
        assert_eq!(state.stage, GenerationStage::OutlineInit);
    }

    #[test]
    fn test_state_fail_is_sticky() {
        let mut state = GenerationState::new();
        state.transition(GenerationStage::OutlineReview).unwrap();

        state.fail();
        assert_eq!(state.stage, GenerationStage::Failed);
        assert!(state.transition(GenerationStage::Building).is_err());
    }

    #[test]
    fn test_state_touch() {
        let mut state = GenerationState::new();
        let original = state.updated_at;

        std::thread::sleep(std::time::Duration::from_millis(10));
        state.touch();

        assert!(state.updated_at > original);
        assert_eq!(state.started_at, original);
    }

    #[test]
    fn test_state_counts_rounds_and_revisions() {
        let mut state = GenerationState::new();
        let mut revised = ReviewRound::new(GenerationStage::OutlineReview, None, 1, "more", false);
        revised.revised = true;
        state.record_round(revised);
        state.record_round(ReviewRound::new(GenerationStage::OutlineReview, None, 2, "ok", true));
        state.record_round(ReviewRound::new(GenerationStage::ChapterReview, Some(0), 1, "x", false));

        assert_eq!(state.round_count(GenerationStage::OutlineReview), 2);
        assert_eq!(state.revision_count(GenerationStage::OutlineReview), 1);
        assert_eq!(state.revision_count(GenerationStage::ChapterReview), 0);
    }

    #[test]
    fn test_state_fallback_uses_current_position() {
        let mut state = GenerationState::new();
        state.transition(GenerationStage::OutlineReview).unwrap();
        state.transition(GenerationStage::ChapterContent).unwrap();
        state.current_chapter = Some(3);

        state.record_fallback("invalid JSON");

        let event = &state.fallbacks[0];
        assert_eq!(event.stage, GenerationStage::ChapterContent);
        assert_eq!(event.chapter, Some(3));
        assert_eq!(event.reason, "invalid JSON");
    }

    #[test]
    fn test_state_serialization() {
        let mut state = GenerationState::new();
        state.record_round(ReviewRound::new(GenerationStage::OutlineReview, None, 1, "fine", true));

        let json = serde_json::to_string(&state).unwrap();
        let parsed: GenerationState = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.stage, GenerationStage::OutlineInit);
        assert_eq!(parsed.history, state.history);
    }
}
