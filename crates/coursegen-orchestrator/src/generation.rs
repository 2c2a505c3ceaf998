//! The generate-review-revise control loop.
//!
//! [`CourseGenerationManager`] drives one session from profile to built
//! course tree:
//!
//! 1. generate an outline, then review it for up to `max_iterations` rounds
//! 2. for each chapter, generate content and review it for up to
//!    `max_iterations - 1` rounds
//! 3. optionally review the merged course for up to `max_iterations - 1`
//!    rounds
//! 4. build the [`Course`] tree
//!
//! Unusable provider responses are replaced by the last good draft or a
//! template default; transport and authentication failures end the session.

use coursegen_olx::{build_course, ChapterRecord, Course, CourseOptions, OlxError, OutlineRecord};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::profile::{AssessmentResult, Skill, UserProfile, MAX_ASSESSMENT_QUESTIONS};
use crate::provider::{CompletionPredicate, ContentProvider, Draft};
use crate::state::{GenerationStage, GenerationState, ReviewRound};
use crate::templates;
use crate::transcript::Transcript;

// ============================================================================
// GenerationSettings
// ============================================================================

/// Per-session knobs of the control loop.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Review round budget of the outline stage.
    pub max_iterations: u32,
    /// Whether to review the merged course before building.
    pub full_course_review: bool,
    /// Text-based acceptance check for critiques without a verdict.
    pub completion: CompletionPredicate,
    /// Organization, run and language of the built course.
    pub course_options: CourseOptions,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_iterations: 1,
            full_course_review: true,
            completion: CompletionPredicate::default(),
            course_options: CourseOptions::default(),
        }
    }
}

impl GenerationSettings {
    /// Takes the loop settings from a validated [`Config`].
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_iterations: config.max_iterations,
            full_course_review: config.full_course_review,
            completion: config.completion_predicate(),
            course_options: config.course_options(),
        }
    }

    /// Round budget of chapter and full-course reviews.
    #[must_use]
    pub const fn follow_up_budget(&self) -> u32 {
        self.max_iterations.saturating_sub(1)
    }
}

// ============================================================================
// GenerationOutcome
// ============================================================================

/// Everything a finished session produced.
#[derive(Debug)]
pub struct GenerationOutcome {
    /// The built course tree.
    pub course: Course,
    /// The final merged record the tree was built from.
    pub record: OutlineRecord,
    /// Every provider exchange of the session.
    pub transcript: Transcript,
    /// Final stage, review history and fallbacks.
    pub state: GenerationState,
}

// ============================================================================
// CourseGenerationManager
// ============================================================================

fn enter(state: &mut GenerationState, stage: GenerationStage) -> Result<()> {
    state.transition(stage)?;
    info!(%stage, chapter = ?state.current_chapter.map(|i| i + 1), "Entering stage");
    Ok(())
}

/// Runs generation sessions against a [`ContentProvider`].
///
/// Each call to [`CourseGenerationManager::generate_course`] is an
/// independent session with its own transcript and state. The state of the
/// most recent session, failed or not, stays readable through
/// [`CourseGenerationManager::last_state`].
#[derive(Debug)]
pub struct CourseGenerationManager<P> {
    provider: P,
    settings: GenerationSettings,
    last_state: Option<GenerationState>,
}

impl<P: ContentProvider> CourseGenerationManager<P> {
    /// Creates a manager.
    #[must_use]
    pub const fn new(provider: P, settings: GenerationSettings) -> Self {
        Self {
            provider,
            settings,
            last_state: None,
        }
    }

    /// Returns the provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Consumes the manager and returns the provider.
    #[must_use]
    pub fn into_provider(self) -> P {
        self.provider
    }

    /// Returns the loop settings.
    #[must_use]
    pub const fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Returns the state of the most recent session.
    ///
    /// After a fatal error this is the only place the `Failed` stage and the
    /// review history leading up to it can be read.
    #[must_use]
    pub const fn last_state(&self) -> Option<&GenerationState> {
        self.last_state.as_ref()
    }

    /// Asks the provider for assessment questions, falling back to the
    /// template questions on a malformed response.
    pub fn assessment_questions(
        &mut self,
        skill: &Skill,
        transcript: &mut Transcript,
    ) -> Result<Vec<String>> {
        match self.provider.generate_assessment_questions(skill, transcript) {
            Ok(mut questions) => {
                questions.truncate(MAX_ASSESSMENT_QUESTIONS);
                Ok(questions)
            }
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Using template assessment questions");
                Ok(templates::default_questions(skill))
            }
            Err(e) => Err(e),
        }
    }

    /// Grades assessment answers, falling back to a beginner result on a
    /// malformed response.
    pub fn analyze_assessment(
        &mut self,
        skill: &Skill,
        answers: &[(String, String)],
        transcript: &mut Transcript,
    ) -> Result<AssessmentResult> {
        match self.provider.analyze_responses(skill, answers, transcript) {
            Ok(result) => Ok(result.normalized()),
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Using fallback assessment result");
                Ok(AssessmentResult::fallback(skill.name()))
            }
            Err(e) => Err(e),
        }
    }

    /// Runs one generation session.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: a provider transport or authentication
    /// failure, or a missing required key in the records at build time.
    pub fn generate_course(
        &mut self,
        profile: &UserProfile,
        skill: &Skill,
    ) -> Result<GenerationOutcome> {
        let mut state = GenerationState::new();
        let mut transcript = Transcript::new();

        info!(
            provider = self.provider.name(),
            learner = profile.name(),
            skill = skill.name(),
            level = profile.level_name(),
            max_iterations = self.settings.max_iterations,
            "Starting course generation"
        );

        match self.run(profile, skill, &mut state, &mut transcript) {
            Ok((course, record)) => {
                info!(
                    title = course.title(),
                    chapters = course.chapters().len(),
                    rounds = state.history.len(),
                    fallbacks = state.fallbacks.len(),
                    "Course generation finished"
                );
                self.last_state = Some(state.clone());
                Ok(GenerationOutcome {
                    course,
                    record,
                    transcript,
                    state,
                })
            }
            Err(e) => {
                error!(stage = %state.stage, error = %e, "Course generation failed");
                state.fail();
                self.last_state = Some(state);
                Err(e)
            }
        }
    }

    fn run(
        &mut self,
        profile: &UserProfile,
        skill: &Skill,
        state: &mut GenerationState,
        transcript: &mut Transcript,
    ) -> Result<(Course, OutlineRecord)> {
        let outline = match self.provider.generate_outline(profile, skill, transcript) {
            Ok(outline) => outline,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Falling back to the template outline");
                state.record_fallback(e.to_string());
                templates::default_outline(profile, skill)
            }
            Err(e) => return Err(e),
        };

        enter(state, GenerationStage::OutlineReview)?;
        let mut record = self.review(
            state,
            transcript,
            outline,
            self.settings.max_iterations,
            Draft::Outline,
            Draft::into_outline,
        )?;

        let follow_up = self.settings.follow_up_budget();
        for index in 0..record.chapters.len() {
            state.current_chapter = Some(index);
            enter(state, GenerationStage::ChapterContent)?;

            let stub = &record.chapters[index];
            let title = stub
                .title()
                .ok_or_else(|| OlxError::missing_field(format!("chapter {}", index + 1), "title"))?
                .to_string();
            let description = stub.description.clone().unwrap_or_default();
            debug!(chapter = index + 1, title = %title, "Generating chapter content");

            let chapter = self.chapter_content(&title, &description, profile, state, transcript)?;

            enter(state, GenerationStage::ChapterReview)?;
            let mut chapter = self.review(
                state,
                transcript,
                chapter,
                follow_up,
                Draft::Chapter,
                Draft::into_chapter,
            )?;
            if chapter.title().is_none() {
                chapter.title = Some(title);
            }
            record.chapters[index] = chapter;
        }
        state.current_chapter = None;

        if self.settings.full_course_review {
            enter(state, GenerationStage::FullCourseReview)?;
            record = self.review(
                state,
                transcript,
                record,
                follow_up,
                Draft::Course,
                Draft::into_course,
            )?;
        }

        enter(state, GenerationStage::Building)?;
        let course = build_course(&record, &self.settings.course_options)?;
        enter(state, GenerationStage::Done)?;

        Ok((course, record))
    }

    fn chapter_content(
        &mut self,
        title: &str,
        description: &str,
        profile: &UserProfile,
        state: &mut GenerationState,
        transcript: &mut Transcript,
    ) -> Result<ChapterRecord> {
        match self
            .provider
            .generate_chapter(title, description, profile, transcript)
        {
            Ok(chapter) => Ok(chapter),
            Err(e) if e.is_recoverable() => {
                warn!(title, error = %e, "Falling back to the template chapter");
                state.record_fallback(e.to_string());
                Ok(templates::default_chapter(title, description, profile))
            }
            Err(e) => Err(e),
        }
    }

    /// Runs review rounds `1..=budget` over `draft` in the current stage.
    ///
    /// Stops early on acceptance and accepts the current draft on the last
    /// round. A malformed critique ends the stage with the current draft; a
    /// malformed, wrong-kind or incomplete revision keeps it for the next
    /// round.
    fn review<T: Clone>(
        &mut self,
        state: &mut GenerationState,
        transcript: &mut Transcript,
        draft: T,
        budget: u32,
        wrap: fn(T) -> Draft,
        unwrap: fn(Draft) -> Option<T>,
    ) -> Result<T> {
        let stage = state.stage;
        let chapter = state.current_chapter;
        let mut current = draft;

        for round in 1..=budget {
            let draft = wrap(current.clone());
            let critique = match self.provider.critique(&draft, transcript) {
                Ok(critique) => critique,
                Err(e) if e.is_recoverable() => {
                    warn!(%stage, round, error = %e, "Unusable critique, keeping current draft");
                    state.record_fallback(e.to_string());
                    break;
                }
                Err(e) => return Err(e),
            };

            let accepted = self.settings.completion.accepts(&critique);
            let mut entry = ReviewRound::new(stage, chapter, round, critique.text.as_str(), accepted);
            debug!(%stage, round, accepted, "Review round");

            if accepted || round == budget {
                state.record_round(entry);
                break;
            }

            match self.provider.revise(&draft, &critique, transcript) {
                Ok(revised) => {
                    let kind = revised.kind();
                    let problem = if kind == draft.kind() {
                        revised.shape_problem()
                    } else {
                        Some(format!("revision returned a {kind} instead of a {}", draft.kind()))
                    };
                    match (problem, unwrap(revised)) {
                        (None, Some(next)) => {
                            current = next;
                            entry.revised = true;
                        }
                        (problem, _) => {
                            let reason =
                                problem.unwrap_or_else(|| format!("unusable {kind} revision"));
                            warn!(%stage, round, %reason, "Discarding revision, keeping current draft");
                            entry.fallback = true;
                            state.record_fallback(reason);
                        }
                    }
                }
                Err(e) if e.is_recoverable() => {
                    warn!(%stage, round, error = %e, "Unusable revision, keeping current draft");
                    entry.fallback = true;
                    state.record_fallback(e.to_string());
                }
                Err(e) => return Err(e),
            }
            state.record_round(entry);
        }

        Ok(current)
    }
}
