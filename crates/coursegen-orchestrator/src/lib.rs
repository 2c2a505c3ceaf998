//! Course Generation Orchestrator
//!
//! Runs the generate-review-revise loop that turns a learner profile into a
//! course tree, against a pluggable content provider.

pub mod chat;
pub mod config;
pub mod error;
pub mod generation;
pub mod profile;
pub mod provider;
pub mod state;
pub mod templates;
pub mod transcript;

pub use chat::{extract_json, parse_verdict, ChatProvider};
pub use config::{CompletionConfig, Config, ProviderKind, CONFIG_FILE_NAME, MAX_ITERATIONS_LIMIT};
pub use error::{GenerationError, ProviderErrorKind, Result};
pub use generation::{CourseGenerationManager, GenerationOutcome, GenerationSettings};
pub use profile::{
    AssessmentResult, Skill, SkillLevel, UserProfile, ASSESSMENT_OBJECTIVES,
    MAX_ASSESSMENT_QUESTIONS,
};
pub use provider::{CompletionPredicate, ContentProvider, Critique, Draft, DraftKind};
pub use state::{FallbackEvent, GenerationStage, GenerationState, ReviewRound};
pub use templates::TemplateProvider;
pub use transcript::{Message, Role, Transcript};
