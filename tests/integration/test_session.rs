//! End-to-end integration tests for course generation sessions.
//!
//! These tests run the control loop against the template provider and a
//! scripted stub, then export the result. No network access is needed.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use coursegen_olx::{ChapterRecord, CourseOptions, CourseSummary, Exporter, OutlineRecord};
use coursegen_orchestrator::{
    AssessmentResult, Config, ContentProvider, CourseGenerationManager, Critique, Draft,
    GenerationError, GenerationSettings, GenerationStage, Skill, SkillLevel, TemplateProvider,
    Transcript, UserProfile,
};
use flate2::read::GzDecoder;
use tempfile::TempDir;

fn archive_paths(path: &Path) -> BTreeSet<String> {
    let file = File::open(path).expect("Failed to open archive");
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive
        .entries()
        .expect("Failed to read archive entries")
        .map(|entry| entry.expect("Failed to read archive entry"))
        .filter(|entry| entry.header().entry_type().is_file())
        .map(|entry| {
            entry
                .path()
                .expect("Entry has no path")
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

fn ana() -> UserProfile {
    let level: SkillLevel = "初级".parse().expect("valid level");
    UserProfile::new("Ana").with_skill_level(level)
}

fn python() -> Skill {
    Skill::new("Python", "")
}

fn settings(max_iterations: u32) -> GenerationSettings {
    GenerationSettings {
        max_iterations,
        ..GenerationSettings::default()
    }
}

/// Provider whose every structured answer is unparseable.
#[derive(Debug, Default)]
struct Garbled {
    revise_calls: usize,
}

impl ContentProvider for Garbled {
    fn name(&self) -> &str {
        "garbled"
    }

    fn generate_outline(
        &mut self,
        _profile: &UserProfile,
        _skill: &Skill,
        transcript: &mut Transcript,
    ) -> coursegen_orchestrator::Result<OutlineRecord> {
        transcript.push_assistant("I cannot produce JSON today");
        Err(GenerationError::malformed("generate_outline", "invalid JSON"))
    }

    fn critique(
        &mut self,
        _draft: &Draft,
        _transcript: &mut Transcript,
    ) -> coursegen_orchestrator::Result<Critique> {
        Ok(Critique::new("Please improve everything."))
    }

    fn revise(
        &mut self,
        _draft: &Draft,
        _critique: &Critique,
        _transcript: &mut Transcript,
    ) -> coursegen_orchestrator::Result<Draft> {
        self.revise_calls += 1;
        Err(GenerationError::malformed("revise", "invalid JSON"))
    }

    fn generate_chapter(
        &mut self,
        _title: &str,
        _description: &str,
        _profile: &UserProfile,
        _transcript: &mut Transcript,
    ) -> coursegen_orchestrator::Result<ChapterRecord> {
        Err(GenerationError::malformed("generate_chapter", "invalid JSON"))
    }

    fn generate_assessment_questions(
        &mut self,
        _skill: &Skill,
        _transcript: &mut Transcript,
    ) -> coursegen_orchestrator::Result<Vec<String>> {
        Err(GenerationError::malformed("generate_assessment_questions", "invalid JSON"))
    }

    fn analyze_responses(
        &mut self,
        _skill: &Skill,
        _answers: &[(String, String)],
        _transcript: &mut Transcript,
    ) -> coursegen_orchestrator::Result<AssessmentResult> {
        Err(GenerationError::malformed("analyze_responses", "invalid JSON"))
    }
}

/// Tests the default-provider scenario end to end.
#[test]
fn test_template_scenario_exports_ten_chapters() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut manager = CourseGenerationManager::new(TemplateProvider::new(), settings(1));

    let outcome = manager
        .generate_course(&ana(), &python())
        .expect("Generation failed");
    let course = &outcome.course;

    assert_eq!(course.title(), "Python course of Ana");
    assert_eq!(course.chapters().len(), 10);
    assert_eq!(outcome.state.stage, GenerationStage::Done);

    let export = Exporter::new(temp.path())
        .export(course)
        .expect("Export failed");
    let root = course.archive_root_name();
    let id = course.identifier();
    let paths = archive_paths(&export.archive_path);

    assert!(paths.contains(&format!("{root}/course.xml")));
    assert!(paths.contains(&format!("{root}/policy/{id}/policy.json")));
    assert!(paths.contains(&format!("{root}/course/{id}.xml")));
    let chapter_prefix = format!("{root}/chapter/");
    assert_eq!(
        paths.iter().filter(|p| p.starts_with(&chapter_prefix)).count(),
        10
    );

    let summary = CourseSummary::from_export(course, &export);
    assert_eq!(summary.chapter_count, 10);
    assert_eq!(summary.sequential_count, 20);
    assert_eq!(summary.component_count, 40);
}

/// Tests that unparseable provider output still yields the default outline.
#[test]
fn test_garbled_provider_falls_back_to_default_outline() {
    let mut manager = CourseGenerationManager::new(Garbled::default(), settings(3));

    let outcome = manager
        .generate_course(&ana(), &python())
        .expect("Generation should survive malformed output");

    assert_eq!(outcome.course.title(), "Python course of Ana");
    assert_eq!(outcome.course.chapters().len(), 10);
    assert!(outcome
        .record
        .chapters
        .iter()
        .all(|c| c.title().is_some() && c.description.is_some()));
    // One outline fallback, one per chapter, and one per discarded revision.
    assert!(outcome.state.fallbacks.len() >= 11);
}

/// Tests that the outline stage never revises more than `max_iterations`
/// times, whatever the critiques say.
#[test]
fn test_loop_terminates_for_any_iteration_bound() {
    for max in [0_u32, 1, 2, 5] {
        let mut manager = CourseGenerationManager::new(Garbled::default(), settings(max));

        let outcome = manager
            .generate_course(&ana(), &python())
            .expect("Generation failed");

        assert!(outcome.state.revision_count(GenerationStage::OutlineReview) <= max as usize);
        let attempted = outcome
            .state
            .history
            .iter()
            .filter(|r| r.stage == GenerationStage::OutlineReview && (r.revised || r.fallback))
            .count();
        assert!(attempted <= max as usize, "max={max}");
        assert_eq!(outcome.state.stage, GenerationStage::Done);
    }
}

/// Tests that settings built from a config file reach the built course.
#[test]
fn test_config_drives_course_options() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp.path().join("coursegen.json");
    std::fs::write(
        &config_path,
        r#"{"maxIterations": 2, "org": "Acme", "run": "2026_fall", "fullCourseReview": false}"#,
    )
    .expect("Failed to write config");

    let config = Config::load_from_file(&config_path).expect("Failed to load config");
    let settings = GenerationSettings::from_config(&config);
    assert_eq!(
        settings.course_options,
        CourseOptions {
            org: "Acme".to_string(),
            run: "2026_fall".to_string(),
            language: "en".to_string(),
        }
    );

    let mut manager = CourseGenerationManager::new(TemplateProvider::new(), settings);
    let outcome = manager
        .generate_course(&ana(), &python())
        .expect("Generation failed");

    assert_eq!(outcome.course.org(), "Acme");
    assert_eq!(outcome.course.archive_root_name(), "python_course_of_ana-2026_fall");
    assert_eq!(
        outcome.state.round_count(GenerationStage::FullCourseReview),
        0
    );
}
