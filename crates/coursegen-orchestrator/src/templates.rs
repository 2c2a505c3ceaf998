//! Deterministic built-in content.
//!
//! [`TemplateProvider`] answers every provider call from fixed templates. The
//! same default records back the control loop's fallbacks when a real
//! provider returns something unusable.

use coursegen_olx::{
    escape_xml, ChapterRecord, OutlineRecord, SequentialRecord, VerticalRecord,
};

use crate::error::Result;
use crate::profile::{AssessmentResult, Skill, SkillLevel, UserProfile, MAX_ASSESSMENT_QUESTIONS};
use crate::provider::{ContentProvider, Critique, Draft};
use crate::transcript::Transcript;

const OUTLINE_CRITIQUE: &str =
    "The outline is broadly sound, but it needs more hands-on practice, especially in the early chapters.";
const CHAPTER_CRITIQUE: &str =
    "The chapter would benefit from more concrete code examples to illustrate the concepts.";
const COURSE_CRITIQUE: &str =
    "The overall structure works; make sure chapters connect clearly and terminology is used consistently.";

const PRACTICE_SUFFIX: &str = ", with hands-on exercises";
const CODE_EXAMPLE: &str = "<pre><code>print(\"Hello, World!\")</code></pre>";
const TERMINOLOGY_NOTE: &str =
    "<p><strong>Note:</strong> terms in this chapter are used consistently with the rest of the course.</p>";

/// Chapter titles and descriptions of the default outline, after chapter 1.
const DEFAULT_CHAPTERS: [(&str, &str); 9] = [
    ("Basic Syntax", "Learn the basic syntax and structure"),
    ("Data Types", "Get familiar with the common data types"),
    ("Control Flow", "Learn conditionals and loops"),
    ("Functions", "Define and use functions"),
    ("Modules and Packages", "Understand modular programming"),
    ("File Handling", "Read and write files"),
    ("Error Handling", "Handle errors and exceptions"),
    ("Object-Oriented Programming", "Understand object-oriented concepts"),
    ("Project Practice", "Complete a small project"),
];

// ============================================================================
// Default records
// ============================================================================

/// The ten-chapter default outline titled `"{skill} course of {name}"`.
#[must_use]
pub fn default_outline(profile: &UserProfile, skill: &Skill) -> OutlineRecord {
    let skill_name = skill.name();
    let mut chapters = Vec::with_capacity(DEFAULT_CHAPTERS.len() + 1);
    chapters.push(ChapterRecord::stub(
        format!("Chapter 1: Introduction to {skill_name}"),
        format!("Learn the history and uses of {skill_name}"),
    ));
    chapters.extend(
        DEFAULT_CHAPTERS
            .iter()
            .enumerate()
            .map(|(i, (title, description))| {
                ChapterRecord::stub(format!("Chapter {}: {title}", i + 2), *description)
            }),
    );

    OutlineRecord::new(
        format!("{skill_name} course of {}", profile.name()),
        chapters,
    )
}

/// Default chapter content: a theory unit and a practice unit, each with one
/// screen holding an HTML block and a problem.
#[must_use]
pub fn default_chapter(title: &str, description: &str, profile: &UserProfile) -> ChapterRecord {
    let escaped = escape_xml(title);
    let level = profile.level_name();

    let theory = VerticalRecord::new()
        .with_html(format!(
            "<p>This unit covers the fundamentals of {escaped}.</p>\n<p>{}</p>\n<p>Written for {level} learners.</p>",
            escape_xml(description)
        ))
        .with_problem(format!(
            "<problem>\n  <multiplechoiceresponse>\n    <label>Which statement about {escaped} is correct?</label>\n    <choicegroup type=\"MultipleChoice\">\n      <choice correct=\"true\">The statement covered in this unit</choice>\n      <choice correct=\"false\">A common misconception</choice>\n    </choicegroup>\n  </multiplechoiceresponse>\n</problem>\n"
        ));

    let practice = VerticalRecord::new()
        .with_html(format!(
            "<p>This unit applies {escaped} in practice.</p>\n<p>It contains code examples and exercises.</p>"
        ))
        .with_problem(format!(
            "<problem>\n  <stringresponse answer=\"done\">\n    <label>Work through the {escaped} exercise and type 'done' when finished.</label>\n    <textline size=\"20\"/>\n  </stringresponse>\n</problem>\n"
        ));

    ChapterRecord {
        chapter_title: Some(title.to_string()),
        description: Some(description.to_string()),
        sequentials: Some(vec![
            SequentialRecord::new(format!("Unit 1: {title} Fundamentals"), vec![theory]),
            SequentialRecord::new(format!("Unit 2: {title} in Practice"), vec![practice]),
        ]),
        ..ChapterRecord::default()
    }
}

/// Default yes/no assessment questions.
#[must_use]
pub fn default_questions(skill: &Skill) -> Vec<String> {
    let name = skill.name();
    vec![
        format!("Do you understand the basic concepts behind {name}?"),
        "Have you used a similar language or tool before?".to_string(),
        format!("Have you completed a project that involved {name}?"),
        format!("Can you read and explain a short {name} example?"),
        format!("Could you debug a failing {name} program on your own?"),
    ]
}

fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "true" | "是" | "对"
    )
}

// ============================================================================
// TemplateProvider
// ============================================================================

/// Provider answering from fixed templates.
///
/// Its critiques never contain the completion markers, so every review stage
/// runs to its round budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateProvider;

impl TemplateProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Records a call as a user/assistant pair so template sessions leave the
/// same transcript shape as chat sessions.
fn record(transcript: &mut Transcript, request: String, response: &str) {
    transcript.push_user(request);
    transcript.push_assistant(response);
}

impl ContentProvider for TemplateProvider {
    fn name(&self) -> &str {
        "template"
    }

    fn generate_outline(
        &mut self,
        profile: &UserProfile,
        skill: &Skill,
        transcript: &mut Transcript,
    ) -> Result<OutlineRecord> {
        let outline = default_outline(profile, skill);
        record(
            transcript,
            format!("Generate a course outline on {} for {}", skill.name(), profile.name()),
            &serde_json::to_string(&outline)?,
        );
        Ok(outline)
    }

    fn critique(&mut self, draft: &Draft, transcript: &mut Transcript) -> Result<Critique> {
        let text = match draft {
            Draft::Outline(_) => OUTLINE_CRITIQUE,
            Draft::Chapter(_) => CHAPTER_CRITIQUE,
            Draft::Course(_) => COURSE_CRITIQUE,
        };
        record(transcript, format!("Review the {}", draft.kind()), text);
        Ok(Critique::new(text))
    }

    fn revise(
        &mut self,
        draft: &Draft,
        critique: &Critique,
        transcript: &mut Transcript,
    ) -> Result<Draft> {
        let revised = match draft {
            Draft::Outline(outline) => {
                let mut outline = outline.clone();
                for chapter in &mut outline.chapters {
                    if let Some(description) = &mut chapter.description {
                        description.push_str(PRACTICE_SUFFIX);
                    }
                }
                Draft::Outline(outline)
            }
            Draft::Chapter(chapter) => {
                let mut chapter = chapter.clone();
                append_to_html(&mut chapter, CODE_EXAMPLE);
                Draft::Chapter(chapter)
            }
            Draft::Course(course) => {
                let mut course = course.clone();
                for chapter in &mut course.chapters {
                    append_to_html(chapter, TERMINOLOGY_NOTE);
                }
                Draft::Course(course)
            }
        };
        record(
            transcript,
            format!("Revise the {} based on: {}", draft.kind(), critique.text),
            &revised.to_json_pretty()?,
        );
        Ok(revised)
    }

    fn generate_chapter(
        &mut self,
        title: &str,
        description: &str,
        profile: &UserProfile,
        transcript: &mut Transcript,
    ) -> Result<ChapterRecord> {
        let chapter = default_chapter(title, description, profile);
        record(
            transcript,
            format!("Generate content for chapter '{title}'"),
            &serde_json::to_string(&chapter)?,
        );
        Ok(chapter)
    }

    fn generate_assessment_questions(
        &mut self,
        skill: &Skill,
        transcript: &mut Transcript,
    ) -> Result<Vec<String>> {
        let mut questions = default_questions(skill);
        questions.truncate(MAX_ASSESSMENT_QUESTIONS);
        record(
            transcript,
            format!("Generate assessment questions for {}", skill.name()),
            &questions.join("\n"),
        );
        Ok(questions)
    }

    fn analyze_responses(
        &mut self,
        skill: &Skill,
        answers: &[(String, String)],
        transcript: &mut Transcript,
    ) -> Result<AssessmentResult> {
        let affirmative = answers.iter().filter(|(_, a)| is_affirmative(a)).count();
        let mut result = AssessmentResult::fallback(skill.name());
        result.level = SkillLevel::from_correct_answers(affirmative);
        result.explanation = format!(
            "{affirmative} of {} answers were affirmative, which places you at the {} level.",
            answers.len(),
            result.level.name()
        );
        record(
            transcript,
            format!("Analyze {} assessment answers", answers.len()),
            &result.explanation,
        );
        Ok(result)
    }
}

fn append_to_html(chapter: &mut ChapterRecord, suffix: &str) {
    let verticals = chapter
        .sequentials
        .iter_mut()
        .flatten()
        .flat_map(|s| s.verticals.iter_mut());
    for vertical in verticals {
        if let Some(html) = &mut vertical.html {
            html.push_str(suffix);
        }
    }
}
