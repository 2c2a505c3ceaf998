//! Chat-completion content provider.
//!
//! Talks to an OpenAI-compatible `/chat/completions` endpoint (DeepSeek and
//! GLM both speak it). The whole session transcript is sent with every
//! request, so the model sees earlier outlines and critiques when revising.

use std::time::Duration;

use coursegen_olx::{ChapterRecord, OutlineRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{Config, ProviderKind};
use crate::error::{GenerationError, ProviderErrorKind, Result};
use crate::profile::{AssessmentResult, Skill, UserProfile, MAX_ASSESSMENT_QUESTIONS};
use crate::provider::{outline_problem, ContentProvider, Critique, Draft};
use crate::transcript::{Message, Transcript};

const SYSTEM_PROMPT: &str = "You are an experienced instructional designer who builds personalized \
online courses. When asked for structured content, answer with a single JSON object inside a \
```json code fence and nothing else.";

const TEMPERATURE: f32 = 0.7;

static VERDICT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)verdict\s*[:：]\s*(approved|revise)").ok());

// ============================================================================
// Response parsing
// ============================================================================

/// Extracts the JSON payload from a model answer.
///
/// Prefers the body of a ```` ```json ```` fence, then the span from the
/// first `{` to the last `}`, then the trimmed text as-is.
#[must_use]
pub fn extract_json(text: &str) -> &str {
    const FENCE: &str = "```json";

    if let Some(start) = text.find(FENCE) {
        let body = &text[start + FENCE.len()..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

/// Parses the JSON payload of a model answer, reporting failures as
/// malformed responses of `call`.
pub fn parse_json<T: DeserializeOwned>(call: &str, text: &str) -> Result<T> {
    serde_json::from_str(extract_json(text))
        .map_err(|e| GenerationError::malformed(call, format!("invalid JSON: {e}")))
}

/// Reads an explicit `Verdict: approved|revise` line; the last one wins.
#[must_use]
pub fn parse_verdict(text: &str) -> Option<bool> {
    let regex = VERDICT.as_ref()?;
    regex
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .last()
        .map(|m| m.as_str().eq_ignore_ascii_case("approved"))
}

fn check_shape(call: &str, draft: &Draft) -> Result<()> {
    match draft.shape_problem() {
        Some(problem) => Err(GenerationError::malformed(call, problem)),
        None => Ok(()),
    }
}

fn classify(error: &reqwest::Error) -> ProviderErrorKind {
    if error.is_timeout() || error.is_connect() {
        ProviderErrorKind::Network
    } else if let Some(status) = error.status() {
        ProviderErrorKind::from_status(status.as_u16())
    } else {
        ProviderErrorKind::Other
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuestionList {
    #[serde(default)]
    questions: Vec<String>,
}

// ============================================================================
// ChatProvider
// ============================================================================

/// Content provider backed by a chat-completion model.
pub struct ChatProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
    kind: ProviderKind,
}

impl std::fmt::Debug for ChatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatProvider")
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ChatProvider {
    /// Creates a provider for `base_url` (without `/chat/completions`).
    pub fn new(
        kind: ProviderKind,
        base_url: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::provider(ProviderErrorKind::Other, e.to_string()))?;

        Ok(Self::with_client(kind, base_url, model, api_key, client))
    }

    fn with_client(
        kind: ProviderKind,
        base_url: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
        client: reqwest::blocking::Client,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key: api_key.into(),
            kind,
        }
    }

    /// Creates the provider selected by `config`, reading its API key from
    /// the environment.
    pub fn from_config(config: &Config) -> Result<Self> {
        let key = config
            .provider
            .api_key_variable()
            .and_then(|variable| std::env::var(variable).ok());
        Self::from_config_and_key(config, key)
    }

    /// Like [`ChatProvider::from_config`] with an explicitly supplied key.
    pub fn from_config_and_key(config: &Config, api_key: Option<String>) -> Result<Self> {
        let Some(variable) = config.provider.api_key_variable() else {
            return Err(GenerationError::config_validation(
                format!("provider '{}' is not a chat provider", config.provider),
                "Use 'deepseek' or 'glm' for chat generation",
            ));
        };
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerationError::missing_api_key(variable))?;

        Self::new(
            config.provider,
            config.effective_base_url(),
            config.effective_model(),
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Full URL requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Model name sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `prompt` with the session history and returns the answer text.
    fn complete(&self, call: &str, transcript: &mut Transcript, prompt: String) -> Result<String> {
        if transcript.is_empty() {
            transcript.push_system(SYSTEM_PROMPT);
        }
        transcript.push_user(prompt);

        debug!(
            call,
            model = %self.model,
            messages = transcript.len(),
            "Sending chat completion request"
        );

        let request = ChatRequest {
            model: &self.model,
            messages: transcript.messages(),
            temperature: TEMPERATURE,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| GenerationError::provider(classify(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::provider(
                ProviderErrorKind::from_status(status.as_u16()),
                format!("HTTP {status}: {body}"),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| GenerationError::malformed(call, format!("unreadable response body: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::malformed(call, "response has no message content"))?;

        transcript.push_assistant(content.as_str());
        Ok(content)
    }
}

fn outline_prompt(profile: &UserProfile, skill: &Skill) -> String {
    let goals = if profile.learning_goals().is_empty() {
        "none stated".to_string()
    } else {
        profile.learning_goals().join("; ")
    };
    format!(
        "Design a course outline on {skill} for {name}, a {level} learner.\n\
         Skill description: {description}\n\
         Learning goals: {goals}\n\n\
         Answer with JSON of the form \
         {{\"course_title\": \"...\", \"chapters\": [{{\"title\": \"...\", \"description\": \"...\"}}]}}.",
        skill = skill.name(),
        name = profile.name(),
        level = profile.level_name(),
        description = skill.description(),
    )
}

fn chapter_prompt(title: &str, description: &str, profile: &UserProfile) -> String {
    format!(
        "Write detailed content for the chapter \"{title}\" ({description}) for a {level} learner.\n\
         Split it into units, each with one or more screens. A screen has optional \"html\" \
         (an HTML fragment) and optional \"problem\" (a complete <problem> XML document).\n\n\
         Answer with JSON of the form \
         {{\"title\": \"...\", \"sequentials\": [{{\"title\": \"...\", \"verticals\": \
         [{{\"html\": \"...\", \"problem\": \"...\"}}]}}]}}.",
        level = profile.level_name(),
    )
}

fn critique_prompt(draft: &Draft) -> Result<String> {
    Ok(format!(
        "Review this {kind} for structure, accuracy and suitability for the learner:\n\n{json}\n\n\
         End your review with a line 'Verdict: approved' if nothing needs to change, \
         otherwise 'Verdict: revise'.",
        kind = draft.kind(),
        json = draft.to_json_pretty()?,
    ))
}

fn revise_prompt(draft: &Draft, critique: &Critique) -> Result<String> {
    Ok(format!(
        "Revise this {kind} according to the review below. Keep the same JSON structure.\n\n\
         Review:\n{review}\n\n{kind}:\n{json}",
        kind = draft.kind(),
        review = critique.text,
        json = draft.to_json_pretty()?,
    ))
}

impl ContentProvider for ChatProvider {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn generate_outline(
        &mut self,
        profile: &UserProfile,
        skill: &Skill,
        transcript: &mut Transcript,
    ) -> Result<OutlineRecord> {
        const CALL: &str = "generate_outline";
        let text = self.complete(CALL, transcript, outline_prompt(profile, skill))?;
        let outline: OutlineRecord = parse_json(CALL, &text)?;
        if let Some(problem) = outline_problem(&outline) {
            return Err(GenerationError::malformed(CALL, problem));
        }
        Ok(outline)
    }

    fn critique(&mut self, draft: &Draft, transcript: &mut Transcript) -> Result<Critique> {
        let text = self.complete("critique", transcript, critique_prompt(draft)?)?;
        if text.trim().is_empty() {
            return Err(GenerationError::malformed("critique", "empty review"));
        }
        let approved = parse_verdict(&text);
        Ok(Critique { text, approved })
    }

    fn revise(
        &mut self,
        draft: &Draft,
        critique: &Critique,
        transcript: &mut Transcript,
    ) -> Result<Draft> {
        const CALL: &str = "revise";
        let text = self.complete(CALL, transcript, revise_prompt(draft, critique)?)?;
        let revised = match draft {
            Draft::Outline(_) => Draft::Outline(parse_json(CALL, &text)?),
            Draft::Chapter(_) => Draft::Chapter(parse_json(CALL, &text)?),
            Draft::Course(_) => Draft::Course(parse_json(CALL, &text)?),
        };
        check_shape(CALL, &revised)?;
        Ok(revised)
    }

    fn generate_chapter(
        &mut self,
        title: &str,
        description: &str,
        profile: &UserProfile,
        transcript: &mut Transcript,
    ) -> Result<ChapterRecord> {
        const CALL: &str = "generate_chapter";
        let text = self.complete(CALL, transcript, chapter_prompt(title, description, profile))?;
        let chapter: ChapterRecord = parse_json(CALL, &text)?;
        if !chapter.is_detailed() {
            return Err(GenerationError::malformed(CALL, "chapter has no sequentials"));
        }
        Ok(chapter)
    }

    fn generate_assessment_questions(
        &mut self,
        skill: &Skill,
        transcript: &mut Transcript,
    ) -> Result<Vec<String>> {
        const CALL: &str = "generate_assessment_questions";
        let prompt = format!(
            "Write {MAX_ASSESSMENT_QUESTIONS} yes/no questions that gauge a learner's experience \
             with {}. Answer with JSON of the form {{\"questions\": [\"...\"]}}.",
            skill.name()
        );
        let text = self.complete(CALL, transcript, prompt)?;
        let list: QuestionList = parse_json(CALL, &text)?;

        let questions: Vec<String> = list
            .questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(MAX_ASSESSMENT_QUESTIONS)
            .collect();
        if questions.is_empty() {
            return Err(GenerationError::malformed(CALL, "no questions"));
        }
        Ok(questions)
    }

    fn analyze_responses(
        &mut self,
        skill: &Skill,
        answers: &[(String, String)],
        transcript: &mut Transcript,
    ) -> Result<AssessmentResult> {
        const CALL: &str = "analyze_responses";
        let pairs = answers
            .iter()
            .map(|(q, a)| format!("Q: {q}\nA: {a}"))
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format!(
            "Assess this learner's {} level from their answers:\n\n{pairs}\n\n\
             Answer with JSON of the form {{\"level\": \"beginner|intermediate|advanced\", \
             \"explanation\": \"...\", \"objectives\": [\"...\"], \"learning_path\": \"...\"}} \
             with exactly five objectives.",
            skill.name()
        );
        let text = self.complete(CALL, transcript, prompt)?;
        let result: AssessmentResult = parse_json(CALL, &text)?;
        if result.objectives.len() < crate::profile::ASSESSMENT_OBJECTIVES {
            warn!(
                objectives = result.objectives.len(),
                "Assessment returned fewer objectives than requested"
            );
        }
        Ok(result.normalized())
    }
}
