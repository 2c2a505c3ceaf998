//! Configuration types for course generation.
//!
//! This module provides the session configuration: iteration bound, content
//! provider selection, chat API settings, course identity and the completion
//! markers used by the review loop.

use std::path::Path;

use coursegen_olx::{CourseOptions, Identifier};
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};
use crate::provider::CompletionPredicate;

/// The default config file name.
pub const CONFIG_FILE_NAME: &str = "coursegen.json";

/// Upper bound for `maxIterations`.
pub const MAX_ITERATIONS_LIMIT: u32 = 20;

/// Default maximum review rounds.
const fn default_max_iterations() -> u32 {
    1
}

/// Default per-request timeout for chat providers.
const fn default_request_timeout() -> u64 {
    120
}

/// Default output directory for archives.
fn default_output_dir() -> String {
    "output".to_string()
}

fn default_org() -> String {
    "DefaultOrg".to_string()
}

fn default_run() -> String {
    "run1".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_quality_marker() -> String {
    "良好".to_string()
}

fn default_done_marker() -> String {
    "完成".to_string()
}

/// Default value for boolean options that default to true.
const fn default_true() -> bool {
    true
}

/// Main configuration for a generation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Bound on review/revise rounds. `0` and `1` mean no revisions.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Content provider to use.
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model name override for chat providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Base URL override for chat providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Timeout for a single chat request in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Directory receiving the staged course and archive.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Organization code written to `course.xml`.
    #[serde(default = "default_org")]
    pub org: String,

    /// Run code written to `course.xml`.
    #[serde(default = "default_run")]
    pub run: String,

    /// Course language code.
    #[serde(default = "default_language")]
    pub language: String,

    /// Whether to run the whole-course review stage.
    #[serde(default = "default_true")]
    pub full_course_review: bool,

    /// Markers for the text-based completion check.
    #[serde(default)]
    pub completion: CompletionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            provider: ProviderKind::default(),
            model: None,
            api_base_url: None,
            request_timeout_secs: default_request_timeout(),
            output_dir: default_output_dir(),
            org: default_org(),
            run: default_run(),
            language: default_language(),
            full_course_review: default_true(),
            completion: CompletionConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `coursegen.json` in the current directory. If not found,
    /// returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            GenerationError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `coursegen.json` in a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::ConfigParseError` if the file exists but
    /// contains invalid JSON or invalid enum values.
    ///
    /// Returns `GenerationError::ConfigValidationError` if the configuration
    /// values are invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(GenerationError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| GenerationError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(GenerationError::config_validation(
                format!(
                    "maxIterations must be at most {MAX_ITERATIONS_LIMIT}, got {}",
                    self.max_iterations
                ),
                "Lower maxIterations in your coursegen.json; each round costs one or two provider calls per chapter",
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(GenerationError::config_validation(
                "requestTimeoutSecs must be greater than 0",
                "Set requestTimeoutSecs to at least 1 second in your coursegen.json",
            ));
        }

        if self.output_dir.trim().is_empty() {
            return Err(GenerationError::config_validation(
                "outputDir must not be empty",
                "Provide a valid output directory path in your coursegen.json (use '.' for current directory)",
            ));
        }

        if Identifier::parse(self.org.as_str()).is_err() {
            return Err(GenerationError::config_validation(
                format!("org '{}' is not a valid code", self.org),
                "Use only letters, digits, '_' and '-' for org",
            ));
        }

        if Identifier::parse(self.run.as_str()).is_err() {
            return Err(GenerationError::config_validation(
                format!("run '{}' is not a valid code", self.run),
                "Use only letters, digits, '_' and '-' for run (e.g. 'run1')",
            ));
        }

        if self.language.trim().is_empty() {
            return Err(GenerationError::config_validation(
                "language must not be empty",
                "Set language to a code such as 'en' or 'zh' in your coursegen.json",
            ));
        }

        if self.completion.quality_marker.is_empty() || self.completion.done_marker.is_empty() {
            return Err(GenerationError::config_validation(
                "completion markers must not be empty",
                "Set completion.qualityMarker and completion.doneMarker, or remove the completion block",
            ));
        }

        Ok(())
    }

    /// Organization, run and language for the course tree.
    #[must_use]
    pub fn course_options(&self) -> CourseOptions {
        CourseOptions {
            org: self.org.clone(),
            run: self.run.clone(),
            language: self.language.clone(),
        }
    }

    /// The text-based completion check built from the configured markers.
    #[must_use]
    pub fn completion_predicate(&self) -> CompletionPredicate {
        CompletionPredicate::new(
            self.completion.quality_marker.as_str(),
            self.completion.done_marker.as_str(),
        )
    }

    /// Effective model name: override or the provider's default.
    #[must_use]
    pub fn effective_model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Effective API base URL: override or the provider's default.
    #[must_use]
    pub fn effective_base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

/// Markers that must both appear in a critique for it to count as approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConfig {
    /// "Quality is acceptable" marker.
    #[serde(default = "default_quality_marker")]
    pub quality_marker: String,

    /// "Nothing further needed" marker.
    #[serde(default = "default_done_marker")]
    pub done_marker: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            quality_marker: default_quality_marker(),
            done_marker: default_done_marker(),
        }
    }
}

// ============================================================================
// ProviderKind
// ============================================================================

/// Supported content providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderKind {
    /// Deterministic built-in templates (default, needs no network).
    #[default]
    Template,
    /// `DeepSeek` chat completions API.
    DeepSeek,
    /// Zhipu GLM chat completions API.
    Glm,
}

impl ProviderKind {
    /// Parses a string into a `ProviderKind`, case-insensitively.
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "template" => Some(Self::Template),
            "deepseek" => Some(Self::DeepSeek),
            "glm" => Some(Self::Glm),
            _ => None,
        }
    }

    /// Lowercase name as used in config files and on the command line.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::DeepSeek => "deepseek",
            Self::Glm => "glm",
        }
    }

    /// Environment variable holding the API key, if the provider needs one.
    #[must_use]
    pub const fn api_key_variable(&self) -> Option<&'static str> {
        match self {
            Self::Template => None,
            Self::DeepSeek => Some("DEEPSEEK_API_KEY"),
            Self::Glm => Some("GLM_API_KEY"),
        }
    }

    /// Default model name.
    #[must_use]
    pub const fn default_model(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::DeepSeek => "deepseek-chat",
            Self::Glm => "glm-4-long",
        }
    }

    /// Default API base URL (without the `/chat/completions` suffix).
    #[must_use]
    pub const fn default_base_url(&self) -> &'static str {
        match self {
            Self::Template => "",
            Self::DeepSeek => "https://api.deepseek.com",
            Self::Glm => "https://open.bigmodel.cn/api/paas/v4",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_str_case_insensitive(s).ok_or_else(|| {
            format!("invalid provider '{s}': expected one of 'template', 'deepseek', 'glm'")
        })
    }
}

impl<'de> Deserialize<'de> for ProviderKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for ProviderKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
