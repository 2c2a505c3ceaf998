//! Learner profile, target skill and skill assessment.

use serde::{Deserialize, Serialize};

/// Maximum number of assessment questions asked per session.
pub const MAX_ASSESSMENT_QUESTIONS: usize = 5;

/// Number of learning objectives in an assessment result.
pub const ASSESSMENT_OBJECTIVES: usize = 5;

// ============================================================================
// SkillLevel
// ============================================================================

/// Ordinal skill level of a learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkillLevel {
    /// 初级
    Beginner,
    /// 中级
    Intermediate,
    /// 高级
    Advanced,
}

impl SkillLevel {
    /// Maps a count of correct assessment answers to a level.
    ///
    /// Up to 3 correct is beginner, up to 7 intermediate, anything above
    /// advanced.
    ///
    /// # Examples
    ///
    /// ```
    /// use coursegen_orchestrator::SkillLevel;
    ///
    /// assert_eq!(SkillLevel::from_correct_answers(3), SkillLevel::Beginner);
    /// assert_eq!(SkillLevel::from_correct_answers(4), SkillLevel::Intermediate);
    /// assert_eq!(SkillLevel::from_correct_answers(8), SkillLevel::Advanced);
    /// ```
    #[must_use]
    pub const fn from_correct_answers(correct: usize) -> Self {
        match correct {
            0..=3 => Self::Beginner,
            4..=7 => Self::Intermediate,
            _ => Self::Advanced,
        }
    }

    /// English name, used in prompts and serialized output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// Chinese label, used for display.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Beginner => "初级",
            Self::Intermediate => "中级",
            Self::Advanced => "高级",
        }
    }

    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" | "初级" => Some(Self::Beginner),
            "intermediate" | "中级" => Some(Self::Intermediate),
            "advanced" | "高级" => Some(Self::Advanced),
            _ => None,
        }
    }
}

impl std::fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for SkillLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_str_case_insensitive(s).ok_or_else(|| {
            format!(
                "invalid skill level '{s}': expected one of 'beginner', 'intermediate', 'advanced' (or 初级, 中级, 高级)"
            )
        })
    }
}

impl<'de> Deserialize<'de> for SkillLevel {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for SkillLevel {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

// ============================================================================
// UserProfile and Skill
// ============================================================================

/// A learner: name, assessed level and distinct learning goals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    name: String,
    skill_level: Option<SkillLevel>,
    learning_goals: Vec<String>,
}

impl UserProfile {
    /// Creates a profile with no level and no goals.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skill_level: None,
            learning_goals: Vec::new(),
        }
    }

    /// Sets the level explicitly, bypassing assessment.
    #[must_use]
    pub const fn with_skill_level(mut self, level: SkillLevel) -> Self {
        self.skill_level = Some(level);
        self
    }

    /// Returns the learner's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the assessed level, if any.
    #[must_use]
    pub const fn skill_level(&self) -> Option<SkillLevel> {
        self.skill_level
    }

    /// Returns the learning goals in insertion order.
    #[must_use]
    pub fn learning_goals(&self) -> &[String] {
        &self.learning_goals
    }

    /// Assesses and stores the level from yes/no answers.
    pub fn assess_skill_level(&mut self, answers: &[bool]) -> SkillLevel {
        let correct = answers.iter().filter(|&&a| a).count();
        let level = SkillLevel::from_correct_answers(correct);
        self.skill_level = Some(level);
        level
    }

    /// Stores the level produced by a provider-graded assessment.
    pub fn apply_assessment(&mut self, result: &AssessmentResult) {
        self.skill_level = Some(result.level);
    }

    /// Adds a learning goal unless it is blank or already present.
    ///
    /// Returns `true` if the goal was added.
    pub fn add_learning_goal(&mut self, goal: impl Into<String>) -> bool {
        let goal = goal.into();
        let goal = goal.trim();
        if goal.is_empty() || self.learning_goals.iter().any(|g| g == goal) {
            return false;
        }
        self.learning_goals.push(goal.to_string());
        true
    }

    /// Level as used in generated text, `unassessed` if none is set.
    #[must_use]
    pub fn level_name(&self) -> &'static str {
        self.skill_level.map_or("unassessed", |l| l.name())
    }
}

/// The subject a learner wants to study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    name: String,
    description: String,
}

impl Skill {
    /// Creates a skill.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Returns the skill name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the free-text description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

// ============================================================================
// AssessmentResult
// ============================================================================

/// Outcome of a provider-graded skill assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResult {
    /// Assessed level.
    pub level: SkillLevel,
    /// Why this level was chosen.
    pub explanation: String,
    /// Learning objectives.
    pub objectives: Vec<String>,
    /// Suggested path through the material.
    pub learning_path: String,
}

impl AssessmentResult {
    /// Deterministic result used when grading fails.
    #[must_use]
    pub fn fallback(skill_name: &str) -> Self {
        Self {
            level: SkillLevel::Beginner,
            explanation: format!(
                "The answers could not be analyzed, so the {skill_name} course starts at the beginner level."
            ),
            objectives: vec![
                format!("Understand the core concepts of {skill_name}"),
                format!("Set up a working {skill_name} environment"),
                format!("Apply {skill_name} fundamentals in small exercises"),
                format!("Read and debug simple {skill_name} examples"),
                format!("Complete a small {skill_name} project"),
            ],
            learning_path: format!(
                "Start with the basics of {skill_name}, practice each concept with exercises, then finish with a project."
            ),
        }
    }

    /// Caps the objective list at [`ASSESSMENT_OBJECTIVES`] entries.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.objectives.truncate(ASSESSMENT_OBJECTIVES);
        self
    }
}
