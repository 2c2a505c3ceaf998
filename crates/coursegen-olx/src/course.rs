//! The top-level course node and its policy metadata.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::container::{container_descriptor, Chapter, RenderedFiles};
use crate::xml::escape_attr;
use crate::{Identifier, OlxError, Result};

/// Length of the default course schedule.
const DEFAULT_COURSE_WEEKS: i64 = 16;

// ============================================================================
// CourseOptions
// ============================================================================

/// Organization, run and language used when creating a [`Course`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseOptions {
    /// Organization code.
    pub org: String,
    /// Run code, e.g. `run1`.
    pub run: String,
    /// Course language code.
    pub language: String,
}

impl Default for CourseOptions {
    fn default() -> Self {
        Self {
            org: "DefaultOrg".to_string(),
            run: "run1".to_string(),
            language: "en".to_string(),
        }
    }
}

// ============================================================================
// CoursePolicy
// ============================================================================

/// One navigation tab in the course policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTab {
    /// Whether only course staff see the tab.
    pub course_staff_only: bool,
    /// Tab label.
    pub name: String,
    /// Platform tab type.
    #[serde(rename = "type")]
    pub tab_type: String,
}

impl PolicyTab {
    fn visible(name: &str, tab_type: &str) -> Self {
        Self {
            course_staff_only: false,
            name: name.to_string(),
            tab_type: tab_type.to_string(),
        }
    }
}

/// A discussion topic entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionTopic {
    /// Topic id.
    pub id: String,
}

/// Display, schedule and feature metadata written to `policy.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoursePolicy {
    /// Course display name.
    pub display_name: String,
    /// Enrollment start.
    pub start: DateTime<Utc>,
    /// Course end.
    pub end: DateTime<Utc>,
    /// Course language code.
    pub language: String,
    /// Show the calculator tool.
    pub show_calculator: bool,
    /// Show the problem reset button.
    pub show_reset_button: bool,
    /// Navigation tabs in display order.
    pub tabs: Vec<PolicyTab>,
    /// Discussion topics by name.
    pub discussion_topics: BTreeMap<String, DiscussionTopic>,
}

impl CoursePolicy {
    fn new(display_name: &str, language: &str, start: DateTime<Utc>) -> Self {
        let mut discussion_topics = BTreeMap::new();
        discussion_topics.insert(
            "General".to_string(),
            DiscussionTopic {
                id: "course".to_string(),
            },
        );

        Self {
            display_name: display_name.to_string(),
            start,
            end: start + Duration::weeks(DEFAULT_COURSE_WEEKS),
            language: language.to_string(),
            show_calculator: true,
            show_reset_button: true,
            tabs: vec![
                PolicyTab::visible("Course", "course_info"),
                PolicyTab::visible("Discussion", "discussion"),
                PolicyTab::visible("Progress", "progress"),
            ],
            discussion_topics,
        }
    }
}

/// Midnight UTC of the current day.
fn start_of_today() -> DateTime<Utc> {
    let now = Utc::now();
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(now, |midnight| midnight.and_utc())
}

// ============================================================================
// Course
// ============================================================================

/// A whole course: the root of the content tree.
///
/// The course identifier *is* its slug. This keeps the `url_name` in
/// `course.xml`, the policy directory and the `course/` body file in
/// agreement by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    identifier: Identifier,
    title: String,
    org: String,
    run: String,
    language: String,
    policy: CoursePolicy,
    chapters: Vec<Chapter>,
}

impl Course {
    /// Element and directory tag.
    pub const TAG: &'static str = "course";

    /// Creates an empty course shell.
    ///
    /// # Errors
    ///
    /// Returns [`OlxError::InvalidIdentifier`] if the organization or run code
    /// is not path safe.
    pub fn new(title: impl Into<String>, options: &CourseOptions) -> Result<Self> {
        let title = title.into();
        let org = Identifier::parse(options.org.as_str())?;
        let run = Identifier::parse(options.run.as_str())?;
        let policy = CoursePolicy::new(&title, &options.language, start_of_today());

        Ok(Self {
            identifier: Identifier::from_title(&title),
            title,
            org: org.to_string(),
            run: run.to_string(),
            language: options.language.clone(),
            policy,
            chapters: Vec::new(),
        })
    }

    /// Replaces the schedule dates.
    #[must_use]
    pub fn with_schedule(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.policy.start = start;
        self.policy.end = end;
        self
    }

    /// Returns the course identifier (identical to the slug).
    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Returns the filesystem-safe slug derived from the title.
    #[must_use]
    pub fn slug(&self) -> &str {
        self.identifier.as_str()
    }

    /// Returns the course title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the organization code.
    #[must_use]
    pub fn org(&self) -> &str {
        &self.org
    }

    /// Returns the run code.
    #[must_use]
    pub fn run(&self) -> &str {
        &self.run
    }

    /// Returns the language code.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Returns the policy metadata.
    #[must_use]
    pub const fn policy(&self) -> &CoursePolicy {
        &self.policy
    }

    /// Returns the chapters in learner order.
    #[must_use]
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Name of the staging directory and archive root entry: `{slug}-{run}`.
    #[must_use]
    pub fn archive_root_name(&self) -> String {
        format!("{}-{}", self.slug(), self.run)
    }

    /// Appends a chapter.
    pub fn add_chapter(&mut self, chapter: Chapter) {
        self.chapters.push(chapter);
    }

    /// Swaps the chapter at `index`, returning the previous one.
    ///
    /// Returns `None` and leaves the course untouched if `index` is out of
    /// range.
    pub fn replace_chapter(&mut self, index: usize, chapter: Chapter) -> Option<Chapter> {
        self.chapters
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, chapter))
    }

    // ------------------------------------------------------------------------
    // Counts
    // ------------------------------------------------------------------------

    /// Number of sequentials across all chapters.
    #[must_use]
    pub fn sequential_count(&self) -> usize {
        self.chapters.iter().map(|c| c.sequentials().len()).sum()
    }

    /// Number of verticals across all chapters.
    #[must_use]
    pub fn vertical_count(&self) -> usize {
        self.chapters
            .iter()
            .flat_map(Chapter::sequentials)
            .map(|s| s.verticals().len())
            .sum()
    }

    /// Number of components across all chapters.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.chapters
            .iter()
            .flat_map(Chapter::sequentials)
            .flat_map(|s| s.verticals())
            .map(|v| v.components().len())
            .sum()
    }

    // ------------------------------------------------------------------------
    // Validation and rendering
    // ------------------------------------------------------------------------

    /// Checks that every node in the tree carries a distinct identifier.
    ///
    /// # Errors
    ///
    /// Returns [`OlxError::DuplicateIdentifier`] naming the first repeat.
    pub fn validate_identifiers(&self) -> Result<()> {
        let mut seen: HashSet<&Identifier> = HashSet::new();
        let mut duplicate: Option<&Identifier> = None;
        seen.insert(&self.identifier);

        for chapter in &self.chapters {
            chapter.visit_identifiers(&mut |id| {
                if !seen.insert(id) && duplicate.is_none() {
                    duplicate = Some(id);
                }
            });
        }

        match duplicate {
            Some(id) => Err(OlxError::DuplicateIdentifier(id.to_string())),
            None => Ok(()),
        }
    }

    /// Renders the complete course to OLX files.
    ///
    /// Produces `course.xml`, `policy/{id}/policy.json`, `course/{id}.xml`
    /// and the files of every chapter subtree.
    ///
    /// # Errors
    ///
    /// Returns an error if two nodes map to the same path or the policy
    /// cannot be serialized.
    pub fn render(&self) -> Result<RenderedFiles> {
        let mut files = RenderedFiles::new();
        let id = &self.identifier;

        files.insert(
            "course.xml",
            format!(
                "<course url_name=\"{id}\" org=\"{}\" course=\"{}\" run=\"{}\" name=\"{}\" />\n",
                escape_attr(&self.org),
                escape_attr(self.slug()),
                escape_attr(&self.run),
                escape_attr(&self.title),
            ),
        )?;

        let mut policy = BTreeMap::new();
        policy.insert(format!("{}/{id}", Self::TAG), &self.policy);
        files.insert(
            format!("policy/{id}/policy.json"),
            serde_json::to_string_pretty(&policy)?,
        )?;

        files.insert(
            format!("{}/{id}.xml", Self::TAG),
            container_descriptor(
                Self::TAG,
                &[
                    ("display_name", &self.title),
                    ("language", &self.language),
                ],
                self.chapters.iter().map(|c| (Chapter::TAG, c.identifier())),
            ),
        )?;

        for chapter in &self.chapters {
            files.merge(chapter.render()?)?;
        }
        Ok(files)
    }
}

// ============================================================================
// Tests
// ============================================================================
