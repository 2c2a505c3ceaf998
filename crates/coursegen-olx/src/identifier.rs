//! Stable node identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{OlxError, Result};

/// Opaque handle for one node in a course tree.
///
/// The same value is written as the `url_name` attribute in the parent's
/// descriptor and used as the stem of the node's own file, so it is
/// restricted to characters that are safe in both places.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Allocates a fresh 128-bit random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wraps an existing string as an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`OlxError::InvalidIdentifier`] if the value is empty or contains
    /// anything other than letters, digits, `_` and `-`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use coursegen_olx::Identifier;
    ///
    /// assert!(Identifier::parse("python_course").is_ok());
    /// assert!(Identifier::parse("../etc").is_err());
    /// ```
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if is_path_safe(&value) {
            Ok(Self(value))
        } else {
            Err(OlxError::InvalidIdentifier(value))
        }
    }

    /// Derives the course slug identifier from a course title.
    ///
    /// The title is lowercased, whitespace becomes `_`, and any character that
    /// is not a letter, digit, `_` or `-` is dropped. A title with nothing
    /// usable left falls back to `course`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use coursegen_olx::Identifier;
    ///
    /// let id = Identifier::from_title("Python course of Ana");
    /// assert_eq!(id.as_str(), "python_course_of_ana");
    /// ```
    #[must_use]
    pub fn from_title(title: &str) -> Self {
        let slug: String = title
            .trim()
            .chars()
            .flat_map(char::to_lowercase)
            .filter_map(|c| {
                if c.is_whitespace() {
                    Some('_')
                } else if is_slug_char(c) {
                    Some(c)
                } else {
                    None
                }
            })
            .collect();

        if slug.chars().all(|c| c == '_' || c == '-') {
            Self("course".to_string())
        } else {
            Self(slug)
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_slug_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn is_path_safe(value: &str) -> bool {
    !value.is_empty() && value.chars().all(is_slug_char)
}
