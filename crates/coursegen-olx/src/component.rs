//! Leaf content units attached to a vertical.

use crate::container::RenderedFiles;
use crate::{Identifier, Result};

/// Type tag of a [`Component`].
///
/// The tag doubles as the directory name for the component's files and as
/// the element name of the reference line in the parent vertical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Raw HTML block.
    Html,
    /// Quiz problem in OLX problem markup.
    Problem,
}

impl ComponentKind {
    /// Returns the element/directory tag for this kind.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Problem => "problem",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Smallest content unit of a course.
///
/// Payloads are stored verbatim. Problem markup in particular is trusted as
/// produced by the content provider and is not validated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    /// An HTML block.
    Html {
        /// Stable node handle.
        identifier: Identifier,
        /// HTML body text.
        content: String,
    },
    /// A quiz problem.
    Problem {
        /// Stable node handle.
        identifier: Identifier,
        /// Complete `<problem>` markup.
        markup: String,
    },
}

impl Component {
    /// Creates an HTML component with a fresh identifier.
    #[must_use]
    pub fn html(content: impl Into<String>) -> Self {
        Self::Html {
            identifier: Identifier::new(),
            content: content.into(),
        }
    }

    /// Creates a problem component with a fresh identifier.
    #[must_use]
    pub fn problem(markup: impl Into<String>) -> Self {
        Self::Problem {
            identifier: Identifier::new(),
            markup: markup.into(),
        }
    }

    /// Returns the component's type tag.
    #[must_use]
    pub const fn kind(&self) -> ComponentKind {
        match self {
            Self::Html { .. } => ComponentKind::Html,
            Self::Problem { .. } => ComponentKind::Problem,
        }
    }

    /// Returns the component's identifier.
    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        match self {
            Self::Html { identifier, .. } | Self::Problem { identifier, .. } => identifier,
        }
    }

    /// Renders the component to its OLX files.
    ///
    /// HTML components always produce two files: the `.html` body and the
    /// `.xml` descriptor pointing at it. Problem components produce a single
    /// `.xml` file containing the markup as given.
    pub fn render(&self) -> Result<RenderedFiles> {
        let mut files = RenderedFiles::new();
        match self {
            Self::Html {
                identifier,
                content,
            } => {
                files.insert(
                    format!("html/{identifier}.html"),
                    format!("<html>\n{content}\n</html>\n"),
                )?;
                files.insert(
                    format!("html/{identifier}.xml"),
                    format!("<html filename=\"{identifier}\" />\n"),
                )?;
            }
            Self::Problem { identifier, markup } => {
                files.insert(format!("problem/{identifier}.xml"), markup.clone())?;
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fixed_id(value: &str) -> Identifier {
        Identifier::parse(value).unwrap()
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(ComponentKind::Html.tag(), "html");
        assert_eq!(ComponentKind::Problem.tag(), "problem");
        assert_eq!(Component::html("x").kind(), ComponentKind::Html);
        assert_eq!(Component::problem("<problem/>").kind(), ComponentKind::Problem);
    }

    #[test]
    fn test_html_renders_body_and_descriptor() {
        let component = Component::Html {
            identifier: fixed_id("h1"),
            content: "<p>Hello</p>".to_string(),
        };

        let files = component.render().unwrap();

        assert_eq!(files.len(), 2);
        insta::assert_snapshot!(files.get("html/h1.html").unwrap(), @r"
        <html>
        <p>Hello</p>
        </html>
        ");
        assert_eq!(
            files.get("html/h1.xml").unwrap(),
            "<html filename=\"h1\" />\n"
        );
    }

    #[test]
    fn test_problem_renders_markup_verbatim() {
        let markup = "<problem><p>Q?</p><choiceresponse/></problem>";
        let component = Component::Problem {
            identifier: fixed_id("p1"),
            markup: markup.to_string(),
        };

        let files = component.render().unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files.get("problem/p1.xml").unwrap(), markup);
    }

    #[test]
    fn test_fresh_components_get_distinct_identifiers() {
        let a = Component::html("same");
        let b = Component::html("same");
        assert_ne!(a.identifier(), b.identifier());
    }
}
