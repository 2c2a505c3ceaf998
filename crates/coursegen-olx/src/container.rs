//! Container nodes of the course tree.
//!
//! Every container follows the same recursive pattern: it writes one
//! descriptor file at `{tag}/{identifier}.xml` listing its children by
//! `url_name` in list order, then merges the files of all its descendants.
//! The top-level [`crate::Course`] builds on the same helpers.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::xml::escape_attr;
use crate::{Component, Identifier, OlxError, Result};

// ============================================================================
// RenderedFiles
// ============================================================================

/// Rendered OLX output: relative path to file content.
///
/// Paths are unique; inserting a path twice is an error rather than an
/// overwrite, so one node can never clobber another node's files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedFiles {
    files: BTreeMap<String, String>,
}

impl RenderedFiles {
    /// Creates an empty file set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            files: BTreeMap::new(),
        }
    }

    /// Adds a file.
    ///
    /// # Errors
    ///
    /// Returns [`OlxError::DuplicatePath`] if the path is already present.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) -> Result<()> {
        let path = path.into();
        if self.files.contains_key(&path) {
            return Err(OlxError::DuplicatePath(path));
        }
        self.files.insert(path, content.into());
        Ok(())
    }

    /// Moves every file of `other` into this set.
    ///
    /// # Errors
    ///
    /// Returns [`OlxError::DuplicatePath`] on the first colliding path.
    pub fn merge(&mut self, other: Self) -> Result<()> {
        for (path, content) in other.files {
            self.insert(path, content)?;
        }
        Ok(())
    }

    /// Returns the content stored at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Returns `true` if a file exists at `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no files were rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterates over `(path, content)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    /// Iterates over paths under a top-level directory, e.g. `"chapter"`.
    pub fn paths_under<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.files.keys().map(String::as_str).filter(move |p| {
            p.strip_prefix(dir)
                .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

impl IntoIterator for RenderedFiles {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

/// Writes the descriptor of a container: opening tag, one reference line per
/// child in order, closing tag.
pub(crate) fn container_descriptor<'a>(
    tag: &str,
    attributes: &[(&str, &str)],
    children: impl IntoIterator<Item = (&'a str, &'a Identifier)>,
) -> String {
    let mut output = String::new();
    let _ = write!(output, "<{tag}");
    for (name, value) in attributes {
        let _ = write!(output, " {name}=\"{}\"", escape_attr(value));
    }
    let _ = writeln!(output, ">");
    for (child_tag, identifier) in children {
        let _ = writeln!(output, "  <{child_tag} url_name=\"{identifier}\" />");
    }
    let _ = writeln!(output, "</{tag}>");
    output
}

// ============================================================================
// Vertical
// ============================================================================

/// One learning screen: an ordered list of components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertical {
    identifier: Identifier,
    display_name: String,
    components: Vec<Component>,
}

impl Vertical {
    /// Element and directory tag.
    pub const TAG: &'static str = "vertical";

    /// Creates a vertical with a fresh identifier.
    #[must_use]
    pub fn new(display_name: impl Into<String>, components: Vec<Component>) -> Self {
        Self::with_identifier(Identifier::new(), display_name, components)
    }

    /// Creates a vertical with an explicit identifier.
    #[must_use]
    pub fn with_identifier(
        identifier: Identifier,
        display_name: impl Into<String>,
        components: Vec<Component>,
    ) -> Self {
        Self {
            identifier,
            display_name: display_name.into(),
            components,
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the components in learner order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Renders the vertical descriptor and all component files.
    pub fn render(&self) -> Result<RenderedFiles> {
        let mut files = RenderedFiles::new();
        files.insert(
            format!("{}/{}.xml", Self::TAG, self.identifier),
            container_descriptor(
                Self::TAG,
                &[("display_name", &self.display_name)],
                self.components
                    .iter()
                    .map(|c| (c.kind().tag(), c.identifier())),
            ),
        )?;
        for component in &self.components {
            files.merge(component.render()?)?;
        }
        Ok(files)
    }

    pub(crate) fn visit_identifiers<'a>(&'a self, visit: &mut impl FnMut(&'a Identifier)) {
        visit(&self.identifier);
        for component in &self.components {
            visit(component.identifier());
        }
    }
}

// ============================================================================
// Sequential
// ============================================================================

/// A learning unit: an ordered list of verticals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequential {
    identifier: Identifier,
    display_name: String,
    verticals: Vec<Vertical>,
}

impl Sequential {
    /// Element and directory tag.
    pub const TAG: &'static str = "sequential";

    /// Creates a sequential with a fresh identifier.
    #[must_use]
    pub fn new(display_name: impl Into<String>, verticals: Vec<Vertical>) -> Self {
        Self::with_identifier(Identifier::new(), display_name, verticals)
    }

    /// Creates a sequential with an explicit identifier.
    #[must_use]
    pub fn with_identifier(
        identifier: Identifier,
        display_name: impl Into<String>,
        verticals: Vec<Vertical>,
    ) -> Self {
        Self {
            identifier,
            display_name: display_name.into(),
            verticals,
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the verticals in learner order.
    #[must_use]
    pub fn verticals(&self) -> &[Vertical] {
        &self.verticals
    }

    /// Renders the sequential descriptor and all descendant files.
    pub fn render(&self) -> Result<RenderedFiles> {
        let mut files = RenderedFiles::new();
        files.insert(
            format!("{}/{}.xml", Self::TAG, self.identifier),
            container_descriptor(
                Self::TAG,
                &[("display_name", &self.display_name)],
                self.verticals
                    .iter()
                    .map(|v| (Vertical::TAG, v.identifier())),
            ),
        )?;
        for vertical in &self.verticals {
            files.merge(vertical.render()?)?;
        }
        Ok(files)
    }

    pub(crate) fn visit_identifiers<'a>(&'a self, visit: &mut impl FnMut(&'a Identifier)) {
        visit(&self.identifier);
        for vertical in &self.verticals {
            vertical.visit_identifiers(visit);
        }
    }
}

// ============================================================================
// Chapter
// ============================================================================

/// A course chapter: an ordered list of sequentials.
///
/// A chapter built from an outline stub has no sequentials yet; the course
/// can swap it for an enriched chapter later via
/// [`crate::Course::replace_chapter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    identifier: Identifier,
    display_name: String,
    sequentials: Vec<Sequential>,
}

impl Chapter {
    /// Element and directory tag.
    pub const TAG: &'static str = "chapter";

    /// Creates a chapter with a fresh identifier.
    #[must_use]
    pub fn new(display_name: impl Into<String>, sequentials: Vec<Sequential>) -> Self {
        Self::with_identifier(Identifier::new(), display_name, sequentials)
    }

    /// Creates a chapter shell with no sequentials.
    #[must_use]
    pub fn empty(display_name: impl Into<String>) -> Self {
        Self::new(display_name, Vec::new())
    }

    /// Creates a chapter with an explicit identifier.
    #[must_use]
    pub fn with_identifier(
        identifier: Identifier,
        display_name: impl Into<String>,
        sequentials: Vec<Sequential>,
    ) -> Self {
        Self {
            identifier,
            display_name: display_name.into(),
            sequentials,
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the sequentials in learner order.
    #[must_use]
    pub fn sequentials(&self) -> &[Sequential] {
        &self.sequentials
    }

    /// Returns `true` if the chapter has no content yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequentials.is_empty()
    }

    /// Renders the chapter descriptor and all descendant files.
    pub fn render(&self) -> Result<RenderedFiles> {
        let mut files = RenderedFiles::new();
        files.insert(
            format!("{}/{}.xml", Self::TAG, self.identifier),
            container_descriptor(
                Self::TAG,
                &[("display_name", &self.display_name)],
                self.sequentials
                    .iter()
                    .map(|s| (Sequential::TAG, s.identifier())),
            ),
        )?;
        for sequential in &self.sequentials {
            files.merge(sequential.render()?)?;
        }
        Ok(files)
    }

    pub(crate) fn visit_identifiers<'a>(&'a self, visit: &mut impl FnMut(&'a Identifier)) {
        visit(&self.identifier);
        for sequential in &self.sequentials {
            sequential.visit_identifiers(visit);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
