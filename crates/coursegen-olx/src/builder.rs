//! Conversion from generation records to the typed course tree.

use tracing::debug;

use crate::record::{ChapterRecord, OutlineRecord, SequentialRecord, VerticalRecord};
use crate::{Chapter, Component, Course, CourseOptions, OlxError, Result, Sequential, Vertical};

const UNTITLED_SEQUENTIAL: &str = "Untitled Sequential";
const UNTITLED_VERTICAL: &str = "Untitled Vertical";

/// Builds a [`Course`] tree from an outline record.
///
/// Chapters carrying `sequentials` become full subtrees; stub chapters
/// become empty chapter shells. The result is either a complete tree or an
/// error, never a partial course.
///
/// # Errors
///
/// Returns [`OlxError::MissingField`] if the outline has no `course_title`
/// or a chapter has neither `title` nor `chapter_title`, and
/// [`OlxError::InvalidIdentifier`] if `options` carry an unsafe org or run.
pub fn build_course(outline: &OutlineRecord, options: &CourseOptions) -> Result<Course> {
    let title = outline
        .course_title()
        .ok_or_else(|| OlxError::missing_field("outline", "course_title"))?;

    let mut course = Course::new(title, options)?;
    for (index, record) in outline.chapters.iter().enumerate() {
        course.add_chapter(build_chapter(index + 1, record)?);
    }

    debug!(
        slug = course.slug(),
        chapters = course.chapters().len(),
        detailed = outline.detailed_chapter_count(),
        "Built course tree"
    );
    Ok(course)
}

/// Builds one chapter. `number` is 1-based and only used in error messages.
fn build_chapter(number: usize, record: &ChapterRecord) -> Result<Chapter> {
    let title = record
        .title()
        .ok_or_else(|| OlxError::missing_field(format!("chapter {number}"), "title"))?;

    Ok(match &record.sequentials {
        Some(sequentials) => Chapter::new(title, sequentials.iter().map(build_sequential).collect()),
        None => Chapter::empty(title),
    })
}

fn build_sequential(record: &SequentialRecord) -> Sequential {
    let title = record.title().unwrap_or(UNTITLED_SEQUENTIAL);
    let verticals = record
        .verticals
        .iter()
        .map(|v| build_vertical(v, record.title()))
        .collect();
    Sequential::new(title, verticals)
}

fn build_vertical(record: &VerticalRecord, unit_title: Option<&str>) -> Vertical {
    let title = record.title().or(unit_title).unwrap_or(UNTITLED_VERTICAL);

    let mut components = Vec::with_capacity(2);
    if let Some(html) = &record.html {
        components.push(Component::html(html.as_str()));
    }
    if let Some(problem) = &record.problem {
        components.push(Component::problem(problem.as_str()));
    }
    Vertical::new(title, components)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ComponentKind;

    fn detailed_outline() -> OutlineRecord {
        OutlineRecord::new(
            "Python course of Ana",
            vec![
                ChapterRecord::stub("Chapter 1: Setup", "Install things"),
                ChapterRecord::detailed(
                    "Chapter 2: Types",
                    vec![
                        SequentialRecord::new(
                            "Unit 1: Numbers",
                            vec![VerticalRecord::new()
                                .with_html("<p>ints</p>")
                                .with_problem("<problem/>")],
                        ),
                        SequentialRecord {
                            title: None,
                            verticals: vec![VerticalRecord::new()],
                        },
                    ],
                ),
            ],
        )
    }

    #[test]
    fn test_build_preserves_order_and_shape() {
        let course = build_course(&detailed_outline(), &CourseOptions::default()).unwrap();

        assert_eq!(course.title(), "Python course of Ana");
        let chapters = course.chapters();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].display_name(), "Chapter 1: Setup");
        assert!(chapters[0].is_empty());

        let sequentials = chapters[1].sequentials();
        assert_eq!(sequentials[0].display_name(), "Unit 1: Numbers");
        assert_eq!(sequentials[1].display_name(), "Untitled Sequential");

        let first = &sequentials[0].verticals()[0];
        assert_eq!(first.display_name(), "Unit 1: Numbers");
        let kinds: Vec<ComponentKind> = first.components().iter().map(Component::kind).collect();
        assert_eq!(kinds, vec![ComponentKind::Html, ComponentKind::Problem]);

        let bare = &sequentials[1].verticals()[0];
        assert_eq!(bare.display_name(), "Untitled Vertical");
        assert!(bare.components().is_empty());
    }

    #[test]
    fn test_build_uses_alternate_chapter_title_key() {
        let outline = OutlineRecord::new(
            "T",
            vec![ChapterRecord {
                chapter_title: Some("From alternate key".to_string()),
                sequentials: Some(Vec::new()),
                ..ChapterRecord::default()
            }],
        );

        let course = build_course(&outline, &CourseOptions::default()).unwrap();

        assert_eq!(course.chapters()[0].display_name(), "From alternate key");
    }

    #[test]
    fn test_vertical_title_overrides_unit_title() {
        let outline = OutlineRecord::new(
            "T",
            vec![ChapterRecord::detailed(
                "C",
                vec![SequentialRecord::new(
                    "Unit",
                    vec![VerticalRecord::new().with_title("Screen")],
                )],
            )],
        );

        let course = build_course(&outline, &CourseOptions::default()).unwrap();

        let vertical = &course.chapters()[0].sequentials()[0].verticals()[0];
        assert_eq!(vertical.display_name(), "Screen");
    }

    #[test]
    fn test_missing_course_title_is_fatal() {
        let outline = OutlineRecord {
            course_title: None,
            chapters: vec![ChapterRecord::stub("A", "a")],
        };

        let err = build_course(&outline, &CourseOptions::default()).unwrap_err();

        assert!(matches!(
            err,
            OlxError::MissingField { ref record, ref field } if record == "outline" && field == "course_title"
        ));
    }

    #[test]
    fn test_missing_chapter_title_is_fatal() {
        let outline = OutlineRecord::new(
            "T",
            vec![
                ChapterRecord::stub("A", "a"),
                ChapterRecord {
                    description: Some("no title".to_string()),
                    ..ChapterRecord::default()
                },
            ],
        );

        let err = build_course(&outline, &CourseOptions::default()).unwrap_err();

        assert!(matches!(
            err,
            OlxError::MissingField { ref record, .. } if record == "chapter 2"
        ));
    }

    #[test]
    fn test_blank_titles_are_treated_as_missing() {
        let outline = OutlineRecord::new(
            "T",
            vec![ChapterRecord::detailed(
                "C",
                vec![SequentialRecord::new(
                    "",
                    vec![VerticalRecord::new().with_title("   ")],
                )],
            )],
        );

        let course = build_course(&outline, &CourseOptions::default()).unwrap();

        let sequential = &course.chapters()[0].sequentials()[0];
        assert_eq!(sequential.display_name(), "Untitled Sequential");
        assert_eq!(sequential.verticals()[0].display_name(), "Untitled Vertical");

        let blank_chapter = OutlineRecord::new("T", vec![ChapterRecord::stub("", "d")]);
        let err = build_course(&blank_chapter, &CourseOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            OlxError::MissingField { ref record, ref field } if record == "chapter 1" && field == "title"
        ));

        let blank_course = OutlineRecord::new(" ", Vec::new());
        let err = build_course(&blank_course, &CourseOptions::default()).unwrap_err();
        assert!(matches!(err, OlxError::MissingField { ref field, .. } if field == "course_title"));
    }

    #[test]
    fn test_built_tree_has_unique_identifiers() {
        let course = build_course(&detailed_outline(), &CourseOptions::default()).unwrap();
        assert!(course.validate_identifiers().is_ok());
    }
}
