//! Integration tests for the course tree and archive export.
//!
//! These tests build course trees from generation records, export them to a
//! temporary directory and read the produced archive back.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use coursegen_olx::{
    build_course, ChapterRecord, Course, CourseOptions, Exporter, OutlineRecord,
    SequentialRecord, VerticalRecord,
};
use flate2::read::GzDecoder;
use regex::Regex;
use tempfile::TempDir;

/// Reads every regular file of a `.tar.gz` archive into a path -> content map.
fn read_archive(path: &Path) -> BTreeMap<String, String> {
    let file = File::open(path).expect("Failed to open archive");
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut files = BTreeMap::new();

    for entry in archive.entries().expect("Failed to read archive entries") {
        let mut entry = entry.expect("Failed to read archive entry");
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry
            .path()
            .expect("Entry has no path")
            .to_string_lossy()
            .into_owned();
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .expect("Entry is not UTF-8");
        files.insert(path, content);
    }
    files
}

/// Strips the archive root directory from every path.
fn relative_to_root(files: BTreeMap<String, String>, root: &str) -> BTreeMap<String, String> {
    let prefix = format!("{root}/");
    files
        .into_iter()
        .map(|(path, content)| {
            let relative = path
                .strip_prefix(&prefix)
                .unwrap_or_else(|| panic!("Entry '{path}' is outside the root '{root}'"))
                .to_string();
            (relative, content)
        })
        .collect()
}

/// Every file reachable from `course/{id}.xml` by following `url_name`
/// references and html `filename` pointers.
fn reachable_files(files: &BTreeMap<String, String>, course_id: &str) -> BTreeSet<String> {
    let reference = Regex::new(r#"<(\w+) url_name="([^"]+)" />"#).expect("valid regex");
    let html_body = Regex::new(r#"<html filename="([^"]+)" />"#).expect("valid regex");

    let mut seen = BTreeSet::new();
    let mut pending = vec![format!("course/{course_id}.xml")];

    while let Some(path) = pending.pop() {
        let content = files
            .get(&path)
            .unwrap_or_else(|| panic!("Dangling reference to '{path}'"));
        if !seen.insert(path.clone()) {
            continue;
        }
        for caps in reference.captures_iter(content) {
            pending.push(format!("{}/{}.xml", &caps[1], &caps[2]));
        }
        if let Some(caps) = html_body.captures(content) {
            let body = format!("html/{}.html", &caps[1]);
            assert!(files.contains_key(&body), "Missing html body '{body}'");
            seen.insert(body);
        }
    }
    seen
}

fn python_course_record() -> OutlineRecord {
    OutlineRecord::new(
        "Python course of Ana",
        vec![
            ChapterRecord::detailed(
                "Chapter 1: Basics",
                vec![
                    SequentialRecord::new(
                        "Unit 1",
                        vec![
                            VerticalRecord::new()
                                .with_html("<p>Variables</p>")
                                .with_problem("<problem><p>Q1</p></problem>"),
                            VerticalRecord::new().with_html("<p>Types</p>"),
                        ],
                    ),
                    SequentialRecord::new(
                        "Unit 2",
                        vec![VerticalRecord::new().with_problem("<problem><p>Q2</p></problem>")],
                    ),
                ],
            ),
            ChapterRecord::stub("Chapter 2: Functions", "Defining functions"),
        ],
    )
}

fn build(record: &OutlineRecord) -> Course {
    build_course(record, &CourseOptions::default()).expect("Failed to build course")
}

/// Tests that every rendered file is reachable from the course descriptor and
/// every reference resolves.
#[test]
fn test_reference_chain_has_no_orphans() {
    let course = build(&python_course_record());
    let files: BTreeMap<String, String> = course
        .render()
        .expect("Failed to render course")
        .iter()
        .map(|(p, c)| (p.to_string(), c.to_string()))
        .collect();

    let reachable = reachable_files(&files, course.identifier().as_str());

    let expected: BTreeSet<String> = files
        .keys()
        .filter(|p| *p != "course.xml" && !p.starts_with("policy/"))
        .cloned()
        .collect();
    assert_eq!(reachable, expected);

    // 1 course + 2 chapters + 2 sequentials + 3 verticals
    // + 2 html (descriptor and body each) + 2 problems
    assert_eq!(expected.len(), 1 + 2 + 2 + 3 + 4 + 2);
}

/// Tests that chapter and unit references keep record order.
#[test]
fn test_reference_lists_preserve_order() {
    let course = build(&python_course_record());
    let files = course.render().expect("Failed to render course");

    let course_xml = files
        .get(&format!("course/{}.xml", course.identifier()))
        .expect("Missing course descriptor");
    let first = course_xml
        .find(course.chapters()[0].identifier().as_str())
        .expect("First chapter not referenced");
    let second = course_xml
        .find(course.chapters()[1].identifier().as_str())
        .expect("Second chapter not referenced");
    assert!(first < second);

    let chapter = &course.chapters()[0];
    let chapter_xml = files
        .get(&format!("chapter/{}.xml", chapter.identifier()))
        .expect("Missing chapter descriptor");
    let units: Vec<usize> = chapter
        .sequentials()
        .iter()
        .map(|s| chapter_xml.find(s.identifier().as_str()).expect("Unit not referenced"))
        .collect();
    assert!(units.windows(2).all(|w| w[0] < w[1]));
}

/// Tests that a problem-only vertical emits exactly one component file.
#[test]
fn test_problem_only_vertical() {
    let record = OutlineRecord::new(
        "Quiz",
        vec![ChapterRecord::detailed(
            "Only problems",
            vec![SequentialRecord::new(
                "Unit",
                vec![VerticalRecord::new().with_problem("<problem><p>Q</p></problem>")],
            )],
        )],
    );
    let course = build(&record);
    let files = course.render().expect("Failed to render course");

    let vertical = &course.chapters()[0].sequentials()[0].verticals()[0];
    assert_eq!(vertical.components().len(), 1);

    let component = &vertical.components()[0];
    let problem_path = format!("problem/{}.xml", component.identifier());
    assert_eq!(files.get(&problem_path), Some("<problem><p>Q</p></problem>"));
    assert_eq!(files.paths_under("problem").count(), 1);
    assert_eq!(files.paths_under("html").count(), 0);
}

/// Tests that the root descriptor and the policy directory name agree.
#[test]
fn test_course_descriptor_matches_policy_directory() {
    for title in ["Python course of Ana", "Rust: Zero to Hero!", "Python 课程"] {
        let course = build(&OutlineRecord::new(title, Vec::new()));
        let files = course.render().expect("Failed to render course");

        let root = files.get("course.xml").expect("Missing course.xml");
        let url_name = Regex::new(r#"url_name="([^"]+)""#)
            .expect("valid regex")
            .captures(root)
            .map(|c| c[1].to_string())
            .expect("course.xml has no url_name");

        let policy_path = format!("policy/{url_name}/policy.json");
        let policy = files
            .get(&policy_path)
            .unwrap_or_else(|| panic!("Missing {policy_path} for '{title}'"));
        let json: serde_json::Value = serde_json::from_str(policy).expect("Invalid policy JSON");
        assert!(json.get(format!("course/{url_name}")).is_some());
        assert!(files.contains(&format!("course/{url_name}.xml")));
    }
}

/// Tests the archive layout produced by the exporter.
#[test]
fn test_archive_contains_course_files() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let course = build(&python_course_record());

    let outcome = Exporter::new(temp.path())
        .export(&course)
        .expect("Failed to export course");

    assert!(outcome.archive_path.exists());
    assert!(outcome
        .archive_path
        .to_string_lossy()
        .ends_with(".tar.gz"));

    let root = course.archive_root_name();
    let files = relative_to_root(read_archive(&outcome.archive_path), &root);
    let id = course.identifier();

    assert!(files.contains_key("course.xml"));
    assert!(files.contains_key(&format!("policy/{id}/policy.json")));
    assert!(files.contains_key(&format!("course/{id}.xml")));
    assert_eq!(files.keys().filter(|p| p.starts_with("chapter/")).count(), 2);
    assert_eq!(files.len(), outcome.file_count);
}

/// Tests that re-exporting a differently shaped course under the same slug
/// leaves no stale files behind.
#[test]
fn test_export_is_idempotent() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let exporter = Exporter::new(temp.path());

    let large = build(&python_course_record());
    exporter.export(&large).expect("First export failed");

    let small = build(&OutlineRecord::new(
        "Python course of Ana",
        vec![ChapterRecord::stub("Only chapter", "")],
    ));
    let first = exporter.export(&small).expect("Second export failed");
    let first_files = read_archive(&first.archive_path);

    let second = exporter.export(&small).expect("Third export failed");
    let second_files = read_archive(&second.archive_path);

    assert_eq!(first_files, second_files);
    assert_eq!(
        first_files.keys().filter(|p| p.contains("/chapter/")).count(),
        1
    );
    assert!(!first_files.keys().any(|p| p.contains("/sequential/")));
}
