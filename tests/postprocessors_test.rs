use logseq_to_obsidian::{Context, Converter, PostprocessorResult};
use pretty_assertions::assert_eq;
use std::fs::{read_to_string, remove_file};
use std::path::PathBuf;
use tempfile::TempDir;

const INPUT: &str = "tests/testdata/input/postprocessors";

/// This postprocessor replaces any instance of "foo" with "bar" in the page.
fn foo_to_bar(_ctx: &mut Context, text: &mut String) -> PostprocessorResult {
    *text = text.replace("foo", "bar");
    PostprocessorResult::Continue
}

/// This postprocessor appends a line naming the page's source file.
fn append_source(ctx: &mut Context, text: &mut String) -> PostprocessorResult {
    let source = ctx.source().strip_prefix(INPUT).unwrap_or_else(|_| ctx.source());
    text.push_str(&format!("\nConverted from {}\n", source.display()));
    PostprocessorResult::Continue
}

// The purpose of this test to verify both postprocessors run, in order, on the fully converted
// page: tasks have already been rewritten when `foo_to_bar` sees them, and the line added by
// `append_source` comes after the front matter and body.
#[test]
fn test_postprocessors() {
    let tmp_dir = TempDir::new().expect("failed to make tempdir");
    let mut converter = Converter::new(PathBuf::from(INPUT), tmp_dir.path().to_path_buf());
    converter.add_postprocessor(&foo_to_bar);
    converter.add_postprocessor(&append_source);

    converter.run().unwrap();

    let expected = read_to_string("tests/testdata/expected/postprocessors/Note.md").unwrap();
    let actual = read_to_string(tmp_dir.path().join("Note.md")).unwrap();
    assert_eq!(expected, actual);
}

#[test]
fn test_postprocessor_stophere() {
    let tmp_dir = TempDir::new().expect("failed to make tempdir");
    let mut converter = Converter::new(PathBuf::from(INPUT), tmp_dir.path().to_path_buf());

    converter.add_postprocessor(&|_, _| PostprocessorResult::StopHere);
    converter.add_postprocessor(&|_, _| panic!("should not be called due to above processor"));
    let report = converter.run().unwrap();

    assert_eq!(report.written, 1);
    assert!(tmp_dir.path().join("Note.md").exists());
}

#[test]
fn test_postprocessor_stop_and_skip() {
    let tmp_dir = TempDir::new().expect("failed to make tempdir");
    let note_path = tmp_dir.path().join("Note.md");

    let mut converter = Converter::new(PathBuf::from(INPUT), tmp_dir.path().to_path_buf());
    converter.run().unwrap();

    assert!(note_path.exists());
    remove_file(&note_path).unwrap();

    let mut converter = Converter::new(PathBuf::from(INPUT), tmp_dir.path().to_path_buf());
    converter.add_postprocessor(&|_, _| PostprocessorResult::StopAndSkipNote);
    let report = converter.run().unwrap();

    assert!(!note_path.exists());
    assert_eq!(report.written, 0);
}

#[test]
fn test_postprocessor_change_destination() {
    let tmp_dir = TempDir::new().expect("failed to make tempdir");
    let original_note_path = tmp_dir.path().join("Note.md");
    let mut converter = Converter::new(PathBuf::from(INPUT), tmp_dir.path().to_path_buf());
    converter.run().unwrap();

    assert!(original_note_path.exists());
    remove_file(&original_note_path).unwrap();

    let mut converter = Converter::new(PathBuf::from(INPUT), tmp_dir.path().to_path_buf());
    converter.add_postprocessor(&|ctx, _text| {
        assert_eq!(ctx.expected_title(), "Note");
        ctx.destination.set_file_name("MovedNote.md");
        PostprocessorResult::Continue
    });
    converter.run().unwrap();

    let new_note_path = tmp_dir.path().join("MovedNote.md");
    assert!(!original_note_path.exists());
    assert!(new_note_path.exists());
}

// Links from other pages point at the planned destination, so a postprocessor which moves a page
// does not update references to it.
#[test]
fn test_postprocessor_moves_do_not_rewrite_links() {
    let tmp_dir = TempDir::new().expect("failed to make tempdir");
    let input = tmp_dir.path().join("input");
    let output = tmp_dir.path().join("output");
    std::fs::create_dir_all(input.join("pages")).unwrap();
    std::fs::write(input.join("pages/Target.md"), "- quoted\n  id:: abcdef\n").unwrap();
    std::fs::write(input.join("pages/Source.md"), "- see ((abcdef)) there\n").unwrap();

    let mut converter = Converter::new(input, output.clone());
    converter.add_postprocessor(&|ctx, _text| {
        if ctx.destination.ends_with("Target.md") {
            ctx.destination = ctx.destination.with_file_name("Moved.md");
        }
        PostprocessorResult::Continue
    });
    converter.run().unwrap();

    assert!(output.join("Moved.md").exists());
    assert_eq!(
        read_to_string(output.join("Source.md")).unwrap(),
        "- see [[Target#^abcdef]] there\n"
    );
}
