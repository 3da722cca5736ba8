//! Per-page conversion (the first pass).
//!
//! Everything in here only looks at a single page. Links across pages are resolved afterwards by
//! [`rewrite_references`][crate::rewrite_references], once every page has been through this pass.

use std::fmt;

use crate::anchors::attach_block_ids;
use crate::blocks::assemble_blocks;
use crate::frontmatter::emit_frontmatter;
use crate::headings::fix_heading_child_lists;
use crate::properties::{self, parse_page_properties};
use crate::tasks::TasksFormat;

const TITLE_KEY: &str = "title";

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
/// A problem with a single page which the user may want to fix in their graph.
pub enum PageWarning {
    /// The page's `title::` property disagrees with where the page ends up in the vault. The
    /// title is dropped, since Obsidian derives titles from file names.
    TitleMismatch { declared: String, expected: String },
}

impl fmt::Display for PageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TitleMismatch { declared, expected } => write!(
                f,
                "title property mismatch: '{declared}' != '{expected}'"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The result of [`transform_markdown`].
pub struct Transformed {
    pub text: String,
    pub warnings: Vec<PageWarning>,
}

/// Convert a single Logseq page into Obsidian Markdown.
///
/// `expected_title` is the page's path inside the output vault, without extension and with `/`
/// separators. A `title::` property is always removed when one is given: silently when it
/// matches, with a [`PageWarning::TitleMismatch`] otherwise.
///
/// Every line of the returned text (front matter included) ends with `\n`.
pub fn transform_markdown(
    text: &str,
    expected_title: Option<&str>,
    format: TasksFormat,
) -> Transformed {
    let lines: Vec<&str> = text.lines().collect();
    let (mut props, consumed) = parse_page_properties(&lines);

    let mut warnings = Vec::new();
    if let Some(expected) = expected_title {
        let declared = properties::get(&props, TITLE_KEY)
            .filter(|title| !title.is_empty())
            .map(str::to_owned);
        if let Some(declared) = declared {
            if declared != expected {
                warnings.push(PageWarning::TitleMismatch {
                    declared,
                    expected: expected.to_owned(),
                });
            }
            props.shift_remove(TITLE_KEY);
        }
    }

    // The front matter already ends with a blank separator line.
    let body: Vec<String> = lines
        .iter()
        .skip(consumed)
        .skip_while(|line| line.trim().is_empty())
        .map(|line| (*line).to_owned())
        .collect();
    let body = fix_heading_child_lists(&body);
    let body = assemble_blocks(&body, format);
    let body = attach_block_ids(body);
    // Dropping properties may have put a heading right on top of an indented list.
    let body = fix_heading_child_lists(&body);

    let mut out = emit_frontmatter(&props).unwrap_or_default();
    for line in body {
        out.push_str(&line);
        out.push('\n');
    }
    Transformed {
        text: out,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn transform(text: &str) -> String {
        transform_markdown(text, None, TasksFormat::Emoji).text
    }

    #[test]
    fn matching_title_is_dropped_silently() {
        let result = transform_markdown(
            "title:: folder/note\n",
            Some("folder/note"),
            TasksFormat::Emoji,
        );
        assert_eq!(result.text, "");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn mismatched_title_is_dropped_with_warning() {
        let result = transform_markdown(
            "title:: Something Else\ntype:: note\n\n- body\n",
            Some("folder/note"),
            TasksFormat::Emoji,
        );
        assert_eq!(result.text, "---\ntype: note\n---\n\n- body\n");
        assert_eq!(
            result.warnings,
            vec![PageWarning::TitleMismatch {
                declared: "Something Else".into(),
                expected: "folder/note".into(),
            }]
        );
    }

    #[test]
    fn title_is_kept_without_expected_title() {
        assert_eq!(
            transform("title:: Mine\n- body\n"),
            "---\ntitle: Mine\n---\n\n- body\n"
        );
    }

    #[test]
    fn leading_blank_lines_are_dropped() {
        assert_eq!(
            transform("tags:: a\n\n\n\n- body\n"),
            "---\ntags:\n  - a\n---\n\n- body\n"
        );
        assert_eq!(transform("\n\n# Heading\n"), "# Heading\n");
    }

    #[rstest]
    #[case(
        TasksFormat::Emoji,
        "- TODO SCHEDULED: <2024-09-10 Tue 07:00 .+1d>\n",
        "- [ ] ⏳ 2024-09-10 07:00 🔁 every 1 day when done\n"
    )]
    #[case(
        TasksFormat::InlineField,
        "- TODO DEADLINE: <2024-09-15 ++2w>\n",
        "- [ ] [due::2024-09-15] [repeat::every 2 weeks when done]\n"
    )]
    #[case(
        TasksFormat::Emoji,
        "- TODO x SCHEDULED: <2024-01-01 +99999999999d>\n",
        "- [ ] x ⏳ 2024-01-01 🔁 every 99999999999 days\n"
    )]
    fn tasks(#[case] format: TasksFormat, #[case] input: &str, #[case] expected: &str) {
        assert_eq!(transform_markdown(input, None, format).text, expected);
    }

    #[test]
    fn heading_with_indented_children() {
        assert_eq!(
            transform("# Heading\n\t- item A\n\t\t- item B\n"),
            "- # Heading\n\t- item A\n\t\t- item B\n"
        );
    }

    // The heading only owns the list once the property between them has been dropped.
    #[test]
    fn heading_owns_list_after_property_removal() {
        assert_eq!(
            transform("# H\ncollapsed:: true\n\t- item\n"),
            "- # H\n\t- item\n"
        );
    }

    #[test]
    fn full_page() {
        let input = "\
alias:: Daily Review
tags:: [[routine]], #review

- DOING [#B] Review inbox
  SCHEDULED: <2024-09-10 Tue>
  id:: 66e0a1b2-aaaa-bbbb-cccc-1234567890ab
  collapsed:: true
\t- Clear email
\t  DEADLINE: <2024-09-11 Wed 17:00>
- Notes
  first line of notes
  id:: 66e0a1b2-dddd
";
        let expected = "\
---
aliases:
  - Daily Review
tags:
  - routine
  - review
---

- [ ] Review inbox 🔼 ⏳ 2024-09-10 ^66e0a1b2-aaaa-bbbb-cccc-1234567890ab
\t- Clear email 📅 2024-09-11 17:00
- Notes ^66e0a1b2-dddd
  first line of notes
";
        assert_eq!(transform(input), expected);
    }

    #[test]
    fn crlf_input_is_normalized() {
        assert_eq!(transform("- a\r\n- b\r\n"), "- a\n- b\n");
    }
}
