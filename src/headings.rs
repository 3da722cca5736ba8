//! Promotion of headings that own an indented list.
//!
//! Logseq happily renders a heading followed by a list indented with a tab as the heading's
//! children. In Obsidian that list would become an indented code block, so the heading itself is
//! turned into a list item (`- # Heading`) and the children keep their indentation.

use std::sync::LazyLock;

use regex::Regex;

use crate::fences::{is_fence, strip_list_marker, FenceState};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<indent>\s*)(?P<heading>#+\s+.+)$").unwrap());

/// Minimum visual indentation of a list which makes it a child of the preceding heading.
const CHILD_LIST_MIN_INDENT: usize = 4;
const TAB_WIDTH: usize = 4;

/// Prefix a heading with `- ` when it is immediately followed (blank lines aside) by a list which
/// is indented by at least four columns.
///
/// Headings already inside a list item and anything within fenced code blocks are left alone.
pub fn fix_heading_child_lists(lines: &[String]) -> Vec<String> {
    let mut fences = FenceState::new();
    let mut out = Vec::with_capacity(lines.len());
    let mut rest = lines;
    while let Some((line, following)) = rest.split_first() {
        rest = following;
        if fences.verbatim(line) {
            out.push(line.clone());
            continue;
        }
        match HEADING_RE.captures(line) {
            Some(caps) if owns_child_list(following) => {
                out.push(format!("{}- {}", &caps["indent"], &caps["heading"]));
            }
            _ => out.push(line.clone()),
        }
    }
    out
}

/// Whether the first non-blank line of `following` is an indented list item.
fn owns_child_list(following: &[String]) -> bool {
    let Some(next) = following.iter().find(|line| !line.trim().is_empty()) else {
        return false;
    };
    if is_fence(next) {
        return false;
    }
    indent_width(next) >= CHILD_LIST_MIN_INDENT
        && strip_list_marker(next.trim_start_matches([' ', '\t'])).is_some()
}

/// Visual width of the leading indentation, with tabs counting as four columns.
fn indent_width(line: &str) -> usize {
    line.chars()
        .map_while(|c| match c {
            ' ' => Some(1),
            '\t' => Some(TAB_WIDTH),
            _ => None,
        })
        .sum()
}
