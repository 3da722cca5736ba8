//! Conversion of leftover `id::` block properties into Obsidian `^id` anchors.

use std::sync::LazyLock;

use regex::Regex;

use crate::fences::FenceState;
use crate::properties::Property;

static ID_PROPERTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*id::\s*(?P<id>[A-Za-z0-9_-]+)\s*$").unwrap());

/// Attach `id:: <id>` lines to the content line before them as a trailing ` ^<id>`.
///
/// An identifier only attaches when no other property line sits between it and that content
/// line; otherwise the `id::` line is kept as it is. `collapsed::` properties are dropped.
/// Fenced code blocks are copied verbatim and never receive an anchor.
pub fn attach_block_ids(lines: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut last_content: Option<usize> = None;
    let mut property_since_content = false;
    let mut fences = FenceState::new();

    for line in lines {
        if fences.verbatim(&line) {
            last_content = None;
            property_since_content = false;
            out.push(line);
            continue;
        }

        if let Some(caps) = ID_PROPERTY_RE.captures(&line) {
            let target = last_content
                .filter(|_| !property_since_content)
                .and_then(|idx| out.get_mut(idx));
            if let Some(target) = target {
                let anchor = format!("^{}", &caps["id"]);
                if !target.trim_end().ends_with(&anchor) {
                    target.truncate(target.trim_end().len());
                    target.push(' ');
                    target.push_str(&anchor);
                }
                continue;
            }
        }

        if let Some(property) = Property::parse_block(&line) {
            if property.normalized_key() != "collapsed" {
                out.push(line);
            }
            if last_content.is_some() {
                property_since_content = true;
            }
            continue;
        }

        if !line.trim().is_empty() {
            last_content = Some(out.len());
            property_since_content = false;
        }
        out.push(line);
    }
    out
}
