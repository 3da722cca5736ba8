//! Cross-page resolution of block references and embeds (the second pass).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::links::{replace_alias_links, replace_asset_images, replace_namespace_links};
use crate::planner::vault_name;

static INDEX_ID_PROPERTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*id::\s*([A-Za-z0-9_-]+)\s*$").unwrap());
static INDEX_ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)\^([A-Za-z0-9_-]+)\s*$").unwrap());

static BLOCK_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\(([A-Za-z0-9_-]{6,})\)\)").unwrap());
// A text consisting of nothing but a single reference, optionally introduced by "See".
static SOLE_BLOCK_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:See\s+)?\(\(([A-Za-z0-9_-]{6,})\)\)\s*$").unwrap()
});

static EMBED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{\{embed\s+(.*?)\}\}").unwrap());
static EMBED_PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\[([^\]]+)\]\]$").unwrap());

/// Block identifier to the source file which defines it.
pub type BlockRefIndex = HashMap<String, PathBuf>;

/// Source file to its planned destination.
pub type PathMap = HashMap<PathBuf, PathBuf>;

/// Index the block identifiers of all (first pass) pages.
///
/// Both leftover `id:: <id>` lines and `^<id>` anchors at the end of a line are recognized. When
/// the same identifier shows up more than once, the last page wins.
pub fn build_block_index(pages: &[(PathBuf, String)]) -> BlockRefIndex {
    let mut index = BlockRefIndex::new();
    for (path, text) in pages {
        for re in [&*INDEX_ID_PROPERTY_RE, &*INDEX_ANCHOR_RE] {
            for caps in re.captures_iter(text) {
                index.insert(caps[1].to_owned(), path.clone());
            }
        }
    }
    index
}

/// Resolve the vault link target (`path/to/page#^id`) for a block identifier.
fn block_link(
    id: &str,
    index: &BlockRefIndex,
    paths: &PathMap,
    output_root: &Path,
) -> Option<String> {
    let source = index.get(id)?;
    let destination = paths.get(source).unwrap_or(source);
    Some(format!("{}#^{id}", vault_name(destination, output_root)))
}

/// Replace `((id))` block references with `[[path#^id]]` links.
///
/// References to unknown identifiers are left untouched. When `text` consists of nothing but a
/// resolvable reference (optionally written as `See ((id))`), just the link is returned.
pub fn replace_block_refs(
    text: &str,
    index: &BlockRefIndex,
    paths: &PathMap,
    output_root: &Path,
) -> String {
    if let Some(caps) = SOLE_BLOCK_REF_RE.captures(text) {
        if let Some(link) = block_link(&caps[1], index, paths, output_root) {
            return format!("[[{link}]]");
        }
    }
    BLOCK_REF_RE
        .replace_all(text, |caps: &Captures<'_>| {
            block_link(&caps[1], index, paths, output_root)
                .map_or_else(|| caps[0].to_owned(), |link| format!("[[{link}]]"))
        })
        .into_owned()
}

/// Turn `{{embed [[...]]}}` macros into `![[...]]` embeds.
///
/// Block embeds are expected to have been resolved by [`replace_block_refs`] already, which turns
/// `{{embed ((id))}}` into `{{embed [[path#^id]]}}`. Anything else is left as it is.
pub fn replace_embeds(text: &str) -> String {
    EMBED_RE
        .replace_all(text, |caps: &Captures<'_>| {
            match EMBED_PAGE_RE.captures(caps[1].trim()) {
                Some(page) => format!("![[{}]]", &page[1]),
                None => caps[0].to_owned(),
            }
        })
        .into_owned()
}

/// Run every cross-page rewrite over a first pass page, in order: block references, embeds,
/// alias links, namespace links and asset images. The result always ends with a newline.
pub fn rewrite_references(
    text: &str,
    index: &BlockRefIndex,
    paths: &PathMap,
    output_root: &Path,
    field_keys: &[String],
) -> String {
    let text = replace_block_refs(text, index, paths, output_root);
    let text = replace_embeds(&text);
    let text = replace_alias_links(&text);
    let text = replace_namespace_links(&text, field_keys);
    let mut text = replace_asset_images(&text);
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn index(entries: &[(&str, &str)]) -> BlockRefIndex {
        entries
            .iter()
            .map(|(id, path)| ((*id).to_owned(), PathBuf::from(path)))
            .collect()
    }

    fn paths(entries: &[(&str, &str)]) -> PathMap {
        entries
            .iter()
            .map(|(from, to)| (PathBuf::from(from), PathBuf::from(to)))
            .collect()
    }

    #[test]
    fn index_collects_properties_and_anchors() {
        let pages = vec![
            (
                PathBuf::from("in/a.md"),
                "- first ^abc123\nid:: def456\n- plain\n".to_owned(),
            ),
            (PathBuf::from("in/b.md"), "- again ^abc123\n".to_owned()),
        ];
        assert_eq!(
            build_block_index(&pages),
            index(&[("abc123", "in/b.md"), ("def456", "in/a.md")])
        );
    }

    #[test]
    fn see_reference_becomes_bare_link() {
        let index = index(&[("abc123", "/in/Foo.md")]);
        let paths = paths(&[("/in/Foo.md", "/out/Foo.md")]);
        assert_eq!(
            replace_block_refs("See ((abc123))\n", &index, &paths, Path::new("/out")),
            "[[Foo#^abc123]]"
        );
    }

    #[rstest]
    #[case("- see ((abc123)) here", "- see [[pages/Foo#^abc123]] here")]
    #[case("((abc123)) and ((zzz999))", "[[pages/Foo#^abc123]] and ((zzz999))")]
    #[case("((short))", "((short))")]
    #[case("See ((zzz999))", "See ((zzz999))")]
    fn block_references(#[case] input: &str, #[case] expected: &str) {
        let index = index(&[("abc123", "/in/pages/Foo.md")]);
        let paths = paths(&[("/in/pages/Foo.md", "/out/pages/Foo.md")]);
        assert_eq!(
            replace_block_refs(input, &index, &paths, Path::new("/out")),
            expected
        );
    }

    #[rstest]
    #[case("{{embed [[Page]]}}", "![[Page]]")]
    #[case("x {{EMBED  [[a/b]] }} y", "x ![[a/b]] y")]
    #[case("{{embed ((abc123))}}", "{{embed ((abc123))}}")]
    #[case("{{embed something}}", "{{embed something}}")]
    #[case("{{video https://example.com}}", "{{video https://example.com}}")]
    fn embeds(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(replace_embeds(input), expected);
    }

    #[test]
    fn full_rewrite() {
        let index = index(&[("650a1b2c", "/in/journals/2024_09_10.md")]);
        let paths = paths(&[("/in/journals/2024_09_10.md", "/out/Daily/2024-09-10.md")]);
        let input = "\
- ref ((650a1b2c))
- {{embed ((650a1b2c))}}
- [docs]([[Project/Docs]]) and [[status/active]]
- ![diagram](../assets/my%20diagram.png){:height 100, :width 200}
```
[[status/active]] ((650a1b2c))
```";
        let expected = "\
- ref [[Daily/2024-09-10#^650a1b2c]]
- ![[Daily/2024-09-10#^650a1b2c]]
- [[Project/Docs|docs]] and [status::active]
- ![[my diagram.png|200x100]]
```
[[status/active]] [[Daily/2024-09-10#^650a1b2c]]
```
";
        assert_eq!(
            rewrite_references(
                input,
                &index,
                &paths,
                Path::new("/out"),
                &["status".to_owned()]
            ),
            expected
        );
    }
}
