use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::{Result, Value};

use crate::properties::{self, Properties};

static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[([^\]]+)\]\]").unwrap());
static HASHTAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#([\w\-/]+)").unwrap());
static TAG_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(#[\w\-/]+)|(\[\[[^\]]+\]\])").unwrap());
static PROPERTY_DECLARATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w\-]+::\s*$").unwrap());

/// Keys which get dedicated treatment and aren't copied through as-is.
const HANDLED_KEYS: [&str; 4] = ["title", "aliases", "alias", "tags"];

/// YAML front matter for an Obsidian note.
///
/// This is essentially an alias of [`serde_yaml::Mapping`] so all the methods available on that type
/// are available with `Frontmatter` as well. Insertion order is preserved, which is also the order
/// in which [`frontmatter_to_str`] renders keys.
///
/// # Examples
///
/// ```
/// # use logseq_to_obsidian::Frontmatter;
/// use serde_yaml::Value;
///
/// let mut frontmatter = Frontmatter::new();
/// let key = Value::String("foo".to_string());
///
/// frontmatter.insert(
///     key.clone(),
///     Value::String("bar".to_string()),
/// );
///
/// assert_eq!(
///     frontmatter.get(&key),
///     Some(&Value::String("bar".to_string())),
/// )
/// ```
pub type Frontmatter = serde_yaml::Mapping;

/// Parse a YAML document (without the `---` delimiters) into [`Frontmatter`].
#[allow(clippy::module_name_repetitions)]
pub fn frontmatter_from_str(mut s: &str) -> Result<Frontmatter> {
    if s.is_empty() {
        s = "{}";
    }
    let frontmatter: Frontmatter = serde_yaml::from_str(s)?;
    Ok(frontmatter)
}

/// Render front matter, including the closing blank separator line.
///
/// Scalars are written verbatim as `key: value`, sequences as one `  - item` line per element.
#[allow(clippy::module_name_repetitions)]
pub fn frontmatter_to_str(frontmatter: &Frontmatter) -> String {
    let mut buffer = String::from("---\n");
    for (key, value) in frontmatter {
        let Some(key) = key.as_str() else { continue };
        match value {
            Value::Sequence(items) => {
                buffer.push_str(key);
                buffer.push_str(":\n");
                for item in items.iter().filter_map(Value::as_str) {
                    buffer.push_str("  - ");
                    buffer.push_str(item);
                    buffer.push('\n');
                }
            }
            Value::String(value) => {
                buffer.push_str(&format!("{key}: {value}\n"));
            }
            _ => {}
        }
    }
    buffer.push_str("---\n\n");
    buffer
}

/// Select and normalize the fields of a page's properties which end up in its front matter.
///
/// `title` is copied verbatim, `aliases` (or `alias`) and `tags` become sequences and are left
/// out when they normalize to nothing, and every other non-empty property follows in its original
/// order.
#[allow(clippy::module_name_repetitions)]
pub fn frontmatter_from_properties(props: &Properties) -> Frontmatter {
    let mut frontmatter = Frontmatter::new();
    if let Some(title) = properties::get(props, "title") {
        frontmatter.insert(key("title"), Value::String(title.to_owned()));
    }

    let aliases = properties::get(props, "aliases")
        .filter(|v| !v.is_empty())
        .or_else(|| properties::get(props, "alias"))
        .map(normalize_aliases)
        .unwrap_or_default();
    if !aliases.is_empty() {
        frontmatter.insert(key("aliases"), sequence(aliases));
    }

    let tags = properties::get(props, "tags")
        .map(normalize_tags)
        .unwrap_or_default();
    if !tags.is_empty() {
        frontmatter.insert(key("tags"), sequence(tags));
    }

    for (k, v) in props {
        let (Some(k), Some(v)) = (k.as_str(), v.as_str()) else {
            continue;
        };
        if HANDLED_KEYS.contains(&k) || v.is_empty() {
            continue;
        }
        frontmatter.insert(key(k), Value::String(v.to_owned()));
    }
    frontmatter
}

/// Render the front matter block for a page, or `None` when the page declared no properties.
pub fn emit_frontmatter(props: &Properties) -> Option<String> {
    if props.is_empty() {
        return None;
    }
    Some(frontmatter_to_str(&frontmatter_from_properties(props)))
}

/// Split an `aliases::` value into individual aliases.
///
/// Each `[[Name]]` is one alias; whatever text remains is split on commas.
pub fn normalize_aliases(value: &str) -> Vec<String> {
    let mut aliases = Vec::new();
    for caps in WIKILINK_RE.captures_iter(value) {
        push_unique(&mut aliases, &caps[1]);
    }
    let remainder = WIKILINK_RE.replace_all(value, "");
    for part in remainder.split(',') {
        push_unique(&mut aliases, part);
    }
    aliases
}

/// Split a `tags::` value into individual tags.
///
/// Comma separated segments are handled left to right: their wikilinks, then their hashtags, then
/// whatever plain text remains. Wikilinks and hashtags which weren't picked up that way follow
/// in order of appearance.
pub fn normalize_tags(value: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for part in value.split(',') {
        for caps in WIKILINK_RE.captures_iter(part) {
            push_unique(&mut tags, &caps[1]);
        }
        for caps in HASHTAG_RE.captures_iter(part) {
            push_unique(&mut tags, &caps[1]);
        }
        let remainder = TAG_TOKEN_RE.replace_all(part, "");
        let remainder = remainder.trim();
        if !PROPERTY_DECLARATION_RE.is_match(remainder) {
            push_unique(&mut tags, remainder);
        }
    }
    for caps in WIKILINK_RE.captures_iter(value) {
        push_unique(&mut tags, &caps[1]);
    }
    for caps in HASHTAG_RE.captures_iter(value) {
        push_unique(&mut tags, &caps[1]);
    }
    tags
}

/// Append the trimmed `item` unless it is empty or already present.
fn push_unique(items: &mut Vec<String>, item: &str) {
    let item = item.trim();
    if !item.is_empty() && !items.iter().any(|existing| existing == item) {
        items.push(item.to_owned());
    }
}

fn key(name: &str) -> Value {
    Value::String(name.to_owned())
}

fn sequence(items: Vec<String>) -> Value {
    Value::Sequence(items.into_iter().map(Value::String).collect())
}
