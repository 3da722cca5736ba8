//! Rewrites of Logseq-only link syntax into their Obsidian equivalents.

use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};

use crate::fences::map_outside_fences;

static ALIAS_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<embed>!)?\[(?P<label>[^\]]+)\]\(\s*\[\[(?P<target>[^\]]+)\]\]\s*\)").unwrap()
});
static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<embed>!)?\[\[(?P<inner>[^\]]+)\]\]").unwrap());
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[[^\]]*\]\((?P<src>[^)]+)\)(?:\s*(?P<opts>\{[^}]*\}))?").unwrap()
});
static HEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":height\s+(\d+)").unwrap());
static WIDTH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":width\s+(\d+)").unwrap());

const REMOTE_PREFIXES: [&str; 3] = ["http://", "https://", "data:"];

/// Like [`Regex::replace_all`], but embeds (matches of the optional `embed` group) and matches
/// for which `rewrite` returns `None` are kept as they are.
fn replace_unless_embed<F>(line: &str, re: &Regex, mut rewrite: F) -> String
where
    F: FnMut(&Captures<'_>) -> Option<String>,
{
    re.replace_all(line, |caps: &Captures<'_>| {
        if caps.name("embed").is_some() {
            return caps[0].to_owned();
        }
        rewrite(caps).unwrap_or_else(|| caps[0].to_owned())
    })
    .into_owned()
}

/// Turn `[Label]([[Target]])` into `[[Target|Label]]`. Fenced code is left alone.
pub fn replace_alias_links(text: &str) -> String {
    map_outside_fences(text, |line| {
        replace_unless_embed(line, &ALIAS_LINK_RE, |caps| {
            Some(format!(
                "[[{}|{}]]",
                caps["target"].trim(),
                caps["label"].trim()
            ))
        })
    })
}

/// Turn `[[key/value]]` into a Dataview inline field `[key::value]` for each configured key.
///
/// Links with an alias (`[[key/value|Alias]]`), embeds and fenced code are left alone.
pub fn replace_namespace_links(text: &str, field_keys: &[String]) -> String {
    if field_keys.is_empty() {
        return text.to_owned();
    }
    map_outside_fences(text, |line| {
        replace_unless_embed(line, &WIKILINK_RE, |caps| {
            let inner = &caps["inner"];
            if inner.contains('|') {
                return None;
            }
            let (key, value) = inner.split_once('/')?;
            (!value.is_empty() && field_keys.iter().any(|k| k == key))
                .then(|| format!("[{key}::{value}]"))
        })
    })
}

/// Turn Markdown images pointing at local files into `![[file]]` embeds.
///
/// Obsidian resolves embeds by file name, so only the last path segment is kept (percent-decoded).
/// A trailing Logseq size annotation `{:height H, :width W}` becomes `|WxH` when both dimensions
/// are given. Remote images are left alone, and so is fenced code.
pub fn replace_asset_images(text: &str) -> String {
    map_outside_fences(text, |line| {
        IMAGE_RE
            .replace_all(line, |caps: &Captures<'_>| {
                let src = caps["src"].trim();
                if REMOTE_PREFIXES.iter().any(|prefix| src.starts_with(prefix)) {
                    return caps[0].to_owned();
                }
                let normalized = src.replace('\\', "/");
                let name = normalized.rsplit('/').next().unwrap_or(&normalized);
                let name = percent_decode_str(name).decode_utf8_lossy();

                let size = caps.name("opts").and_then(|opts| {
                    let height = HEIGHT_RE.captures(opts.as_str())?;
                    let width = WIDTH_RE.captures(opts.as_str())?;
                    Some(format!("|{}x{}", &width[1], &height[1]))
                });
                format!("![[{name}{}]]", size.unwrap_or_default())
            })
            .into_owned()
    })
}
