//! Logseq `key:: value` properties.

use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::{Mapping, Value};

static PAGE_PROPERTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<key>[A-Za-z0-9_\-]+)::\s*(?P<value>.*)$").unwrap());

// Block properties may be indented underneath a list item.
static BLOCK_PROPERTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?P<key>[A-Za-z0-9_\-]+)::\s*(?P<value>.*)$").unwrap());

/// The properties declared at the top of a Logseq page.
///
/// Keys are lower-cased, values are kept as raw strings (including any embedded markup). This is
/// backed by a [`serde_yaml::Mapping`] which preserves insertion order.
pub type Properties = Mapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A single `key:: value` declaration.
pub struct Property<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

impl<'a> Property<'a> {
    /// Parse a page-level property line. The key must start at the first column.
    pub fn parse_page(line: &'a str) -> Option<Self> {
        Self::from_regex(&PAGE_PROPERTY_RE, line)
    }

    /// Parse a block-level property line, which may be indented.
    pub fn parse_block(line: &'a str) -> Option<Self> {
        Self::from_regex(&BLOCK_PROPERTY_RE, line)
    }

    fn from_regex(re: &Regex, line: &'a str) -> Option<Self> {
        let caps = re.captures(line)?;
        let key = caps.name("key")?.as_str();
        let value = caps.name("value")?.as_str().trim();
        Some(Property { key, value })
    }

    /// Lower-cased key, which is how keys are compared and emitted.
    pub fn normalized_key(&self) -> String {
        self.key.to_lowercase()
    }
}

/// Parse the leading property block of a page.
///
/// Blank lines before the first property are skipped. Parsing stops at the first line which
/// isn't a property, including a blank line once properties have been seen. Returns the
/// properties together with the number of lines consumed (leading blank lines included), so the
/// caller can slice off the body.
///
/// When a key occurs more than once, the last occurrence wins.
pub fn parse_page_properties<S: AsRef<str>>(lines: &[S]) -> (Properties, usize) {
    let leading = lines
        .iter()
        .take_while(|line| line.as_ref().trim().is_empty())
        .count();
    let declarations: Vec<Property<'_>> = lines
        .iter()
        .skip(leading)
        .map_while(|line| Property::parse_page(line.as_ref()))
        .collect();

    let mut properties = Properties::new();
    for property in &declarations {
        properties.insert(
            Value::String(property.normalized_key()),
            Value::String(property.value.to_owned()),
        );
    }
    (properties, leading.saturating_add(declarations.len()))
}

/// Look up a property value by (lower-case) key.
pub fn get<'a>(properties: &'a Properties, key: &str) -> Option<&'a str> {
    properties.get(key).and_then(Value::as_str)
}
