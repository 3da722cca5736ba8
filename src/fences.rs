//! Fenced code block detection shared by the line-oriented rewrites.

/// Returns true when `line` opens or closes a ```` ``` ```` fence.
///
/// Logseq frequently nests code blocks inside list items, so a fence behind a bullet (`- `, `* `,
/// `+ `) or an ordered list marker (`1. `, `1) `) is recognized as well.
pub fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    let after_marker = strip_list_marker(trimmed).unwrap_or(trimmed);
    after_marker.trim_start().starts_with("```")
}

/// Strip a leading list marker (and the single whitespace character after it) from `s`.
///
/// Returns `None` when `s` doesn't begin with a list marker.
pub fn strip_list_marker(s: &str) -> Option<&str> {
    let after_marker = match s.strip_prefix(['-', '*', '+']) {
        Some(rest) => rest,
        None => {
            let after_digits = s.trim_start_matches(|c: char| c.is_ascii_digit());
            if after_digits.len() == s.len() {
                return None;
            }
            after_digits.strip_prefix(['.', ')'])?
        }
    };
    let mut chars = after_marker.chars();
    chars.next().filter(|c| c.is_whitespace())?;
    Some(chars.as_str())
}

/// Tracks whether iteration is currently inside a fenced code block.
#[derive(Debug, Default, Clone, Copy)]
pub struct FenceState {
    in_fence: bool,
}

impl FenceState {
    pub const fn new() -> Self {
        Self { in_fence: false }
    }

    /// Feed the next line. Returns true when the line should be left untouched, which is the
    /// case for the fence lines themselves and everything between them.
    pub fn verbatim(&mut self, line: &str) -> bool {
        if is_fence(line) {
            self.in_fence = !self.in_fence;
            return true;
        }
        self.in_fence
    }
}

/// Apply `rewrite` to every line of `text` that lies outside of fenced code blocks.
///
/// Line endings are preserved exactly, including a missing newline on the final line.
pub fn map_outside_fences<F>(text: &str, mut rewrite: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut state = FenceState::new();
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (content, ending) = match line.strip_suffix('\n') {
            Some(content) => (content, "\n"),
            None => (line, ""),
        };
        if state.verbatim(content) {
            out.push_str(line);
        } else {
            out.push_str(&rewrite(content));
            out.push_str(ending);
        }
    }
    out
}
