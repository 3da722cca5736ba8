//! Reconstruction of Logseq's block model from flat Markdown lines.
//!
//! Logseq stores every block as a list item. Metadata belonging to a block (task state,
//! `SCHEDULED`/`DEADLINE` timestamps, `id::` and other properties) may appear on the bullet line
//! itself or on any of the lines that continue it. Obsidian on the other hand expects all of it on
//! a single line, with the block identifier as a trailing `^id` anchor.
//!
//! [`assemble_blocks`] walks the lines with a cursor and drives a small state machine:
//!
//! - [`State::BetweenBlocks`]: lines are copied until a bullet opens a new [`Block`].
//! - [`State::Head`]: the bullet's own text is classified (property declaration, task or plain
//!   content) and its timestamps are extracted.
//! - [`State::Continuations`]: following lines which continue the block are absorbed. The first
//!   line that doesn't closes the block, which is then rendered, and is re-examined between
//!   blocks.

use std::sync::LazyLock;

use regex::Regex;

use crate::dates::{extract_schedule, Schedule, Whitespace};
use crate::properties::Property;
use crate::tasks::{render_task_line, Priority, TaskHead, TaskState, TasksFormat};

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<indent>[ \t]*)-(?:\s+(?P<after>.*))?$").unwrap());

const COLLAPSED_KEY: &str = "collapsed";
const ID_KEY: &str = "id";

/// Markers which carry no content of their own, so an anchor attached to them would be anchoring
/// nothing.
const BARE_MARKERS: [&str; 3] = ["-", "- [ ]", "- [x]"];

#[derive(Debug)]
enum State<'a> {
    BetweenBlocks,
    /// A bullet was found; holds the new block and the text after the bullet marker.
    Head(Block<'a>, &'a str),
    Continuations(Block<'a>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Continuation {
    Property(String),
    Content(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HeadKind {
    /// The bullet's text was a `key:: value` declaration.
    Property,
    Task {
        state: TaskState,
        priority: Option<Priority>,
        content: String,
    },
    Content(String),
    /// An empty bullet, or one which only carried timestamps.
    Empty,
}

/// One logical Logseq block: a bullet line plus the lines continuing it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Block<'a> {
    indent: &'a str,
    head: HeadKind,
    schedule: Schedule,
    id: Option<String>,
    pre_properties: Vec<String>,
    continuations: Vec<Continuation>,
}

impl<'a> Block<'a> {
    fn open(indent: &'a str) -> Self {
        Block {
            indent,
            head: HeadKind::Empty,
            schedule: Schedule::default(),
            id: None,
            pre_properties: Vec::new(),
            continuations: Vec::new(),
        }
    }

    /// Classify the text following the bullet marker.
    fn absorb_head(&mut self, after: &str) {
        if let Some(property) = Property::parse_block(after) {
            self.head = HeadKind::Property;
            if let Some(line) = self.absorb_property(property) {
                self.pre_properties.push(line);
            }
            return;
        }

        match TaskHead::parse(after) {
            Some(task) => {
                let (content, schedule) = extract_schedule(task.rest, Whitespace::Squash);
                self.schedule.merge(schedule);
                self.head = HeadKind::Task {
                    state: task.state,
                    priority: task.priority,
                    content,
                };
            }
            None => {
                let (content, schedule) = extract_schedule(after, Whitespace::Squash);
                self.schedule.merge(schedule);
                self.head = if content.is_empty() {
                    HeadKind::Empty
                } else {
                    HeadKind::Content(content)
                };
            }
        }
    }

    /// Record a property belonging to this block. Returns the line to emit for it, if any.
    ///
    /// `collapsed::` is dropped (Obsidian keeps fold state outside of the Markdown) and `id::`
    /// becomes the block's identifier.
    fn absorb_property(&mut self, property: Property<'_>) -> Option<String> {
        let key = property.normalized_key();
        match key.as_str() {
            COLLAPSED_KEY => None,
            ID_KEY => {
                if !property.value.is_empty() {
                    self.id = Some(property.value.to_owned());
                }
                None
            }
            _ => Some(format!("{}{key}:: {}", self.indent, property.value)),
        }
    }

    /// Returns true when `line` continues this block rather than starting something new.
    fn continues_with(&self, line: &str) -> bool {
        if line.trim().is_empty() {
            return false;
        }
        line.strip_prefix(self.indent)
            .is_some_and(|rest| !rest.trim_start_matches([' ', '\t']).starts_with('-'))
    }

    fn absorb_continuation(&mut self, line: &str) {
        let rest = line.strip_prefix(self.indent).unwrap_or(line);
        if let Some(property) = Property::parse_block(rest) {
            if let Some(line) = self.absorb_property(property) {
                self.continuations.push(Continuation::Property(line));
            }
            return;
        }
        let (residual, schedule) = extract_schedule(rest, Whitespace::Preserve);
        self.schedule.merge(schedule);
        let kept = format!("{}{residual}", self.indent);
        let kept = kept.trim_end();
        // A line which only carried timestamps disappears entirely.
        if !kept.is_empty() {
            self.continuations.push(Continuation::Content(kept.to_owned()));
        }
    }

    /// Render the block into its output lines.
    fn finish(mut self, format: TasksFormat) -> Vec<String> {
        let suffix = self.schedule.suffix(format);
        let mut head_line = match &self.head {
            HeadKind::Task {
                state,
                priority,
                content,
            } => Some(render_task_line(
                self.indent,
                *state,
                content,
                *priority,
                &self.schedule,
                format,
            )),
            HeadKind::Content(content) => Some(format!("{}- {content}{suffix}", self.indent)),
            HeadKind::Empty | HeadKind::Property if !suffix.is_empty() => {
                Some(format!("{}- {}", self.indent, suffix.trim()))
            }
            HeadKind::Empty | HeadKind::Property => None,
        };

        if head_line.is_none() {
            head_line = self.promote_continuation(&suffix);
        }
        // An explicit empty bullet is kept. Blocks which only consisted of properties, or of
        // nothing but an identifier, don't get a placeholder.
        if head_line.is_none() && self.head == HeadKind::Empty && self.id.is_none() {
            head_line = Some(format!("{}-", self.indent));
        }

        // The anchor goes onto the head line if it shows anything, otherwise onto the first
        // content line. Failing both it stays pending as an `id::` line, which the anchor pass
        // attaches to the preceding content.
        let mut pending_anchor = None;
        if let Some(id) = self.id.take() {
            match head_line.as_mut() {
                Some(head) if has_visible_content(head) => attach_anchor(head, &id),
                _ => {
                    if !self.anchor_first_content(&id) {
                        pending_anchor = Some(id);
                    }
                }
            }
        }

        let mut out = self.pre_properties;
        if let Some(id) = pending_anchor {
            out.push(format!("{}id:: {id}", self.indent));
        }
        out.extend(head_line);
        out.extend(self.continuations.into_iter().map(|c| match c {
            Continuation::Property(line) | Continuation::Content(line) => line,
        }));
        out
    }

    /// Turn the first content continuation into the head bullet.
    fn promote_continuation(&mut self, suffix: &str) -> Option<String> {
        let (idx, content) =
            self.continuations
                .iter()
                .enumerate()
                .find_map(|(idx, c)| match c {
                    Continuation::Content(line) => {
                        let content = line.strip_prefix(self.indent).unwrap_or(line);
                        Some((idx, content.trim_start().to_owned()))
                    }
                    Continuation::Property(_) => None,
                })?;
        self.continuations.remove(idx);
        Some(format!("{}- {content}{suffix}", self.indent))
    }

    /// Attach an anchor to the first content continuation. Returns false if there is none.
    fn anchor_first_content(&mut self, id: &str) -> bool {
        let line = self.continuations.iter_mut().find_map(|c| match c {
            Continuation::Content(line) => Some(line),
            Continuation::Property(_) => None,
        });
        match line {
            Some(line) => {
                attach_anchor(line, id);
                true
            }
            None => false,
        }
    }
}

fn has_visible_content(line: &str) -> bool {
    !BARE_MARKERS.contains(&line.trim())
}

/// Append ` ^id` to `line`, unless it already ends with that anchor.
fn attach_anchor(line: &mut String, id: &str) {
    let anchor = format!("^{id}");
    if line.trim_end().ends_with(&anchor) {
        return;
    }
    line.truncate(line.trim_end().len());
    line.push(' ');
    line.push_str(&anchor);
}

/// Group `lines` into Logseq blocks and re-render each block in Obsidian's conventions.
///
/// Lines which are not part of a block (paragraphs, headings, blank lines, ...) are passed
/// through unchanged.
pub fn assemble_blocks<S: AsRef<str>>(lines: &[S], format: TasksFormat) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut lines = lines.iter().map(AsRef::<str>::as_ref).peekable();
    let mut state = State::BetweenBlocks;
    loop {
        let line = lines.peek().copied();
        state = match (state, line) {
            (State::BetweenBlocks, None) => break,
            (State::BetweenBlocks, Some(line)) => {
                lines.next();
                match BULLET_RE.captures(line) {
                    Some(caps) => {
                        let indent = caps.name("indent").map_or("", |m| m.as_str());
                        let after = caps.name("after").map_or("", |m| m.as_str());
                        State::Head(Block::open(indent), after)
                    }
                    None => {
                        out.push(line.to_owned());
                        State::BetweenBlocks
                    }
                }
            }
            (State::Head(mut block, after), _) => {
                block.absorb_head(after);
                State::Continuations(block)
            }
            (State::Continuations(mut block), Some(line)) if block.continues_with(line) => {
                lines.next();
                block.absorb_continuation(line);
                State::Continuations(block)
            }
            (State::Continuations(block), _) => {
                out.extend(block.finish(format));
                State::BetweenBlocks
            }
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn assemble(text: &str, format: TasksFormat) -> String {
        let lines: Vec<&str> = text.lines().collect();
        assemble_blocks(&lines, format).join("\n")
    }

    #[rstest]
    #[case(
        "- TODO SCHEDULED: <2024-09-10 Tue 07:00 .+1d>",
        TasksFormat::Emoji,
        "- [ ] ⏳ 2024-09-10 07:00 🔁 every 1 day when done"
    )]
    #[case(
        "- TODO DEADLINE: <2024-09-15 ++2w>",
        TasksFormat::InlineField,
        "- [ ] [due::2024-09-15] [repeat::every 2 weeks when done]"
    )]
    #[case(
        "- DONE [#A] File taxes DEADLINE: <2024-04-15 Mon>",
        TasksFormat::Emoji,
        "- [x] File taxes ⏫ 📅 2024-04-15"
    )]
    fn single_line_tasks(#[case] input: &str, #[case] format: TasksFormat, #[case] expected: &str) {
        assert_eq!(assemble(input, format), expected);
    }

    #[test]
    fn metadata_on_continuation_lines_is_lifted() {
        let input = "- TODO Write report\n  SCHEDULED: <2024-09-10 Tue>\n  id:: 650a1b2c\n  collapsed:: true\n\t- child";
        assert_eq!(
            assemble(input, TasksFormat::Emoji),
            "- [ ] Write report ⏳ 2024-09-10 ^650a1b2c\n\t- child"
        );
    }

    #[test]
    fn continuation_text_around_a_date_is_kept() {
        let input = "- Meeting\n  notes here DEADLINE: <2024-01-05>";
        assert_eq!(
            assemble(input, TasksFormat::Emoji),
            "- Meeting 📅 2024-01-05\n  notes here"
        );
    }

    #[test]
    fn first_timestamp_of_each_kind_wins() {
        let input = "- Review\n  SCHEDULED: <2024-01-01>\n  SCHEDULED: <2024-02-02>";
        assert_eq!(assemble(input, TasksFormat::Emoji), "- Review ⏳ 2024-01-01");
    }

    #[test]
    fn other_properties_are_kept_in_place() {
        let input = "- Book\n  author:: Someone\n  Rating:: 5";
        assert_eq!(
            assemble(input, TasksFormat::Emoji),
            "- Book\nauthor:: Someone\nrating:: 5"
        );
    }

    #[test]
    fn last_id_wins() {
        let input = "- a\n  id:: first1\n  id:: second";
        assert_eq!(assemble(input, TasksFormat::Emoji), "- a ^second");
    }

    #[test]
    fn existing_anchor_is_not_repeated() {
        assert_eq!(
            assemble("- foo ^abc123\n  id:: abc123", TasksFormat::Emoji),
            "- foo ^abc123"
        );
        assert_eq!(
            assemble("- TODO\n  details ^abc123 \n  id:: abc123", TasksFormat::Emoji),
            "- [ ]\n  details ^abc123"
        );
    }

    #[test]
    fn properties_of_nested_blocks_use_the_block_indent() {
        let input = "- Book\n  author:: Someone\n\t- child\n\t  rating:: 5";
        assert_eq!(
            assemble(input, TasksFormat::Emoji),
            "- Book\nauthor:: Someone\n\t- child\n\trating:: 5"
        );
    }

    #[test]
    fn anchor_goes_to_first_content_line_when_head_is_bare() {
        let input = "- TODO\n  details\n  id:: abc123";
        assert_eq!(
            assemble(input, TasksFormat::Emoji),
            "- [ ]\n  details ^abc123"
        );
    }

    #[test]
    fn unattachable_anchor_stays_as_id_line() {
        assert_eq!(
            assemble("- TODO\n  id:: abc123", TasksFormat::Emoji),
            "id:: abc123\n- [ ]"
        );
    }

    #[test]
    fn property_head_is_promoted_from_continuation() {
        let input = "- id:: 650a1b2c\n  Some text";
        assert_eq!(
            assemble(input, TasksFormat::Emoji),
            "- Some text ^650a1b2c"
        );
    }

    #[test]
    fn property_only_block_has_no_placeholder() {
        let input = "- template:: daily\n  template-including-parent:: false";
        assert_eq!(
            assemble(input, TasksFormat::Emoji),
            "template:: daily\ntemplate-including-parent:: false"
        );
    }

    #[test]
    fn id_only_block_keeps_id_line() {
        assert_eq!(
            assemble("- id:: 650a1b2c", TasksFormat::Emoji),
            "id:: 650a1b2c"
        );
        assert_eq!(
            assemble("-\n  id:: 650a1b2c", TasksFormat::Emoji),
            "id:: 650a1b2c"
        );
    }

    #[test]
    fn collapsed_head_disappears() {
        assert_eq!(
            assemble("- collapsed:: true\n- next", TasksFormat::Emoji),
            "- next"
        );
    }

    #[rstest]
    #[case("-", "-")]
    #[case("- ", "-")]
    #[case("  - ", "  -")]
    #[case("\t-", "\t-")]
    fn empty_bullets(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(assemble(input, TasksFormat::Emoji), expected);
    }

    #[test]
    fn dates_only_head() {
        assert_eq!(
            assemble("- SCHEDULED: <2024-01-01 Mon>", TasksFormat::InlineField),
            "- [scheduled::2024-01-01]"
        );
    }

    #[test]
    fn non_block_lines_pass_through() {
        let input = "# Title\n\nSome paragraph\n- item\n\n  trailing text\n---";
        assert_eq!(assemble(input, TasksFormat::Emoji), input);
    }

    #[test]
    fn nested_blocks_keep_their_indentation() {
        let input = "- parent\n\t- DOING child\n\t  DEADLINE: <2024-03-01 Fri>\n\t\t- grandchild";
        assert_eq!(
            assemble(input, TasksFormat::Emoji),
            "- parent\n\t- [ ] child 📅 2024-03-01\n\t\t- grandchild"
        );
    }
}
