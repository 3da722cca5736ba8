//! Logseq task markers and their Obsidian checklist rendering.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use snafu::Snafu;

use crate::dates::{extract_schedule, Schedule, Whitespace};

const STATES: &str = "TODO|DONE|DOING|LATER|NOW|WAIT|WAITING|IN-PROGRESS|CANCELED|CANCELLED";

// The priority is only recognized directly after the state keyword.
static STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<state>{STATES})\b(?:\s+\[#(?P<prio>[ABC])\])?\s*(?P<rest>.*)$"
    ))
    .unwrap()
});

static TASK_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<indent>\s*)-\s+(?P<after>.*)$").unwrap());

/// Output dialect for task metadata (priorities, dates and recurrence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum TasksFormat {
    /// Emoji signifiers as used by the Obsidian Tasks plugin (`⏫`, `⏳`, `📅`, `🔁`).
    #[default]
    Emoji,
    /// Dataview inline fields such as `[due::2024-09-15]`.
    InlineField,
}

#[derive(Debug, Snafu)]
#[snafu(display("unknown tasks format '{value}' (expected one of: emoji, inline-field)"))]
pub struct ParseTasksFormatError {
    value: String,
}

impl FromStr for TasksFormat {
    type Err = ParseTasksFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "emoji" => Ok(Self::Emoji),
            "inline-field" | "dataview" => Ok(Self::InlineField),
            _ => ParseTasksFormatSnafu { value: s }.fail(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Todo,
    Doing,
    Later,
    Now,
    Wait,
    Waiting,
    InProgress,
    Done,
    Canceled,
    Cancelled,
}

impl TaskState {
    fn from_keyword(keyword: &str) -> Option<Self> {
        let state = match keyword {
            "TODO" => Self::Todo,
            "DOING" => Self::Doing,
            "LATER" => Self::Later,
            "NOW" => Self::Now,
            "WAIT" => Self::Wait,
            "WAITING" => Self::Waiting,
            "IN-PROGRESS" => Self::InProgress,
            "DONE" => Self::Done,
            "CANCELED" => Self::Canceled,
            "CANCELLED" => Self::Cancelled,
            _ => return None,
        };
        Some(state)
    }

    /// Finished and abandoned tasks are both rendered as checked.
    pub const fn is_checked(self) -> bool {
        matches!(self, Self::Done | Self::Canceled | Self::Cancelled)
    }

    pub const fn checkbox(self) -> &'static str {
        if self.is_checked() {
            "- [x]"
        } else {
            "- [ ]"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "A" => Some(Self::High),
            "B" => Some(Self::Medium),
            "C" => Some(Self::Low),
            _ => None,
        }
    }

    /// The priority marker appended to a task line, including its leading space.
    pub const fn marker(self, format: TasksFormat) -> &'static str {
        match (format, self) {
            (TasksFormat::Emoji, Self::High) => " ⏫",
            (TasksFormat::Emoji, Self::Medium) => " 🔼",
            (TasksFormat::Emoji, Self::Low) => " 🔽",
            (TasksFormat::InlineField, Self::High) => " [priority::high]",
            (TasksFormat::InlineField, Self::Medium) => " [priority::medium]",
            (TasksFormat::InlineField, Self::Low) => " [priority::low]",
        }
    }
}

/// Render the priority marker for an optional priority. No priority renders as an empty string.
pub fn priority_marker(priority: Option<Priority>, format: TasksFormat) -> &'static str {
    priority.map_or("", |p| p.marker(format))
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The task part of a block head: `STATE [#P] rest`.
pub struct TaskHead<'a> {
    pub state: TaskState,
    pub priority: Option<Priority>,
    /// Everything after the state and priority tokens.
    pub rest: &'a str,
}

impl<'a> TaskHead<'a> {
    /// Parse the text following a bullet marker. Returns `None` when it doesn't start with a
    /// recognized (upper-case) task state.
    pub fn parse(content: &'a str) -> Option<Self> {
        let caps = STATE_RE.captures(content)?;
        Some(TaskHead {
            state: TaskState::from_keyword(caps.name("state")?.as_str())?,
            priority: caps
                .name("prio")
                .and_then(|m| Priority::from_letter(m.as_str())),
            rest: caps.name("rest").map_or("", |m| m.as_str()),
        })
    }
}

/// Render a task as an Obsidian checklist item.
///
/// The order is: indentation, checkbox, content, priority marker, schedule suffix.
pub fn render_task_line(
    indent: &str,
    state: TaskState,
    content: &str,
    priority: Option<Priority>,
    schedule: &Schedule,
    format: TasksFormat,
) -> String {
    let mut line = format!("{indent}{}", state.checkbox());
    if !content.is_empty() {
        line.push(' ');
        line.push_str(content);
    }
    line.push_str(priority_marker(priority, format));
    line.push_str(&schedule.suffix(format));
    line
}

/// Convert a single Logseq task line (`- TODO ...`) into a checklist line.
///
/// Lines which aren't hyphen bullets starting with an upper-case task state are returned as-is.
pub fn transform_task_line(line: &str, format: TasksFormat) -> String {
    let Some(caps) = TASK_LINE_RE.captures(line) else {
        return line.to_owned();
    };
    let Some(task) = caps.name("after").and_then(|m| TaskHead::parse(m.as_str())) else {
        return line.to_owned();
    };
    let (content, schedule) = extract_schedule(task.rest, Whitespace::Squash);
    render_task_line(
        &caps["indent"],
        task.state,
        &content,
        task.priority,
        &schedule,
        format,
    )
}
