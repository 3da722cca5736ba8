//! Extraction of Logseq `SCHEDULED:`/`DEADLINE:` timestamps and their repeaters.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::tasks::TasksFormat;

static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?P<kind>SCHEDULED|DEADLINE)\s*:?\s*",
        r"<\s*",
        r"(?P<date>\d{4}-\d{2}-\d{2})",
        // Day of week
        r"(?:\s+\w{3})?",
        r"(?:\s+(?P<time>\d{2}:\d{2}))?",
        r"(?:\s+(?P<rep_kind>\.\+|\+\+|\+)(?P<rep_num>\d+)(?P<rep_unit>[ymwdh]))?",
        r"\s*>",
    ))
    .unwrap()
});

static MULTI_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
/// A date with an optional time of day, kept in the textual form Logseq wrote it in.
pub struct Timestamp {
    pub date: String,
    pub time: Option<String>,
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.time {
            Some(time) => write!(f, "{} {time}", self.date),
            None => write!(f, "{}", self.date),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The three org-mode repeater styles supported by Logseq.
pub enum RepeaterKind {
    /// `+1w`: shift by the interval once.
    Cumulate,
    /// `++1w`: shift by the interval until the date lies in the future.
    CatchUp,
    /// `.+1w`: shift relative to the completion date.
    Restart,
}

impl RepeaterKind {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "+" => Some(Self::Cumulate),
            "++" => Some(Self::CatchUp),
            ".+" => Some(Self::Restart),
            _ => None,
        }
    }

    /// Whether the next occurrence is computed from the completion date.
    pub const fn when_done(self) -> bool {
        matches!(self, Self::CatchUp | Self::Restart)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatUnit {
    Year,
    Month,
    Week,
    Day,
    Hour,
}

impl RepeatUnit {
    fn from_letter(letter: &str) -> Option<Self> {
        match letter.to_ascii_lowercase().as_str() {
            "y" => Some(Self::Year),
            "m" => Some(Self::Month),
            "w" => Some(Self::Week),
            "d" => Some(Self::Day),
            "h" => Some(Self::Hour),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Week => "week",
            Self::Day => "day",
            Self::Hour => "hour",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A repeater such as `.+1d`.
pub struct Repeater {
    pub kind: RepeaterKind,
    /// The interval as written, minus leading zeros. Kept as text so that no count is too large.
    pub count: String,
    pub unit: RepeatUnit,
}

impl Repeater {
    fn new(kind: RepeaterKind, digits: &str, unit: RepeatUnit) -> Self {
        let trimmed = digits.trim_start_matches('0');
        let count = if trimmed.is_empty() { "0" } else { trimmed };
        Self {
            kind,
            count: count.to_owned(),
            unit,
        }
    }
}

impl fmt::Display for Repeater {
    /// Renders the repeater the way the Obsidian Tasks plugin reads recurrence rules, for example
    /// `every 2 weeks when done`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.count == "1" { "" } else { "s" };
        write!(f, "every {} {}{plural}", self.count, self.unit.name())?;
        if self.kind.when_done() {
            write!(f, " when done")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Scheduling metadata collected for a single block.
///
/// Each field is filled at most once: the first occurrence wins.
pub struct Schedule {
    pub scheduled: Option<Timestamp>,
    pub due: Option<Timestamp>,
    pub repeat: Option<Repeater>,
}

impl Schedule {
    pub const fn is_empty(&self) -> bool {
        self.scheduled.is_none() && self.due.is_none() && self.repeat.is_none()
    }

    /// Fill any field that is still unset from `other`.
    pub fn merge(&mut self, other: Self) {
        if self.scheduled.is_none() {
            self.scheduled = other.scheduled;
        }
        if self.due.is_none() {
            self.due = other.due;
        }
        if self.repeat.is_none() {
            self.repeat = other.repeat;
        }
    }

    fn record(&mut self, caps: &Captures<'_>) {
        let timestamp = Timestamp {
            date: caps["date"].to_owned(),
            time: caps.name("time").map(|m| m.as_str().to_owned()),
        };
        if caps["kind"].eq_ignore_ascii_case("SCHEDULED") {
            self.scheduled.get_or_insert(timestamp);
        } else {
            self.due.get_or_insert(timestamp);
        }
        if self.repeat.is_none() {
            self.repeat = parse_repeater(caps);
        }
    }

    /// Render the schedule as a suffix for a task line, including the leading space.
    ///
    /// Returns an empty string when there is nothing to render.
    pub fn suffix(&self, format: TasksFormat) -> String {
        let mut suffix = String::new();
        match format {
            TasksFormat::Emoji => {
                if let Some(scheduled) = &self.scheduled {
                    suffix.push_str(&format!(" ⏳ {scheduled}"));
                }
                if let Some(due) = &self.due {
                    suffix.push_str(&format!(" 📅 {due}"));
                }
                if let Some(repeat) = &self.repeat {
                    suffix.push_str(&format!(" 🔁 {repeat}"));
                }
            }
            TasksFormat::InlineField => {
                if let Some(scheduled) = &self.scheduled {
                    suffix.push_str(&format!(" [scheduled::{scheduled}]"));
                }
                if let Some(due) = &self.due {
                    suffix.push_str(&format!(" [due::{due}]"));
                }
                if let Some(repeat) = &self.repeat {
                    suffix.push_str(&format!(" [repeat::{repeat}]"));
                }
            }
        }
        suffix
    }
}

fn parse_repeater(caps: &Captures<'_>) -> Option<Repeater> {
    Some(Repeater::new(
        RepeaterKind::from_token(caps.name("rep_kind")?.as_str())?,
        caps.name("rep_num")?.as_str(),
        RepeatUnit::from_letter(caps.name("rep_unit")?.as_str())?,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How the text around removed timestamps is cleaned up.
pub enum Whitespace {
    /// Squash runs of whitespace into a single space and trim. Used for block head lines.
    Squash,
    /// Leave the remaining text exactly as it was. Used for continuation lines, so their
    /// indentation survives.
    Preserve,
}

/// Remove all `SCHEDULED`/`DEADLINE` timestamps from `text`.
///
/// Returns the remaining text and the collected [`Schedule`]. Running this on its own output
/// finds nothing further and leaves the text unchanged.
pub fn extract_schedule(text: &str, whitespace: Whitespace) -> (String, Schedule) {
    let mut schedule = Schedule::default();
    let cleaned = TIMESTAMP_RE.replace_all(text, |caps: &Captures<'_>| {
        schedule.record(caps);
        ""
    });

    let cleaned = match whitespace {
        Whitespace::Squash => MULTI_SPACE_RE.replace_all(&cleaned, " ").trim().to_owned(),
        Whitespace::Preserve => cleaned.into_owned(),
    };
    (cleaned, schedule)
}
