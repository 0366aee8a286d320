use super::classify::{Event, Task};
use crate::components::system_info::HostMetrics;
use crate::utils::time::{clock_label, end_of_week};
use chrono::{DateTime, Local, NaiveDate};

/// Columns kept free at the right edge of every line
pub const LINE_MARGIN: u16 = 4;
const ELLIPSIS: char = '…';

/// What a line on a page represents; the renderer styles by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Entry,
    Spacer,
    Heading,
    Overflow,
    Metric,
}

/// One display line: a short label (time, bullet, metric name) and its text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLine {
    pub kind: LineKind,
    pub label: String,
    pub text: String,
}

impl PageLine {
    fn new(kind: LineKind, label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            text: text.into(),
        }
    }

    fn spacer() -> Self {
        Self::new(LineKind::Spacer, "", "")
    }

    /// Label and text joined by a space
    pub fn rendered(&self) -> String {
        match (self.label.is_empty(), self.text.is_empty()) {
            (true, _) => self.text.clone(),
            (false, true) => self.label.clone(),
            (false, false) => format!("{} {}", self.label, self.text),
        }
    }

    /// Shorten the line so it renders in at most `max` columns
    fn fitted(mut self, max: usize) -> Self {
        if self.rendered().chars().count() <= max {
            return self;
        }
        if self.label.is_empty() {
            self.text = truncate_with_ellipsis(&self.text, max);
            return self;
        }
        let label_width = self.label.chars().count() + 1;
        if max > label_width {
            self.text = truncate_with_ellipsis(&self.text, max - label_width);
        } else {
            self.label = truncate_with_ellipsis(&self.label, max);
            self.text.clear();
        }
        self
    }
}

/// Immutable description of one screen; compared structurally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub clock: String,
    pub lines: Vec<PageLine>,
    pub footer: String,
}

/// A dated line of text to place on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaItem {
    pub when: DateTime<Local>,
    pub text: String,
}

impl From<&Event> for AgendaItem {
    fn from(event: &Event) -> Self {
        Self {
            when: event.start,
            text: event.summary.clone(),
        }
    }
}

impl AgendaItem {
    /// Item for a task; tasks without a due time have no place on a page
    pub fn from_task(task: &Task) -> Option<Self> {
        task.due.map(|due| Self {
            when: due.with_timezone(&Local),
            text: task.title.clone(),
        })
    }
}

/// Position of the page in the rotation and the screen it goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageContext {
    /// 1-based page number
    pub index: usize,
    pub total: usize,
    pub countdown: u32,
    pub width: u16,
    pub now: DateTime<Local>,
}

impl PageContext {
    fn max_line_width(&self) -> usize {
        self.width.saturating_sub(LINE_MARGIN) as usize
    }
}

/// How many items fit on a page and when overflow notes appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityPolicy {
    pub item_cap: usize,
    pub task_overflow_threshold: usize,
}

/// Footer shared by every page
pub fn footer(ctx: &PageContext) -> String {
    format!(
        "Page {}/{} | Next in {:02}s",
        ctx.index, ctx.total, ctx.countdown
    )
}

/// Label for an item: clock time today, weekday for the rest of this
/// week, month and day otherwise.
pub fn time_label(when: &DateTime<Local>, today: NaiveDate) -> String {
    let date = when.date_naive();
    if date == today {
        clock_label(when)
    } else if date > today && date <= end_of_week(today) {
        when.format("%a").to_string()
    } else {
        when.format("%b %-d").to_string()
    }
}

/// Cut `text` to `max` characters, marking the cut with an ellipsis
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut truncated: String = text.chars().take(max - 1).collect();
    truncated.push(ELLIPSIS);
    truncated
}

/// Compose an agenda page from primary items and an optional task list.
///
/// At most `item_cap` items and `item_cap` tasks are listed. The task
/// overflow note is driven by `task_overflow_threshold` alone, so it can
/// appear even when every task is listed.
pub fn compose_agenda_page(
    title: &str,
    items: &[AgendaItem],
    tasks: &[AgendaItem],
    ctx: &PageContext,
    policy: &CapacityPolicy,
) -> Page {
    let today = ctx.now.date_naive();
    let max = ctx.max_line_width();
    let mut lines = Vec::new();

    for item in items.iter().take(policy.item_cap) {
        lines.push(
            PageLine::new(LineKind::Entry, time_label(&item.when, today), item.text.as_str())
                .fitted(max),
        );
    }

    if !tasks.is_empty() {
        lines.push(PageLine::spacer());
        lines.push(PageLine::new(LineKind::Heading, "", "Tasks:"));
        for task in tasks.iter().take(policy.item_cap) {
            lines.push(PageLine::new(LineKind::Entry, "•", task.text.as_str()).fitted(max));
        }
    }

    if items.len() > policy.item_cap {
        lines.push(PageLine::new(
            LineKind::Overflow,
            "",
            format!("+{} more...", items.len() - policy.item_cap),
        ));
    }
    if tasks.len() > policy.task_overflow_threshold {
        lines.push(PageLine::new(
            LineKind::Overflow,
            "",
            format!("+{} more tasks...", tasks.len() - policy.task_overflow_threshold),
        ));
    }

    Page {
        title: title.to_string(),
        clock: clock_label(&ctx.now),
        lines,
        footer: footer(ctx),
    }
}

/// Compose the host metrics page.
///
/// Only readings that are present get a line; with none at all, or `None`
/// for a failed sample, the page shows a placeholder.
pub fn compose_system_page(metrics: Option<&HostMetrics>, ctx: &PageContext) -> Page {
    let max = ctx.max_line_width();
    let mut lines = Vec::new();

    if let Some(metrics) = metrics {
        if let Some(cpu_percent) = metrics.cpu_percent {
            lines.push(PageLine::new(
                LineKind::Metric,
                "CPU Usage:",
                format!("{:.1}%", cpu_percent),
            ));
        }
        if let Some(memory) = &metrics.memory {
            lines.push(PageLine::new(
                LineKind::Metric,
                "RAM Usage:",
                format!(
                    "{}MB / {}MB ({:.1}%)",
                    memory.used_mb, memory.total_mb, memory.percent
                ),
            ));
        }
        if let Some(temperature) = metrics.temperature_c {
            lines.push(PageLine::new(
                LineKind::Metric,
                "Temperature:",
                format!("{:.1}°C", temperature),
            ));
        }
    }

    if lines.is_empty() {
        lines.push(PageLine::new(LineKind::Metric, "", "Host metrics unavailable"));
    }

    Page {
        title: "System Info".to_string(),
        clock: clock_label(&ctx.now),
        lines: lines.into_iter().map(|line| line.fitted(max)).collect(),
        footer: footer(ctx),
    }
}
