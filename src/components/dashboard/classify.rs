use crate::components::google::models::{RawEvent, RawTask};
use crate::utils::time::{parse_local_date, parse_rfc3339};
use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use tracing::debug;

const NO_TITLE: &str = "No Title";

/// Calendar event with a parsed start time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub start: DateTime<Local>,
    pub summary: String,
    pub is_all_day: bool,
}

/// Task with its due time in the offset it was reported in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub title: String,
    pub due: Option<DateTime<FixedOffset>>,
}

/// Which bucket an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBucket {
    Today,
    AllDayToday,
    Upcoming,
}

/// Events split by display relevance, each in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBuckets {
    pub today: Vec<Event>,
    pub upcoming: Vec<Event>,
    pub all_day_today: Vec<Event>,
}

/// Complete bucket set produced by one refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buckets {
    pub today: Vec<Event>,
    pub upcoming: Vec<Event>,
    pub all_day_today: Vec<Event>,
    pub tasks_due_today: Vec<Task>,
}

impl Buckets {
    /// Rebuild every bucket from freshly fetched records
    pub fn build(events: &[RawEvent], tasks: &[RawTask], now: &DateTime<Local>) -> Self {
        let EventBuckets {
            today,
            upcoming,
            all_day_today,
        } = classify_events(events, now);

        let tasks: Vec<Task> = tasks.iter().map(parse_task).collect();

        Self {
            today,
            upcoming,
            all_day_today,
            tasks_due_today: tasks_due_today(&tasks, now.date_naive()),
        }
    }
}

/// Parse a raw event, returning `None` when its start is missing or malformed.
///
/// An event is all-day when its start carries only a date.
pub fn parse_event(raw: &RawEvent) -> Option<Event> {
    let (start, is_all_day) = match (&raw.start.date_time, &raw.start.date) {
        (Some(date_time), _) => (parse_rfc3339(date_time)?.with_timezone(&Local), false),
        (None, Some(date)) => (parse_local_date(date)?, true),
        (None, None) => return None,
    };

    Some(Event {
        start,
        summary: raw.summary.clone().unwrap_or_else(|| NO_TITLE.to_string()),
        is_all_day,
    })
}

/// Bucket for a single event, or `None` for past events not on today's date
pub fn bucket_for(event: &Event, now: &DateTime<Local>) -> Option<EventBucket> {
    if event.start.date_naive() == now.date_naive() {
        if event.is_all_day {
            Some(EventBucket::AllDayToday)
        } else {
            Some(EventBucket::Today)
        }
    } else if event.start > *now {
        Some(EventBucket::Upcoming)
    } else {
        None
    }
}

/// Partition events into today / upcoming / all-day-today.
///
/// Unparseable events are skipped. Input order is kept within each bucket.
pub fn classify_events(events: &[RawEvent], now: &DateTime<Local>) -> EventBuckets {
    let mut buckets = EventBuckets::default();

    for raw in events {
        let Some(event) = parse_event(raw) else {
            debug!("Skipping event {:?} with unparseable start {:?}", raw.id, raw.start);
            continue;
        };

        match bucket_for(&event, now) {
            Some(EventBucket::Today) => buckets.today.push(event),
            Some(EventBucket::AllDayToday) => buckets.all_day_today.push(event),
            Some(EventBucket::Upcoming) => buckets.upcoming.push(event),
            None => {}
        }
    }

    buckets
}

/// Parse a raw task; a malformed due date counts as no due date
pub fn parse_task(raw: &RawTask) -> Task {
    let due = raw.due.as_deref().and_then(|due| {
        let parsed = parse_rfc3339(due);
        if parsed.is_none() {
            debug!("Ignoring unparseable due date {:?} on task {:?}", due, raw.id);
        }
        parsed
    });

    Task {
        title: raw.title.clone().unwrap_or_else(|| NO_TITLE.to_string()),
        due,
    }
}

/// Tasks whose due date is `today`, in input order.
///
/// The due date is read in the offset the task was reported in, since the
/// Tasks API encodes a plain date as midnight UTC.
pub fn tasks_due_today(tasks: &[Task], today: NaiveDate) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| task.due.is_some_and(|due| due.date_naive() == today))
        .cloned()
        .collect()
}
