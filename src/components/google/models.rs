use serde::{Deserialize, Serialize};

/// Calendar event as returned by the Calendar API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(default)]
    pub id: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub start: EventStart,
}

/// Start of an event: `dateTime` for timed events, `date` for all-day ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventStart {
    pub date_time: Option<String>,
    pub date: Option<String>,
}

#[cfg(test)]
impl RawEvent {
    /// Timed event starting at an RFC 3339 timestamp
    pub fn timed(summary: &str, date_time: &str) -> Self {
        Self {
            summary: Some(summary.to_string()),
            start: EventStart {
                date_time: Some(date_time.to_string()),
                date: None,
            },
            ..Default::default()
        }
    }

    /// All-day event on a YYYY-MM-DD date
    pub fn all_day(summary: &str, date: &str) -> Self {
        Self {
            summary: Some(summary.to_string()),
            start: EventStart {
                date_time: None,
                date: Some(date.to_string()),
            },
            ..Default::default()
        }
    }
}

/// Task as returned by the Tasks API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RawTask {
    #[serde(default)]
    pub id: String,
    pub title: Option<String>,
    pub due: Option<String>,
}

#[cfg(test)]
impl RawTask {
    pub fn new(title: &str, due: Option<&str>) -> Self {
        Self {
            title: Some(title.to_string()),
            due: due.map(str::to_string),
            ..Default::default()
        }
    }
}

/// Identifier of a Google Tasks list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskListId(pub String);

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TaskList {
    pub id: String,
}

/// Paged list envelope shared by both APIs; only the first page is used
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    pub items: Option<Vec<T>>,
}
