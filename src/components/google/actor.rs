use super::models::{ListResponse, RawEvent, RawTask, TaskList, TaskListId};
use crate::components::SessionProvider;
use crate::config::Config;
use crate::error::{google_calendar_error, google_tasks_error, other_error, DashResult, Error};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};
use url::Url;

const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";
const TASKS_API: &str = "https://tasks.googleapis.com/tasks/v1";
const TASKS_PAGE_SIZE: &str = "100";

/// The Google actor that serves Calendar and Tasks requests
pub struct GoogleActor {
    calendar_id: String,
    sessions: Arc<dyn SessionProvider>,
    client: Client,
    command_rx: mpsc::Receiver<GoogleCommand>,
}

/// Commands that can be sent to the Google actor
pub enum GoogleCommand {
    ListUpcomingEvents {
        time_min: DateTime<Utc>,
        max_results: u32,
        respond_to: mpsc::Sender<DashResult<Vec<RawEvent>>>,
    },
    ListTaskLists(mpsc::Sender<DashResult<Vec<TaskListId>>>),
    ListTasks(TaskListId, mpsc::Sender<DashResult<Vec<RawTask>>>),
    Shutdown,
}

/// Handle for communicating with the Google actor
#[derive(Clone)]
pub struct GoogleActorHandle {
    command_tx: mpsc::Sender<GoogleCommand>,
}

impl GoogleActorHandle {
    /// Get events starting at or after `time_min`, ordered by start time
    pub async fn list_upcoming_events(
        &self,
        time_min: DateTime<Utc>,
        max_results: u32,
    ) -> DashResult<Vec<RawEvent>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(GoogleCommand::ListUpcomingEvents {
                time_min,
                max_results,
                respond_to: response_tx,
            })
            .await
            .map_err(|e| google_calendar_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| google_calendar_error("Response channel closed"))?
    }

    /// Get the IDs of all task lists
    pub async fn list_task_lists(&self) -> DashResult<Vec<TaskListId>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(GoogleCommand::ListTaskLists(response_tx))
            .await
            .map_err(|e| google_tasks_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| google_tasks_error("Response channel closed"))?
    }

    /// Get the tasks of one task list
    pub async fn list_tasks(&self, list: TaskListId) -> DashResult<Vec<RawTask>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(GoogleCommand::ListTasks(list, response_tx))
            .await
            .map_err(|e| google_tasks_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| google_tasks_error("Response channel closed"))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> DashResult<()> {
        let _ = self.command_tx.send(GoogleCommand::Shutdown).await;
        Ok(())
    }
}

impl GoogleActor {
    /// Create a new actor and return its handle
    pub fn new(
        config: &Config,
        sessions: Arc<dyn SessionProvider>,
    ) -> DashResult<(Self, GoogleActorHandle)> {
        let (command_tx, command_rx) = mpsc::channel(32);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| other_error(&format!("Failed to build HTTP client: {}", e)))?;

        let actor = Self {
            calendar_id: config.google_calendar_id.clone(),
            sessions,
            client,
            command_rx,
        };

        Ok((actor, GoogleActorHandle { command_tx }))
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Google actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                GoogleCommand::ListUpcomingEvents {
                    time_min,
                    max_results,
                    respond_to,
                } => {
                    let result = self.list_upcoming_events(time_min, max_results).await;
                    let _ = respond_to.send(result).await;
                }
                GoogleCommand::ListTaskLists(response_tx) => {
                    let result = self.list_task_lists().await;
                    let _ = response_tx.send(result).await;
                }
                GoogleCommand::ListTasks(list, response_tx) => {
                    let result = self.list_tasks(&list).await;
                    let _ = response_tx.send(result).await;
                }
                GoogleCommand::Shutdown => {
                    info!("Google actor shutting down");
                    break;
                }
            }
        }

        info!("Google actor shut down");
    }

    async fn list_upcoming_events(
        &self,
        time_min: DateTime<Utc>,
        max_results: u32,
    ) -> DashResult<Vec<RawEvent>> {
        let url = events_url(&self.calendar_id, time_min, max_results)?;
        let events: Vec<RawEvent> = self.fetch_items(url, google_calendar_error).await?;
        debug!("Fetched {} events", events.len());
        Ok(events)
    }

    async fn list_task_lists(&self) -> DashResult<Vec<TaskListId>> {
        let url = task_lists_url()?;
        let lists: Vec<TaskList> = self.fetch_items(url, google_tasks_error).await?;
        Ok(lists.into_iter().map(|list| TaskListId(list.id)).collect())
    }

    async fn list_tasks(&self, list: &TaskListId) -> DashResult<Vec<RawTask>> {
        let url = tasks_url(list)?;
        let tasks: Vec<RawTask> = self.fetch_items(url, google_tasks_error).await?;
        debug!("Fetched {} tasks from list {}", tasks.len(), list.0);
        Ok(tasks)
    }

    /// GET a list endpoint and return its `items`
    async fn fetch_items<T: DeserializeOwned>(
        &self,
        url: Url,
        api_error: fn(&str) -> Error,
    ) -> DashResult<Vec<T>> {
        let session = self.sessions.get_session().await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| api_error(&format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(api_error(&format!("HTTP {} - {}", status, error_body)));
        }

        let body: ListResponse<T> = response
            .json()
            .await
            .map_err(|e| api_error(&format!("Failed to parse response: {}", e)))?;

        Ok(body.items.unwrap_or_default())
    }
}

fn api_url(base: &str, segments: &[&str], api_error: fn(&str) -> Error) -> DashResult<Url> {
    let mut url =
        Url::parse(base).map_err(|e| api_error(&format!("Failed to parse URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| api_error("URL cannot be a base"))?
        .extend(segments);
    Ok(url)
}

/// Events list URL; the calendar ID is percent-encoded as a path segment
pub fn events_url(calendar_id: &str, time_min: DateTime<Utc>, max_results: u32) -> DashResult<Url> {
    let mut url = api_url(
        CALENDAR_API,
        &["calendars", calendar_id, "events"],
        google_calendar_error,
    )?;
    url.query_pairs_mut()
        .append_pair("timeMin", &time_min.to_rfc3339_opts(SecondsFormat::Secs, true))
        .append_pair("maxResults", &max_results.to_string())
        .append_pair("singleEvents", "true")
        .append_pair("orderBy", "startTime");
    Ok(url)
}

pub fn task_lists_url() -> DashResult<Url> {
    api_url(TASKS_API, &["users", "@me", "lists"], google_tasks_error)
}

pub fn tasks_url(list: &TaskListId) -> DashResult<Url> {
    let mut url = api_url(TASKS_API, &["lists", &list.0, "tasks"], google_tasks_error)?;
    url.query_pairs_mut().append_pair("maxResults", TASKS_PAGE_SIZE);
    Ok(url)
}
