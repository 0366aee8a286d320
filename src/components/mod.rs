use crate::error::DashResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

// Export components
pub mod dashboard;
pub mod google;
pub mod system_info;

pub use dashboard::{Page, PagingScheduler, SchedulerSettings, TerminalRenderer};
pub use google::{GoogleHandle, RawEvent, RawTask, TaskListId, TokenFile};
pub use system_info::{HostMetrics, MemoryUsage, ProcMetrics};

/// Authenticated access to the Google APIs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Supplies a valid session or fails
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn get_session(&self) -> DashResult<Session>;
}

/// Source of calendar events and tasks
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Events starting at or after `time_min`, ordered by start time
    async fn list_upcoming_events(
        &self,
        time_min: DateTime<Utc>,
        max_results: u32,
    ) -> DashResult<Vec<RawEvent>>;

    async fn list_task_lists(&self) -> DashResult<Vec<TaskListId>>;

    async fn list_tasks(&self, list: &TaskListId) -> DashResult<Vec<RawTask>>;
}

/// Host metrics sampler; sampling may block briefly
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn sample(&self) -> DashResult<HostMetrics>;
}

/// Puts pages on screen
pub trait Renderer: Send + Sync {
    /// Columns available for a line
    fn width(&self) -> u16;

    fn present(&mut self, page: &Page) -> DashResult<()>;

    /// Give the screen back to the shell
    fn restore(&mut self) -> DashResult<()> {
        Ok(())
    }
}
