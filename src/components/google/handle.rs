use super::actor::{GoogleActor, GoogleActorHandle};
use super::models::{RawEvent, RawTask, TaskListId};
use crate::components::{DataSource, SessionProvider};
use crate::config::Config;
use crate::error::DashResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handle for interacting with the Google actor
#[derive(Clone)]
pub struct GoogleHandle {
    actor_handle: GoogleActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl GoogleHandle {
    /// Create a new GoogleHandle and spawn the actor
    pub fn new(config: &Config, sessions: Arc<dyn SessionProvider>) -> DashResult<Self> {
        let (mut actor, handle) = GoogleActor::new(config, sessions)?;

        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Ok(Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        })
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> DashResult<()> {
        self.actor_handle.shutdown().await
    }
}

#[async_trait]
impl DataSource for GoogleHandle {
    async fn list_upcoming_events(
        &self,
        time_min: DateTime<Utc>,
        max_results: u32,
    ) -> DashResult<Vec<RawEvent>> {
        self.actor_handle
            .list_upcoming_events(time_min, max_results)
            .await
    }

    async fn list_task_lists(&self) -> DashResult<Vec<TaskListId>> {
        self.actor_handle.list_task_lists().await
    }

    async fn list_tasks(&self, list: &TaskListId) -> DashResult<Vec<RawTask>> {
        self.actor_handle.list_tasks(list.clone()).await
    }
}
