mod actor;
mod handle;
pub mod models;
pub mod token;

pub use actor::{events_url, task_lists_url, tasks_url};
pub use handle::GoogleHandle;
pub use models::{EventStart, RawEvent, RawTask, TaskListId};
pub use token::TokenFile;
