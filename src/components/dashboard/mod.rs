//! The dashboard proper: bucket classification, page composition and the
//! paging loop that ties them to the collaborators.

pub mod classify;
pub mod page;
mod renderer;
pub mod scheduler;

pub use classify::{Buckets, Event, EventBucket, EventBuckets, Task};
pub use page::{AgendaItem, CapacityPolicy, LineKind, Page, PageContext, PageLine};
pub use renderer::TerminalRenderer;
pub use scheduler::{
    CycleState, PageKind, PagingScheduler, RefreshOutcome, SchedulerSettings, TickReport,
};
