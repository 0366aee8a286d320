use async_trait::async_trait;
use calendash::components::dashboard::{PageKind, RefreshOutcome};
use calendash::components::google::EventStart;
use calendash::components::{
    DataSource, HostMetrics, MemoryUsage, MetricsProvider, Page, PagingScheduler, RawEvent, RawTask,
    Renderer, SchedulerSettings, TaskListId,
};
use calendash::config::Config;
use calendash::error::{google_calendar_error, google_tasks_error, DashResult};
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

fn timed_event(summary: &str, date_time: &str) -> RawEvent {
    RawEvent {
        summary: Some(summary.to_string()),
        start: EventStart {
            date_time: Some(date_time.to_string()),
            date: None,
        },
        ..Default::default()
    }
}

fn all_day_event(summary: &str, date: &str) -> RawEvent {
    RawEvent {
        summary: Some(summary.to_string()),
        start: EventStart {
            date_time: None,
            date: Some(date.to_string()),
        },
        ..Default::default()
    }
}

fn task(title: &str, due: Option<&str>) -> RawTask {
    RawTask {
        title: Some(title.to_string()),
        due: due.map(str::to_string),
        ..Default::default()
    }
}

/// Mock Google data source whose contents and failures can be changed between ticks
#[derive(Default)]
pub struct MockGoogleHandle {
    events: Mutex<Vec<RawEvent>>,
    tasks: Mutex<HashMap<String, Vec<RawTask>>>,
    fail_events: Mutex<bool>,
    fail_tasks: Mutex<bool>,
    requested_max: Mutex<Vec<u32>>,
}

impl MockGoogleHandle {
    pub fn new(events: Vec<RawEvent>, tasks: Vec<(&str, Vec<RawTask>)>) -> Self {
        let mock = Self::default();
        *mock.events.lock().unwrap() = events;
        *mock.tasks.lock().unwrap() = tasks
            .into_iter()
            .map(|(list, tasks)| (list.to_string(), tasks))
            .collect();
        mock
    }

    pub fn set_events(&self, events: Vec<RawEvent>) {
        *self.events.lock().unwrap() = events;
    }

    pub fn fail_events(&self, fail: bool) {
        *self.fail_events.lock().unwrap() = fail;
    }

    pub fn fail_tasks(&self, fail: bool) {
        *self.fail_tasks.lock().unwrap() = fail;
    }
}

#[async_trait]
impl DataSource for MockGoogleHandle {
    async fn list_upcoming_events(
        &self,
        _time_min: DateTime<Utc>,
        max_results: u32,
    ) -> DashResult<Vec<RawEvent>> {
        self.requested_max.lock().unwrap().push(max_results);
        if *self.fail_events.lock().unwrap() {
            return Err(google_calendar_error("HTTP 401 - token expired"));
        }
        Ok(self.events.lock().unwrap().clone())
    }

    async fn list_task_lists(&self) -> DashResult<Vec<TaskListId>> {
        let mut lists: Vec<String> = self.tasks.lock().unwrap().keys().cloned().collect();
        lists.sort();
        Ok(lists.into_iter().map(TaskListId).collect())
    }

    async fn list_tasks(&self, list: &TaskListId) -> DashResult<Vec<RawTask>> {
        if *self.fail_tasks.lock().unwrap() {
            return Err(google_tasks_error("HTTP 503 - backend error"));
        }
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .get(&list.0)
            .cloned()
            .unwrap_or_default())
    }
}

struct FixedMetrics;

#[async_trait]
impl MetricsProvider for FixedMetrics {
    async fn sample(&self) -> DashResult<HostMetrics> {
        Ok(HostMetrics {
            cpu_percent: Some(5.5),
            memory: Some(MemoryUsage {
                used_mb: 1024,
                total_mb: 4096,
                percent: 25.0,
            }),
            temperature_c: Some(41.7),
        })
    }
}

#[derive(Clone, Default)]
struct ScreenLog {
    pages: Arc<Mutex<Vec<Page>>>,
}

impl ScreenLog {
    fn last(&self) -> Page {
        self.pages.lock().unwrap().last().cloned().unwrap()
    }

    fn last_lines(&self) -> Vec<String> {
        self.last().lines.iter().map(|l| l.rendered()).collect()
    }
}

impl Renderer for ScreenLog {
    fn width(&self) -> u16 {
        100
    }

    fn present(&mut self, page: &Page) -> DashResult<()> {
        self.pages.lock().unwrap().push(page.clone());
        Ok(())
    }
}

// Wednesday, 2024-03-13 at 08:00
fn start() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 13, 8, 0, 0).unwrap()
}

fn at(day: u32, hour: u32) -> String {
    Local
        .with_ymd_and_hms(2024, 3, day, hour, 0, 0)
        .unwrap()
        .to_rfc3339()
}

fn dashboard(source: Arc<MockGoogleHandle>, display_interval: u32) -> (PagingScheduler, ScreenLog) {
    let config = Config {
        display_interval_secs: display_interval,
        ..Config::default()
    };
    let screen = ScreenLog::default();
    let scheduler = PagingScheduler::new(
        source,
        Arc::new(FixedMetrics),
        Box::new(screen.clone()),
        SchedulerSettings::try_from(&config).unwrap(),
    );
    (scheduler, screen)
}

/// Test the documented scenario end to end through the scheduler
#[tokio::test]
async fn test_scenario_today_upcoming_tasks() {
    let source = Arc::new(MockGoogleHandle::new(
        vec![
            timed_event("Standup", &at(13, 9)),
            timed_event("Review", &at(16, 9)),
            all_day_event("Birthday", "2024-03-13"),
        ],
        vec![("inbox", vec![task("Buy milk", Some("2024-03-13T00:00:00.000Z"))])],
    ));
    let (mut scheduler, screen) = dashboard(Arc::clone(&source), 1);

    scheduler.tick(start()).await;
    let buckets = scheduler.buckets();
    assert_eq!(buckets.today[0].summary, "Standup");
    assert_eq!(buckets.upcoming[0].summary, "Review");
    assert_eq!(buckets.all_day_today[0].summary, "Birthday");
    assert_eq!(buckets.tasks_due_today[0].title, "Buy milk");

    assert_eq!(
        screen.last_lines(),
        vec!["9:00 AM Standup", "", "Tasks:", "• Buy milk", "• Birthday"]
    );

    scheduler.tick(start() + Duration::seconds(1)).await;
    assert_eq!(screen.last().title, "Upcoming");
    assert_eq!(screen.last_lines(), vec!["Sat Review"]);

    scheduler.tick(start() + Duration::seconds(2)).await;
    assert_eq!(screen.last().title, "System Info");
    assert_eq!(
        screen.last_lines(),
        vec![
            "CPU Usage: 5.5%",
            "RAM Usage: 1024MB / 4096MB (25.0%)",
            "Temperature: 41.7°C",
        ]
    );
    assert_eq!(screen.last().footer, "Page 3/3 | Next in 01s");

    assert_eq!(*source.requested_max.lock().unwrap(), vec![15]);
}

/// Test that data from the last good refresh stays visible while refreshes fail
#[tokio::test]
async fn test_stale_data_survives_failed_refresh() {
    let source = Arc::new(MockGoogleHandle::new(
        vec![timed_event("Standup", &at(13, 9))],
        vec![],
    ));
    let (mut scheduler, screen) = dashboard(Arc::clone(&source), 60);

    assert_eq!(scheduler.tick(start()).await.refresh, RefreshOutcome::Refreshed);

    source.fail_events(true);
    source.set_events(vec![timed_event("Planning", &at(13, 10))]);
    let report = scheduler.tick(start() + Duration::seconds(181)).await;
    assert_eq!(report.refresh, RefreshOutcome::Failed);
    assert_eq!(screen.last_lines(), vec!["9:00 AM Standup"]);

    // Following ticks keep showing the old data
    let report = scheduler.tick(start() + Duration::seconds(182)).await;
    assert_eq!(report.refresh, RefreshOutcome::Skipped);
    assert_eq!(screen.last_lines(), vec!["9:00 AM Standup"]);

    // Next scheduled refresh succeeds and replaces everything
    source.fail_events(false);
    let report = scheduler.tick(start() + Duration::seconds(362)).await;
    assert_eq!(report.refresh, RefreshOutcome::Refreshed);
    assert_eq!(screen.last_lines(), vec!["10:00 AM Planning"]);
}

/// Test that a tasks failure discards the whole refresh, not just the tasks
#[tokio::test]
async fn test_partial_failure_is_all_or_nothing() {
    let source = Arc::new(MockGoogleHandle::new(
        vec![timed_event("Standup", &at(13, 9))],
        vec![("inbox", vec![task("Buy milk", Some("2024-03-13T00:00:00.000Z"))])],
    ));
    let (mut scheduler, _) = dashboard(Arc::clone(&source), 60);

    scheduler.tick(start()).await;
    let before = scheduler.buckets();

    source.set_events(vec![]);
    source.fail_tasks(true);
    let report = scheduler.tick(start() + Duration::seconds(181)).await;
    assert_eq!(report.refresh, RefreshOutcome::Failed);
    assert!(Arc::ptr_eq(&before, &scheduler.buckets()));
    assert_eq!(scheduler.buckets().today.len(), 1);
}

/// Test that tasks from every list are merged in list order
#[tokio::test]
async fn test_tasks_from_all_lists() {
    let source = Arc::new(MockGoogleHandle::new(
        vec![],
        vec![
            ("a-work", vec![task("Report", Some("2024-03-13T00:00:00.000Z"))]),
            (
                "b-home",
                vec![
                    task("Laundry", Some("2024-03-13T00:00:00.000Z")),
                    task("Someday", None),
                ],
            ),
        ],
    ));
    let (mut scheduler, screen) = dashboard(source, 60);

    scheduler.tick(start()).await;
    assert_eq!(
        screen.last_lines(),
        vec!["", "Tasks:", "• Report", "• Laundry"]
    );
}

/// Test a full countdown on the first page
#[tokio::test]
async fn test_page_held_for_display_interval() {
    let source = Arc::new(MockGoogleHandle::new(vec![], vec![]));
    let (mut scheduler, screen) = dashboard(source, 5);

    for second in 0..5 {
        assert_eq!(scheduler.current_page(), PageKind::Today);
        let report = scheduler.tick(start() + Duration::seconds(second)).await;
        assert_eq!(report.advanced, second == 4);
    }

    assert_eq!(scheduler.current_page(), PageKind::Upcoming);
    assert_eq!(scheduler.state().countdown, 5);

    let footers: Vec<String> = screen
        .pages
        .lock()
        .unwrap()
        .iter()
        .map(|p| p.footer.clone())
        .collect();
    assert_eq!(
        footers,
        vec![
            "Page 1/3 | Next in 05s",
            "Page 1/3 | Next in 04s",
            "Page 1/3 | Next in 03s",
            "Page 1/3 | Next in 02s",
            "Page 1/3 | Next in 01s",
        ]
    );
}
