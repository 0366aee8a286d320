use super::classify::Buckets;
use super::page::{
    compose_agenda_page, compose_system_page, AgendaItem, CapacityPolicy, Page, PageContext,
};
use crate::components::{DataSource, MetricsProvider, Renderer};
use crate::config::Config;
use crate::error::{config_error, DashResult, Error};
use chrono::{DateTime, Duration, Local, Utc};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// The pages in rotation, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Today,
    Upcoming,
    SystemInfo,
}

impl PageKind {
    pub const ROTATION: [PageKind; 3] = [PageKind::Today, PageKind::Upcoming, PageKind::SystemInfo];

    pub fn title(&self) -> &'static str {
        match self {
            PageKind::Today => "Today",
            PageKind::Upcoming => "Upcoming",
            PageKind::SystemInfo => "System Info",
        }
    }
}

/// Timing and capacity values the scheduler runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub refresh_interval: Duration,
    pub display_interval: u32,
    pub max_events: u32,
    pub capacity: CapacityPolicy,
}

impl TryFrom<&Config> for SchedulerSettings {
    type Error = Error;

    fn try_from(config: &Config) -> DashResult<Self> {
        let refresh_interval = i64::try_from(config.refresh_interval_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                config_error(&format!(
                    "refresh_interval_secs {} is out of range",
                    config.refresh_interval_secs
                ))
            })?;

        Ok(Self {
            refresh_interval,
            display_interval: config.display_interval_secs.max(1),
            max_events: config.max_events,
            capacity: CapacityPolicy {
                item_cap: config.item_display_cap,
                task_overflow_threshold: config.task_overflow_threshold,
            },
        })
    }
}

/// Mutable loop state, owned by the scheduler for the process lifetime
#[derive(Debug, Clone)]
pub struct CycleState {
    pub pages: Vec<PageKind>,
    pub current_page: usize,
    /// Seconds left on the current page, always within 1..=display_interval
    pub countdown: u32,
    pub last_rendered: Option<Page>,
    /// Replaced wholesale on refresh, never mutated in place
    pub buckets: Arc<Buckets>,
    pub last_refresh: Option<DateTime<Local>>,
}

/// What happened to the data during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Skipped,
    Refreshed,
    Failed,
}

/// Summary of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub refresh: RefreshOutcome,
    pub rendered: bool,
    pub advanced: bool,
}

/// Drives data refresh, page composition and page rotation, one tick per second
pub struct PagingScheduler {
    source: Arc<dyn DataSource>,
    metrics: Arc<dyn MetricsProvider>,
    renderer: Box<dyn Renderer>,
    settings: SchedulerSettings,
    state: CycleState,
}

impl PagingScheduler {
    pub fn new(
        source: Arc<dyn DataSource>,
        metrics: Arc<dyn MetricsProvider>,
        renderer: Box<dyn Renderer>,
        settings: SchedulerSettings,
    ) -> Self {
        let state = CycleState {
            pages: PageKind::ROTATION.to_vec(),
            current_page: 0,
            countdown: settings.display_interval,
            last_rendered: None,
            buckets: Arc::new(Buckets::default()),
            last_refresh: None,
        };

        Self {
            source,
            metrics,
            renderer,
            settings,
            state,
        }
    }

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    /// Current bucket set; a snapshot that later refreshes do not touch
    pub fn buckets(&self) -> Arc<Buckets> {
        Arc::clone(&self.state.buckets)
    }

    pub fn current_page(&self) -> PageKind {
        self.state.pages[self.state.current_page]
    }

    /// Run one tick at the reference instant `now`
    pub async fn tick(&mut self, now: DateTime<Local>) -> TickReport {
        let refresh = self.refresh_if_due(now).await;
        let page = self.compose(now).await;
        let rendered = self.render_if_changed(page);
        let advanced = self.count_down();

        TickReport {
            refresh,
            rendered,
            advanced,
        }
    }

    /// Tick every second until `shutdown` fires, then restore the terminal.
    ///
    /// A tick that is already running, refresh included, completes before
    /// shutdown is observed.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> DashResult<()> {
        info!(
            "Paging scheduler started ({} pages, {}s per page)",
            self.state.pages.len(),
            self.settings.display_interval
        );

        let mut ticker = interval(std::time::Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(Local::now()).await;
                }
                _ = &mut shutdown => {
                    info!("Paging scheduler stopping");
                    break;
                }
            }
        }

        self.renderer.restore()
    }

    async fn refresh_if_due(&mut self, now: DateTime<Local>) -> RefreshOutcome {
        let due = match self.state.last_refresh {
            None => true,
            Some(last) => now - last > self.settings.refresh_interval,
        };
        if !due {
            return RefreshOutcome::Skipped;
        }

        // Failed refreshes also wait a full interval before the next attempt
        self.state.last_refresh = Some(now);

        match self.fetch_buckets(now).await {
            Ok(buckets) => {
                info!(
                    "Refreshed data: {} today, {} upcoming, {} all-day, {} tasks due",
                    buckets.today.len(),
                    buckets.upcoming.len(),
                    buckets.all_day_today.len(),
                    buckets.tasks_due_today.len()
                );
                self.state.buckets = Arc::new(buckets);
                RefreshOutcome::Refreshed
            }
            Err(e) => {
                warn!("Refresh failed, keeping previous data: {}", e);
                RefreshOutcome::Failed
            }
        }
    }

    async fn fetch_buckets(&self, now: DateTime<Local>) -> DashResult<Buckets> {
        let events = self
            .source
            .list_upcoming_events(now.with_timezone(&Utc), self.settings.max_events)
            .await?;

        let mut tasks = Vec::new();
        for list in self.source.list_task_lists().await? {
            tasks.extend(self.source.list_tasks(&list).await?);
        }

        Ok(Buckets::build(&events, &tasks, &now))
    }

    async fn compose(&self, now: DateTime<Local>) -> Page {
        let ctx = PageContext {
            index: self.state.current_page + 1,
            total: self.state.pages.len(),
            countdown: self.state.countdown,
            width: self.renderer.width(),
            now,
        };
        let buckets = &self.state.buckets;
        let policy = &self.settings.capacity;

        match self.current_page() {
            PageKind::Today => {
                let items: Vec<AgendaItem> = buckets.today.iter().map(AgendaItem::from).collect();
                let tasks: Vec<AgendaItem> = buckets
                    .tasks_due_today
                    .iter()
                    .filter_map(AgendaItem::from_task)
                    .chain(buckets.all_day_today.iter().map(AgendaItem::from))
                    .collect();
                compose_agenda_page(PageKind::Today.title(), &items, &tasks, &ctx, policy)
            }
            PageKind::Upcoming => {
                let items: Vec<AgendaItem> =
                    buckets.upcoming.iter().map(AgendaItem::from).collect();
                compose_agenda_page(PageKind::Upcoming.title(), &items, &[], &ctx, policy)
            }
            PageKind::SystemInfo => match self.metrics.sample().await {
                Ok(metrics) => compose_system_page(Some(&metrics), &ctx),
                Err(e) => {
                    warn!("Host metrics unavailable: {}", e);
                    compose_system_page(None, &ctx)
                }
            },
        }
    }

    /// Present `page` unless it equals the page on screen
    pub(crate) fn render_if_changed(&mut self, page: Page) -> bool {
        if self.state.last_rendered.as_ref() == Some(&page) {
            return false;
        }

        match self.renderer.present(&page) {
            Ok(()) => {
                self.state.last_rendered = Some(page);
                true
            }
            Err(e) => {
                warn!("Failed to render page: {}", e);
                false
            }
        }
    }

    /// Step the countdown; on expiry move to the next page
    fn count_down(&mut self) -> bool {
        self.state.countdown = self.state.countdown.saturating_sub(1);
        if self.state.countdown > 0 {
            return false;
        }

        self.state.current_page = (self.state.current_page + 1) % self.state.pages.len();
        self.state.countdown = self.settings.display_interval;
        self.state.last_rendered = None;
        debug!("Advanced to page {:?}", self.current_page());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::google::models::{RawEvent, RawTask, TaskListId};
    use crate::components::system_info::{HostMetrics, MemoryUsage};
    use crate::error::{google_calendar_error, metrics_error, render_error};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockSource {
        events: Vec<RawEvent>,
        tasks: Vec<RawTask>,
        failing: AtomicBool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DataSource for MockSource {
        async fn list_upcoming_events(
            &self,
            _time_min: DateTime<Utc>,
            _max_results: u32,
        ) -> DashResult<Vec<RawEvent>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(google_calendar_error("network unreachable"));
            }
            Ok(self.events.clone())
        }

        async fn list_task_lists(&self) -> DashResult<Vec<TaskListId>> {
            Ok(vec![TaskListId("default".to_string())])
        }

        async fn list_tasks(&self, _list: &TaskListId) -> DashResult<Vec<RawTask>> {
            Ok(self.tasks.clone())
        }
    }

    struct MockMetrics {
        available: bool,
    }

    #[async_trait]
    impl MetricsProvider for MockMetrics {
        async fn sample(&self) -> DashResult<HostMetrics> {
            if !self.available {
                return Err(metrics_error("no /proc"));
            }
            Ok(HostMetrics {
                cpu_percent: Some(10.0),
                memory: Some(MemoryUsage {
                    used_mb: 100,
                    total_mb: 400,
                    percent: 25.0,
                }),
                temperature_c: None,
            })
        }
    }

    #[derive(Clone, Default)]
    struct RecordingRenderer {
        pages: Arc<Mutex<Vec<Page>>>,
        failing: Arc<AtomicBool>,
    }

    impl Renderer for RecordingRenderer {
        fn width(&self) -> u16 {
            80
        }

        fn present(&mut self, page: &Page) -> DashResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(render_error("terminal gone"));
            }
            self.pages.lock().unwrap().push(page.clone());
            Ok(())
        }
    }

    fn settings(display_interval: u32) -> SchedulerSettings {
        SchedulerSettings {
            refresh_interval: Duration::seconds(180),
            display_interval,
            max_events: 15,
            capacity: CapacityPolicy {
                item_cap: 5,
                task_overflow_threshold: 3,
            },
        }
    }

    // Wednesday, 2024-03-13 at 08:00
    fn start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 13, 8, 0, 0).unwrap()
    }

    fn scheduler(
        source: Arc<MockSource>,
        display_interval: u32,
    ) -> (PagingScheduler, RecordingRenderer) {
        let renderer = RecordingRenderer::default();
        let scheduler = PagingScheduler::new(
            source,
            Arc::new(MockMetrics { available: true }),
            Box::new(renderer.clone()),
            settings(display_interval),
        );
        (scheduler, renderer)
    }

    fn standup_source() -> MockSource {
        MockSource {
            events: vec![RawEvent::timed(
                "Standup",
                &Local.with_ymd_and_hms(2024, 3, 13, 9, 0, 0).unwrap().to_rfc3339(),
            )],
            tasks: vec![RawTask::new("Buy milk", Some("2024-03-13T00:00:00.000Z"))],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_first_tick_refreshes_and_renders() {
        let (mut scheduler, renderer) = scheduler(Arc::new(standup_source()), 60);

        let report = scheduler.tick(start()).await;
        assert_eq!(report.refresh, RefreshOutcome::Refreshed);
        assert!(report.rendered);
        assert!(!report.advanced);

        let pages = renderer.pages.lock().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "Today");
        assert_eq!(pages[0].footer, "Page 1/3 | Next in 60s");
        assert_eq!(pages[0].lines[0].rendered(), "9:00 AM Standup");
        assert!(pages[0].lines.iter().any(|l| l.rendered() == "• Buy milk"));
        assert_eq!(scheduler.state().countdown, 59);
    }

    #[tokio::test]
    async fn test_refresh_waits_for_interval() {
        let source = Arc::new(standup_source());
        let (mut scheduler, _) = scheduler(Arc::clone(&source), 60);

        scheduler.tick(start()).await;
        let report = scheduler.tick(start() + Duration::seconds(180)).await;
        assert_eq!(report.refresh, RefreshOutcome::Skipped);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let report = scheduler.tick(start() + Duration::seconds(181)).await;
        assert_eq!(report.refresh, RefreshOutcome::Refreshed);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_buckets() {
        let source = Arc::new(standup_source());
        let (mut scheduler, renderer) = scheduler(Arc::clone(&source), 60);

        scheduler.tick(start()).await;
        let before = scheduler.buckets();
        assert_eq!(before.today.len(), 1);

        source.failing.store(true, Ordering::SeqCst);
        let report = scheduler.tick(start() + Duration::seconds(181)).await;
        assert_eq!(report.refresh, RefreshOutcome::Failed);
        assert_eq!(*scheduler.buckets(), *before);

        // The stale data is still on the page
        let last = renderer.pages.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.lines[0].rendered(), "9:00 AM Standup");

        // No retry until a full interval has passed since the failure
        let report = scheduler.tick(start() + Duration::seconds(182)).await;
        assert_eq!(report.refresh, RefreshOutcome::Skipped);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_replaces_bucket_snapshot() {
        let source = Arc::new(standup_source());
        let (mut scheduler, _) = scheduler(Arc::clone(&source), 60);

        scheduler.tick(start()).await;
        let held = scheduler.buckets();
        scheduler.tick(start() + Duration::seconds(181)).await;

        // A reader holding the old set keeps a complete, unchanged snapshot
        assert!(!Arc::ptr_eq(&held, &scheduler.buckets()));
        assert_eq!(held.today.len(), 1);
        assert_eq!(held.tasks_due_today.len(), 1);
    }

    #[tokio::test]
    async fn test_countdown_cycle_advances_once() {
        let (mut scheduler, _) = scheduler(Arc::new(MockSource::default()), 3);
        let mut advances = 0;

        for second in 0..3 {
            let report = scheduler.tick(start() + Duration::seconds(second)).await;
            if report.advanced {
                advances += 1;
            }
        }

        assert_eq!(advances, 1);
        assert_eq!(scheduler.current_page(), PageKind::Upcoming);
        assert_eq!(scheduler.state().countdown, 3);
        assert!(scheduler.state().last_rendered.is_none());
    }

    #[tokio::test]
    async fn test_rotation_wraps_around() {
        let (mut scheduler, renderer) = scheduler(Arc::new(MockSource::default()), 1);

        for second in 0..4 {
            scheduler.tick(start() + Duration::seconds(second)).await;
        }

        let titles: Vec<String> = renderer
            .pages
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.title.clone())
            .collect();
        assert_eq!(titles, vec!["Today", "Upcoming", "System Info", "Today"]);
        assert_eq!(scheduler.state().current_page, 1);
    }

    #[tokio::test]
    async fn test_countdown_stays_in_range() {
        let (mut scheduler, _) = scheduler(Arc::new(MockSource::default()), 4);

        for second in 0..20 {
            scheduler.tick(start() + Duration::seconds(second)).await;
            let countdown = scheduler.state().countdown;
            assert!((1..=4).contains(&countdown), "countdown {} out of range", countdown);
        }
    }

    #[tokio::test]
    async fn test_identical_page_not_rendered_twice() {
        let (mut scheduler, renderer) = scheduler(Arc::new(MockSource::default()), 60);

        let page = scheduler.compose(start()).await;
        assert!(scheduler.render_if_changed(page.clone()));
        assert!(!scheduler.render_if_changed(page.clone()));
        assert_eq!(renderer.pages.lock().unwrap().len(), 1);

        // Recomposing from identical inputs yields the same page
        assert_eq!(scheduler.compose(start()).await, page);
    }

    #[tokio::test]
    async fn test_new_page_always_rendered_after_advance() {
        let (mut scheduler, renderer) = scheduler(Arc::new(MockSource::default()), 1);

        // Pages 1..3 then back to page 1 with an equal composition
        for _ in 0..4 {
            let report = scheduler.tick(start()).await;
            assert!(report.rendered);
        }
        let pages = renderer.pages.lock().unwrap();
        assert_eq!(pages[0], pages[3]);
    }

    #[tokio::test]
    async fn test_render_failure_is_retried() {
        let (mut scheduler, renderer) = scheduler(Arc::new(MockSource::default()), 60);

        renderer.failing.store(true, Ordering::SeqCst);
        let page = scheduler.compose(start()).await;
        assert!(!scheduler.render_if_changed(page.clone()));
        assert!(scheduler.state().last_rendered.is_none());

        renderer.failing.store(false, Ordering::SeqCst);
        assert!(scheduler.render_if_changed(page));
    }

    #[tokio::test]
    async fn test_metrics_failure_shows_placeholder() {
        let renderer = RecordingRenderer::default();
        let mut scheduler = PagingScheduler::new(
            Arc::new(MockSource::default()),
            Arc::new(MockMetrics { available: false }),
            Box::new(renderer.clone()),
            settings(1),
        );

        for second in 0..3 {
            scheduler.tick(start() + Duration::seconds(second)).await;
        }

        let pages = renderer.pages.lock().unwrap();
        let system = pages.last().unwrap();
        assert_eq!(system.title, "System Info");
        assert_eq!(system.lines[0].rendered(), "Host metrics unavailable");
        assert_eq!(system.footer, "Page 3/3 | Next in 01s");
    }

    #[tokio::test]
    async fn test_all_day_events_listed_with_tasks() {
        let source = MockSource {
            events: vec![RawEvent::all_day("Birthday", "2024-03-13")],
            tasks: vec![RawTask::new("Buy milk", Some("2024-03-13T00:00:00.000Z"))],
            ..Default::default()
        };
        let (mut scheduler, renderer) = scheduler(Arc::new(source), 60);

        scheduler.tick(start()).await;

        let pages = renderer.pages.lock().unwrap();
        let lines: Vec<String> = pages[0].lines.iter().map(|l| l.rendered()).collect();
        assert_eq!(lines, vec!["", "Tasks:", "• Buy milk", "• Birthday"]);
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config::default();
        let settings = SchedulerSettings::try_from(&config).unwrap();
        assert_eq!(settings.refresh_interval, Duration::seconds(180));
        assert_eq!(settings.display_interval, 60);
        assert_eq!(settings.max_events, 15);
        assert_eq!(settings.capacity.item_cap, 5);
        assert_eq!(settings.capacity.task_overflow_threshold, 3);
    }

    #[test]
    fn test_settings_reject_out_of_range_refresh_interval() {
        for secs in [u64::MAX, i64::MAX as u64, 100_000_000_000_000_000] {
            let config = Config {
                refresh_interval_secs: secs,
                ..Config::default()
            };
            assert!(matches!(
                SchedulerSettings::try_from(&config),
                Err(Error::Config(_))
            ));
        }
    }
}
