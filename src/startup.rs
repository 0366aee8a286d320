use crate::components::{
    GoogleHandle, PagingScheduler, ProcMetrics, SchedulerSettings, SessionProvider,
    TerminalRenderer, TokenFile,
};
use crate::config::Config;
use crate::error::Error;
use crate::shutdown;
use std::env;
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Log file used when CALENDASH_LOG_FILE is not set
pub const DEFAULT_LOG_FILE: &str = "calendash.log";

/// Initialize logging with environment-based configuration.
///
/// The terminal belongs to the dashboard, so log lines go to a file.
pub fn init_logging() -> miette::Result<()> {
    let path = env::var("CALENDASH_LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| Error::Other(format!("Failed to open log file {}: {}", path, e)))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Acquire a session, spawn the collaborators and run the dashboard until a
/// termination signal arrives
pub async fn start_dashboard(config: Config) -> miette::Result<()> {
    let sessions = Arc::new(TokenFile::new(&config.token_file));

    // Never start paging without credentials
    if let Err(e) = sessions.get_session().await {
        error!("Failed to acquire session: {:?}", e);
        return Err(e.into());
    }
    info!("Session acquired from {}", sessions.path().display());

    let google = GoogleHandle::new(&config, sessions)?;
    let metrics = Arc::new(ProcMetrics::new(&config));
    let renderer = TerminalRenderer::new()?;

    let scheduler = PagingScheduler::new(
        Arc::new(google.clone()),
        metrics,
        Box::new(renderer),
        SchedulerSettings::try_from(&config)?,
    );

    // Create shutdown channel
    let (shutdown_send, shutdown_recv) = oneshot::channel();

    // Spawn signal handler task
    tokio::spawn(async move {
        shutdown::handle_signals(shutdown_send, google).await;
    });

    scheduler.run(shutdown_recv).await?;
    info!("Dashboard stopped");

    Ok(())
}
