use calendash::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting calendash");

    // Load configuration
    let config = startup::load_config()?;

    // Run the dashboard
    startup::start_dashboard(config).await
}
