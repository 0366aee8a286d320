use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(calendash::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(calendash::config))]
    Config(String),

    #[error("Authentication error: {0}")]
    #[diagnostic(
        code(calendash::auth),
        help("Place a valid OAuth token in the file named by GOOGLE_TOKEN_FILE")
    )]
    Auth(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(calendash::google_calendar))]
    GoogleCalendar(String),

    #[error("Google Tasks API error: {0}")]
    #[diagnostic(code(calendash::google_tasks))]
    GoogleTasks(String),

    #[error("Host metrics error: {0}")]
    #[diagnostic(code(calendash::metrics))]
    Metrics(String),

    #[error("Render error: {0}")]
    #[diagnostic(code(calendash::render))]
    Render(String),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(calendash::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(calendash::other))]
    Other(String),
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type DashResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(message: &str) -> Error {
    Error::Environment(message.to_string())
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create authentication errors
pub fn auth_error(message: &str) -> Error {
    Error::Auth(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create Google Tasks errors
pub fn google_tasks_error(message: &str) -> Error {
    Error::GoogleTasks(message.to_string())
}

/// Helper to create host metrics errors
pub fn metrics_error(message: &str) -> Error {
    Error::Metrics(message.to_string())
}

/// Helper to create render errors
pub fn render_error(message: &str) -> Error {
    Error::Render(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
