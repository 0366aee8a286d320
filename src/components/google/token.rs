use crate::components::{Session, SessionProvider};
use crate::error::{auth_error, DashResult};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Session provider backed by an OAuth token JSON file.
///
/// The file is read on every call, so a token renewed by another tool is
/// used from the next refresh on.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionProvider for TokenFile {
    async fn get_session(&self) -> DashResult<Session> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            auth_error(&format!(
                "Failed to read token file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        parse_token(&contents, Utc::now())
    }
}

/// Extract a usable session from token JSON.
///
/// Accepts `access_token` or `token` for the bearer value and `expires_at`
/// (unix seconds) or `expiry` (RFC 3339) for the expiry time.
pub fn parse_token(contents: &str, now: DateTime<Utc>) -> DashResult<Session> {
    let token: Value = serde_json::from_str(contents)
        .map_err(|e| auth_error(&format!("Failed to parse token JSON: {}", e)))?;

    let access_token = token
        .get("access_token")
        .or_else(|| token.get("token"))
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| auth_error("No access token in token file"))?
        .to_string();

    let expires_at = match token.get("expires_at").and_then(|v| v.as_i64()) {
        Some(secs) => Utc.timestamp_opt(secs, 0).single(),
        None => token
            .get("expiry")
            .and_then(|v| v.as_str())
            .and_then(|s| match DateTime::parse_from_rfc3339(s) {
                Ok(dt) => Some(dt.with_timezone(&Utc)),
                Err(e) => {
                    debug!("Ignoring unparseable token expiry {:?}: {}", s, e);
                    None
                }
            }),
    };

    if let Some(expiry) = expires_at {
        if expiry <= now {
            return Err(auth_error(&format!("Access token expired at {}", expiry)));
        }
    }

    Ok(Session {
        access_token,
        expires_at,
    })
}
