//! Repeated downloads that survive upstream failures.
//!
//! Live vehicle positions only exist at the moment they are served, so a
//! collection run polls the API many times. A failed request should not throw
//! away what was already collected: the partial results are persisted and the
//! next attempt continues from there.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::{InsightError, Result};
use crate::output::{load_json, save_json};

/// Responses collected so far, optionally mirrored to a JSON file.
#[derive(Debug)]
pub struct DownloadSession<T> {
    responses: Vec<T>,
    partial_path: Option<PathBuf>,
}

impl<T> Default for DownloadSession<T> {
    fn default() -> Self {
        Self {
            responses: Vec::new(),
            partial_path: None,
        }
    }
}

impl<T: Serialize + DeserializeOwned> DownloadSession<T> {
    /// A session kept in memory only.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session persisted to `path`, continuing from its content if the file
    /// exists.
    pub fn resume(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let responses = if path.exists() {
            let restored: Vec<T> = load_json(&path)?;
            info!(path = %path.display(), responses = restored.len(), "Resuming download session");
            restored
        } else {
            Vec::new()
        };

        Ok(Self {
            responses,
            partial_path: Some(path),
        })
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn responses(&self) -> &[T] {
        &self.responses
    }

    pub fn partial_path(&self) -> Option<&Path> {
        self.partial_path.as_deref()
    }

    pub fn push(&mut self, response: T) {
        self.responses.push(response);
    }

    /// Writes the collected responses to the partial file, if there is one.
    pub fn persist(&self) -> Result<()> {
        if let Some(path) = &self.partial_path {
            save_json(path, &self.responses)?;
        }
        Ok(())
    }

    /// Removes the partial file, if there is one.
    pub fn discard(&self) -> Result<()> {
        if let Some(path) = &self.partial_path {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    pub fn into_responses(self) -> Vec<T> {
        self.responses
    }
}

/// How often and how persistently to poll.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Responses to collect in total.
    pub requests: usize,
    /// Pause before every request but the first; must not be zero.
    pub interval: Duration,
    pub attempts: usize,
    /// Keep the partial file when every attempt fails.
    pub keep_partial: bool,
}

impl PollSettings {
    fn validate(&self) -> Result<()> {
        if self.requests == 0 {
            return Err(InsightError::InvalidInput("Number of requests must be positive.".to_string()));
        }
        if self.attempts == 0 {
            return Err(InsightError::InvalidInput("Number of attempts must be positive.".to_string()));
        }
        if self.interval.is_zero() {
            return Err(InsightError::InvalidInput("Interval between requests must be positive.".to_string()));
        }
        Ok(())
    }
}

/// Calls `fetch` until the session holds `settings.requests` responses.
///
/// A retryable failure ends the current attempt: the session is persisted and
/// the next attempt picks up where it stopped. Any other error is returned
/// immediately.
pub fn poll_over_time<T, F>(
    mut session: DownloadSession<T>,
    settings: &PollSettings,
    mut fetch: F,
) -> Result<Vec<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnMut() -> Result<T>,
{
    settings.validate()?;

    for attempt in 1..=settings.attempts {
        info!(attempt, attempts = settings.attempts, collected = session.len(), "Download attempt");

        while session.len() < settings.requests {
            if !session.is_empty() {
                thread::sleep(settings.interval);
            }

            match fetch() {
                Ok(response) => session.push(response),
                Err(e) if e.is_retryable() => {
                    warn!(attempt, collected = session.len(), error = %e, "Download attempt failed");
                    session.persist()?;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        if session.len() >= settings.requests {
            session.discard()?;
            info!(responses = session.len(), "Download complete");
            return Ok(session.into_responses());
        }
    }

    let partial = match session.partial_path() {
        Some(path) if settings.keep_partial => format!("partial results stored in {}", path.display()),
        _ => "partial results discarded".to_string(),
    };
    if !settings.keep_partial {
        session.discard()?;
    }

    Err(InsightError::DownloadFailed {
        attempts: settings.attempts,
        partial,
    })
}
