//! Error taxonomy shared by the analysis pipeline and its collaborators.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightError {
    /// Wrong shape of input: missing column, empty table, bad path suffix.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Input has the right shape but does not make sense for the operation.
    #[error("invalid data: {0}")]
    InvalidDomain(String),

    /// Nothing to look up for this key; callers skip the affected row.
    #[error("lookup miss: {0}")]
    LookupMiss(String),

    /// The transit API answered, but not with usable data.
    #[error("upstream failure ({code}): {message}")]
    Upstream { code: u16, message: String },

    /// Every polling attempt broke off before the requested number of responses.
    #[error("all {attempts} download attempts failed; {partial}")]
    DownloadFailed { attempts: usize, partial: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl InsightError {
    /// Returns `true` for failures the punctuality engine skips instead of
    /// aborting the pass.
    pub fn is_soft(&self) -> bool {
        matches!(self, InsightError::LookupMiss(_) | InsightError::InvalidDomain(_))
    }

    /// Returns `true` for failures worth another polling attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, InsightError::Transport(_) | InsightError::Upstream { .. })
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;
