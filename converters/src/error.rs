//! Error kinds for the converter orchestration layer.
//!
//! The HTTP status mapping itself lives in `gateway::error` so that this
//! crate stays transport-agnostic.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported or contradictory media type: {0}")]
    UnsupportedMedia(String),

    #[error("job queue is full")]
    QueueFull,

    #[error("no office worker is currently available")]
    Overload,

    #[error("{0} conversion timed out")]
    ConvertTimeout(&'static str),

    #[error("backend exited with status {exit_code:?}: {stderr}")]
    ConvertError { exit_code: Option<i32>, stderr: String },

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum OfficeError {
    #[error("worker on port {0} exceeded its restart budget")]
    MaxRestartsExceeded(u16),

    #[error("worker on port {0} failed to become ready within the launch timeout")]
    LaunchTimeout(u16),

    #[error("no worker on port {0} is registered")]
    UnknownWorker(u16),

    #[error("worker on port {0} is not available")]
    NotAvailable(u16),

    #[error("conversion on worker {port} timed out")]
    ConvertTimeout { port: u16 },

    #[error("conversion on worker {port} failed: exit={exit_code:?} stderr={stderr}")]
    ConvertFailed {
        port: u16,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser exceeded its restart budget")]
    MaxRestartsExceeded,

    #[error("browser failed to launch within the launch timeout")]
    LaunchTimeout,

    #[error("browser is not currently available")]
    NotAvailable,

    #[error("conversion timed out")]
    ConvertTimeout,

    #[error("cdp error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("unrecognised source format tag: {0}")]
    UnknownTag(String),

    #[error("conversion timed out")]
    ConvertTimeout,

    #[error("markup converter exited with status {exit_code:?}: {stderr}")]
    ConvertFailed { exit_code: Option<i32>, stderr: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<OfficeError> for ConvertError {
    fn from(e: OfficeError) -> Self {
        match e {
            OfficeError::ConvertTimeout { .. } => ConvertError::ConvertTimeout("office"),
            OfficeError::ConvertFailed {
                exit_code, stderr, ..
            } => ConvertError::ConvertError { exit_code, stderr },
            OfficeError::NotAvailable(_) | OfficeError::UnknownWorker(_) => ConvertError::Overload,
            other => ConvertError::Internal(anyhow::anyhow!(other.to_string())),
        }
    }
}

impl From<BrowserError> for ConvertError {
    fn from(e: BrowserError) -> Self {
        match e {
            BrowserError::ConvertTimeout => ConvertError::ConvertTimeout("browser"),
            BrowserError::NotAvailable => ConvertError::Overload,
            other => ConvertError::Internal(anyhow::anyhow!(other.to_string())),
        }
    }
}

impl From<MarkupError> for ConvertError {
    fn from(e: MarkupError) -> Self {
        match e {
            MarkupError::ConvertTimeout => ConvertError::ConvertTimeout("markup"),
            MarkupError::ConvertFailed { exit_code, stderr } => {
                ConvertError::ConvertError { exit_code, stderr }
            }
            other => ConvertError::Internal(anyhow::anyhow!(other.to_string())),
        }
    }
}
