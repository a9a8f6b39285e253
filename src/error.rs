//! Error types for capture, setup, reporting and notification

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures from a keyboard capture backend
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No keyboard devices found
    #[error("No keyboard devices found")]
    NoDevices,
    /// Permission denied accessing device
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// Backend cannot run in this environment
    #[error("Capture backend unavailable: {0}")]
    Unavailable(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Problems detected before any capture starts; the process exits non-zero
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("phrase must not be empty")]
    EmptyPhrase,
    #[error("rounds must be at least 1 (got {0})")]
    InvalidRounds(u32),
    #[error("output path {} is not writable: {source}", path.display())]
    OutputNotWritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid webhook URL: {0}")]
    InvalidWebhookUrl(String),
    #[error("consent to store raw characters was not given")]
    ConsentRefused,
    #[error("no capture backend is available: {0}")]
    NoBackend(String),
}

/// Failure writing a report file
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure delivering the webhook summary
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webhook returned {status}: {body}")]
    Rejected { status: u16, body: String },
}
