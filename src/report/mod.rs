//! Session report and export functionality
//!
//! JSON schema: `metadata` (session id, phrase, rounds requested and
//! completed, whether key labels are anonymized), `aggregate` (interval and
//! hold-time summaries plus per-key hold summaries) and, unless disabled,
//! `rounds` with each round's raw metrics. `rounds_requested` always keeps
//! the requested count; `rounds_completed` says how many actually finished.

mod html;

pub use html::render_html;

use crate::error::{ReportError, SetupError, WebhookError};
use crate::metrics::{RoundMetrics, SessionAggregate};
use crate::session::Session;
use crate::webhook::{WebhookNotifier, WebhookSummary};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Complete session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Report metadata
    pub metadata: ReportMetadata,
    /// Session-wide statistics
    pub aggregate: SessionAggregate,
    /// Per-round detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounds: Option<Vec<RoundMetrics>>,
}

/// Report metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub session_id: String,
    pub phrase: String,
    pub rounds_requested: u32,
    pub rounds_completed: u32,
    /// Whether key labels are salted hashes rather than key names
    pub anonymized_keys: bool,
    /// Session start, RFC 3339
    pub created_at: String,
    pub capture_backend: String,
    /// Application version
    pub version: String,
}

impl SessionReport {
    /// Create a new session report
    pub fn new(
        session: &Session,
        aggregate: &SessionAggregate,
        capture_backend: &str,
        include_rounds: bool,
    ) -> Self {
        Self {
            metadata: ReportMetadata {
                session_id: session.id().to_string(),
                phrase: session.phrase().to_string(),
                rounds_requested: session.rounds_requested(),
                rounds_completed: session.rounds_completed(),
                anonymized_keys: session.is_anonymized(),
                created_at: session.created_at().to_rfc3339(),
                capture_backend: capture_backend.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            aggregate: aggregate.clone(),
            rounds: include_rounds.then(|| session.rounds().to_vec()),
        }
    }

    /// Export report to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export report to JSON file
    pub fn export_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = self.to_json()?;
        write_file(path, &json)
    }

    /// Export report to HTML file
    pub fn export_html(&self, path: &Path, key_prefix: usize) -> Result<(), ReportError> {
        write_file(path, &render_html(self, key_prefix))
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ReportError> {
    fs::write(path, contents).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// What happened to each output of a finished session
#[derive(Debug)]
pub struct Delivery {
    pub json: Result<(), ReportError>,
    pub html: Result<(), ReportError>,
    /// `None` when no webhook was configured
    pub webhook: Option<Result<(), WebhookError>>,
}

impl Delivery {
    /// One message per output that failed
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Err(e) = &self.json {
            warnings.push(e.to_string());
        }
        if let Err(e) = &self.html {
            warnings.push(e.to_string());
        }
        if let Some(Err(e)) = &self.webhook {
            warnings.push(format!("webhook delivery failed: {}", e));
        }
        warnings
    }
}

/// Write the JSON and HTML reports, then post the webhook summary.
///
/// Both report files are attempted before any network traffic. No failure
/// is fatal: each one is logged as a warning and returned in the
/// [`Delivery`].
pub fn deliver(
    report: &SessionReport,
    json_path: &Path,
    html_path: &Path,
    key_prefix: usize,
    webhook: Option<(&WebhookNotifier, &WebhookSummary)>,
) -> Delivery {
    let json = report.export_json(json_path);
    let html = report.export_html(html_path, key_prefix);
    let webhook = webhook.map(|(notifier, summary)| notifier.send(summary));

    let delivery = Delivery { json, html, webhook };
    for warning in delivery.warnings() {
        log::warn!("{}", warning);
    }
    delivery
}

/// Check before capture starts that `path` can be created or overwritten.
///
/// A file created by the check is removed again so an aborted run leaves
/// nothing behind.
pub fn ensure_writable(path: &Path) -> Result<(), SetupError> {
    let existed = path.exists();
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|source| SetupError::OutputNotWritable {
            path: path.to_path_buf(),
            source,
        })?;
    if !existed {
        let _ = fs::remove_file(path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymize::{Anonymizer, KeyLabeler, Salt};
    use crate::keyboard::{KeyStroke, RecordedRound};

    fn session_with_round(labeler: KeyLabeler) -> Session {
        let mut session = Session::new("the", 3, labeler).unwrap();
        session.complete_round(RecordedRound::from_strokes(vec![
            KeyStroke::new("T", 0.0, 0.05),
            KeyStroke::new("H", 0.5, 0.58),
            KeyStroke::new("E", 1.1, 1.2),
        ]));
        session
    }

    fn anonymized() -> KeyLabeler {
        KeyLabeler::Anonymized(Anonymizer::new(Salt::from_bytes([1; 32])))
    }

    #[test]
    fn metadata_reports_requested_and_completed_rounds() {
        let session = session_with_round(anonymized());
        let report = SessionReport::new(&session, &session.aggregate(), "scripted", true);

        assert_eq!(report.metadata.rounds_requested, 3);
        assert_eq!(report.metadata.rounds_completed, 1);
        assert!(report.metadata.anonymized_keys);
        assert_eq!(report.metadata.capture_backend, "scripted");
        assert_eq!(report.rounds.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn json_has_required_fields() {
        let session = session_with_round(anonymized());
        let report = SessionReport::new(&session, &session.aggregate(), "scripted", true);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        for field in ["session_id", "phrase", "rounds_requested", "anonymized_keys"] {
            assert!(value["metadata"].get(field).is_some(), "missing metadata.{field}");
        }
        for section in ["inter_key_intervals", "key_hold_times"] {
            assert!(value["aggregate"][section]["mean"].is_f64());
            assert!(value["aggregate"][section]["stdev"].is_f64());
        }
        assert_eq!(value["aggregate"]["inter_key_intervals"]["count"], 2);
    }

    #[test]
    fn rounds_can_be_omitted() {
        let session = session_with_round(anonymized());
        let report = SessionReport::new(&session, &session.aggregate(), "scripted", false);
        let json = report.to_json().unwrap();
        assert!(!json.contains("\"rounds\""));
        let parsed: SessionReport = serde_json::from_str(&json).unwrap();
        assert!(parsed.rounds.is_none());
    }

    #[test]
    fn anonymized_json_has_no_raw_key_labels() {
        let session = session_with_round(anonymized());
        let report = SessionReport::new(&session, &session.aggregate(), "scripted", true);
        let json = report.to_json().unwrap();
        for raw in ["\"T\"", "\"H\"", "\"E\""] {
            assert!(!json.contains(raw));
        }
    }

    #[test]
    fn export_and_writable_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        ensure_writable(&path).unwrap();
        assert!(!path.exists(), "scratch file should be cleaned up");

        let session = session_with_round(anonymized());
        let report = SessionReport::new(&session, &session.aggregate(), "scripted", true);
        report.export_json(&path).unwrap();
        let loaded: SessionReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.metadata, report.metadata);
    }

    #[test]
    fn unwritable_path_is_a_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");
        assert!(matches!(
            ensure_writable(&path),
            Err(SetupError::OutputNotWritable { .. })
        ));
    }
}
