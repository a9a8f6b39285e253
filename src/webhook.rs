//! Summary-only webhook notification
//!
//! The payload is built from [`WebhookSummary`], which carries nothing but
//! round counts and the two top-level duration summaries. Per-key data and
//! the session id never leave the machine.

use crate::config::WebhookFormat;
use crate::error::{SetupError, WebhookError};
use crate::metrics::{SessionAggregate, Summary};
use crate::session::Session;
use chrono::Utc;
use rand::seq::SliceRandom;
use reqwest::Url;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

const EMBED_COLORS: [u32; 5] = [0x00BFFF, 0x7289DA, 0x2ECC71, 0xF1C40F, 0xE67E22];

/// Non-identifying session metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetadata {
    pub rounds_requested: u32,
    pub rounds_completed: u32,
    pub anonymized_keys: bool,
    pub total_keystrokes: usize,
    pub total_duration: f64,
}

/// Top-level statistics only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryAggregate {
    pub inter_key_intervals: Summary,
    pub key_hold_times: Summary,
}

/// Everything a webhook is allowed to see
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookSummary {
    pub metadata: SummaryMetadata,
    pub aggregate: SummaryAggregate,
}

impl WebhookSummary {
    pub fn new(session: &Session, aggregate: &SessionAggregate) -> Self {
        Self {
            metadata: SummaryMetadata {
                rounds_requested: session.rounds_requested(),
                rounds_completed: session.rounds_completed(),
                anonymized_keys: session.is_anonymized(),
                total_keystrokes: session.rounds().iter().map(|r| r.keystrokes).sum(),
                total_duration: session.rounds().iter().map(|r| r.duration).sum(),
            },
            aggregate: SummaryAggregate {
                inter_key_intervals: aggregate.inter_key_intervals,
                key_hold_times: aggregate.key_hold_times,
            },
        }
    }
}

/// Build the request body for the configured format
pub fn payload(summary: &WebhookSummary, format: WebhookFormat) -> Value {
    match format {
        WebhookFormat::Json => json!(summary),
        WebhookFormat::Discord => discord_embed(summary),
    }
}

fn discord_embed(summary: &WebhookSummary) -> Value {
    let meta = &summary.metadata;
    let intervals = &summary.aggregate.inter_key_intervals;
    let holds = &summary.aggregate.key_hold_times;
    let color = EMBED_COLORS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(EMBED_COLORS[0]);
    let field = |name: &str, value: String| json!({ "name": name, "value": value, "inline": true });

    json!({
        "embeds": [{
            "title": "Keystroke Dynamics Session Summary",
            "description": "Keystroke dynamics analysis complete.",
            "color": color,
            "fields": [
                field("Rounds", format!("{} / {}", meta.rounds_completed, meta.rounds_requested)),
                field("Keystrokes", meta.total_keystrokes.to_string()),
                field("Total Duration (s)", format!("{:.2}", meta.total_duration)),
                field("Mean Interval (s)", format!("{:.4}", intervals.mean)),
                field("Interval Stdev (s)", format!("{:.4}", intervals.stdev)),
                field("Mean Hold (s)", format!("{:.4}", holds.mean)),
                field("Hold Stdev (s)", format!("{:.4}", holds.stdev)),
            ],
            "footer": { "text": "keycadence • summary only, no key data" },
            "timestamp": Utc::now().to_rfc3339(),
        }]
    })
}

/// Posts session summaries to a webhook endpoint
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: Url,
    client: reqwest::blocking::Client,
    format: WebhookFormat,
}

impl WebhookNotifier {
    /// Validate the URL up front so a typo fails before any capture
    pub fn new(url: &str, format: WebhookFormat, timeout: Duration) -> Result<Self, SetupError> {
        let url = Url::parse(url).map_err(|e| SetupError::InvalidWebhookUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SetupError::InvalidWebhookUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SetupError::InvalidWebhookUrl(e.to_string()))?;

        Ok(Self {
            url,
            client,
            format,
        })
    }

    /// Post the summary; any non-2xx response is an error
    pub fn send(&self, summary: &WebhookSummary) -> Result<(), WebhookError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&payload(summary, self.format))
            .send()?;

        let status = response.status();
        if status.is_success() {
            log::info!("webhook accepted summary ({})", status);
            Ok(())
        } else {
            let body = response.text().unwrap_or_default();
            Err(WebhookError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
