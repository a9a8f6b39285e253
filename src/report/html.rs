//! Human-readable HTML rendering of a [`SessionReport`]

use super::SessionReport;
use crate::metrics::Summary;
use crate::utils::format_secs;
use std::fmt::Write;

const STYLE: &str = "\
body{font-family:Arial,sans-serif;padding:20px}
table{border-collapse:collapse;width:100%;margin-bottom:20px}
th,td{border:1px solid #ddd;padding:8px}
th{background:#f4f4f4}
.stat{font-family:monospace}";

/// Escape text for HTML element content and attribute values
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Shorten a hashed key label for display
fn display_key(key: &str, anonymized: bool, prefix: usize) -> String {
    if anonymized && prefix > 0 && key.chars().count() > prefix {
        let short: String = key.chars().take(prefix).collect();
        format!("{}…", escape(&short))
    } else {
        escape(key)
    }
}

fn summary_row(out: &mut String, label: &str, summary: &Summary) {
    let _ = write!(
        out,
        "<tr><td>{}</td><td>{}</td><td class='stat'>{}</td><td class='stat'>{}</td>\
         <td class='stat'>{}</td><td class='stat'>{}</td></tr>",
        label,
        summary.count,
        format_secs(summary.mean),
        format_secs(summary.stdev),
        format_secs(summary.min),
        format_secs(summary.max),
    );
}

/// Render the report as a standalone HTML page
pub fn render_html(report: &SessionReport, key_prefix: usize) -> String {
    let meta = &report.metadata;
    let mut out = String::new();

    let _ = write!(
        out,
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Keystroke Dynamics Report</title>\n<style>\n{}\n</style>\n</head>\n<body>\n\
         <h1>Keystroke Dynamics Report</h1>\n",
        STYLE
    );
    let _ = write!(
        out,
        "<p><strong>Session:</strong> {}</p>\n\
         <p><strong>Captured:</strong> {}</p>\n\
         <p><strong>Phrase:</strong> {}</p>\n\
         <p><strong>Rounds:</strong> {} of {} completed</p>\n\
         <p><strong>Key labels:</strong> {}</p>\n",
        escape(&meta.session_id),
        escape(&meta.created_at),
        escape(&meta.phrase),
        meta.rounds_completed,
        meta.rounds_requested,
        if meta.anonymized_keys {
            "salted hashes"
        } else {
            "raw key names (stored with consent)"
        },
    );

    if let Some(rounds) = &report.rounds {
        out.push_str(
            "<h2>Rounds</h2>\n<table><thead><tr><th>Round</th><th>Duration</th>\
             <th>Keystrokes</th><th>Intervals</th><th>Distinct Keys</th></tr></thead><tbody>",
        );
        for round in rounds {
            let _ = write!(
                out,
                "<tr><td>{}</td><td class='stat'>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                round.round_index,
                format_secs(round.duration),
                round.keystrokes,
                round.inter_key_intervals.len(),
                round.distinct_keys(),
            );
        }
        out.push_str("</tbody></table>\n");
    }

    out.push_str(
        "<h2>Aggregate Statistics</h2>\n<table><thead><tr><th>Metric</th><th>Count</th>\
         <th>Mean</th><th>Stdev</th><th>Min</th><th>Max</th></tr></thead><tbody>",
    );
    summary_row(&mut out, "Inter-key intervals", &report.aggregate.inter_key_intervals);
    summary_row(&mut out, "Key hold times", &report.aggregate.key_hold_times);
    out.push_str("</tbody></table>\n");

    if !report.aggregate.key_hold_times_by_key.is_empty() {
        out.push_str("<h2>Hold Times by Key</h2>\n<ul>");
        for (key, summary) in &report.aggregate.key_hold_times_by_key {
            let _ = write!(
                out,
                "<li><span class='stat'>{}</span> mean={} (n={})</li>",
                display_key(key, meta.anonymized_keys, key_prefix),
                format_secs(summary.mean),
                summary.count,
            );
        }
        out.push_str("</ul>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SessionAggregate;
    use crate::report::ReportMetadata;
    use std::collections::BTreeMap;

    fn report(phrase: &str, anonymized: bool, key: &str) -> SessionReport {
        let mut by_key = BTreeMap::new();
        by_key.insert(key.to_string(), Summary::from_values([0.1, 0.12]));
        SessionReport {
            metadata: ReportMetadata {
                session_id: "abc123".to_string(),
                phrase: phrase.to_string(),
                rounds_requested: 3,
                rounds_completed: 2,
                anonymized_keys: anonymized,
                created_at: "2026-01-01T00:00:00+00:00".to_string(),
                capture_backend: "scripted".to_string(),
                version: "0.0.0".to_string(),
            },
            aggregate: SessionAggregate {
                inter_key_intervals: Summary::from_values([0.5, 0.6]),
                key_hold_times: Summary::from_values([0.1, 0.12]),
                key_hold_times_by_key: by_key,
            },
            rounds: None,
        }
    }

    #[test]
    fn escapes_user_text() {
        let html = render_html(&report("<script>alert(1)</script>", false, "T"), 8);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn truncates_hashed_labels() {
        let hash = "0123456789abcdef0123456789abcdef";
        let html = render_html(&report("the", true, hash), 8);
        assert!(html.contains("01234567…"));
        assert!(!html.contains(hash));
    }

    #[test]
    fn shows_shortfall_and_statistics() {
        let html = render_html(&report("the", true, "ff"), 8);
        assert!(html.contains("2 of 3 completed"));
        assert!(html.contains("0.5500s"));
        assert!(!html.contains("<h2>Rounds</h2>"));
    }
}
