// Failure-log grammar and the pure selection step of failure tracking.
//
// Grammar (one entry per line, anything else is ignored):
//
//   <YYYY-MM-DD HH:MM:SS.ffffffffff> ./.status/logs/<pkgbase>/<logfile>
//
// Timestamps sort as text, so the watermark is compared lexicographically.
// Parsed times carry no zone and are read as UTC.

use crate::modules::package_updates::core::events::{DedupSet, UpdateEvent, UpdateKind};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

static FAILURE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<log_time>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{10}) \./\.status/logs/(?P<pkgbase>.+)/(?P<log_file>[^/]+)$",
    )
    .expect("failure line pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureLine<'a> {
    pub log_time: &'a str,
    pub failed_at: DateTime<Utc>,
    pub pkgbase: &'a str,
    pub log_file: &'a str,
}

pub fn parse_failure_line(line: &str) -> Option<FailureLine<'_>> {
    let captures = FAILURE_LINE.captures(line.trim_end_matches('\r'))?;
    let log_time = captures.name("log_time")?.as_str();
    // Microsecond precision is plenty for comparing against build dates.
    let failed_at = NaiveDateTime::parse_from_str(&log_time[..26], "%Y-%m-%d %H:%M:%S%.f")
        .ok()?
        .and_utc();
    Some(FailureLine {
        log_time,
        failed_at,
        pkgbase: captures.name("pkgbase")?.as_str(),
        log_file: captures.name("log_file")?.as_str(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureSelection {
    pub events: Vec<UpdateEvent>,
    /// Greatest log time seen, never lower than the watermark passed in.
    pub watermark: String,
    pub stale: usize,
}

impl FailureSelection {
    pub fn advanced_from(&self, previous: &str) -> bool {
        self.watermark.as_str() > previous
    }
}

/// Select the failures newer than `watermark` that were not superseded by a rebuild.
pub fn select_failures<F>(log: &str, watermark: &str, build_date: F) -> FailureSelection
where
    F: Fn(&str) -> Option<DateTime<Utc>>,
{
    let mut seen = DedupSet::new();
    let mut selection = FailureSelection {
        watermark: watermark.to_string(),
        ..FailureSelection::default()
    };

    for line in log.lines().filter_map(parse_failure_line) {
        if line.log_time <= watermark {
            continue;
        }
        if line.log_time > selection.watermark.as_str() {
            selection.watermark = line.log_time.to_string();
        }

        if let Some(built_at) = build_date(line.pkgbase) {
            tracing::debug!(pkgbase = line.pkgbase, failed_at = %line.failed_at, built_at = %built_at);
            if line.failed_at.timestamp() < built_at.timestamp() {
                tracing::warn!("Ignore {} fail at {}", line.pkgbase, line.log_time);
                selection.stale += 1;
                continue;
            }
        }

        if !seen.first_sighting(line.pkgbase, UpdateKind::Failed) {
            continue;
        }
        let human_message = format!("FTBFS: {} {}", line.pkgbase, line.log_file);
        tracing::info!("{human_message}");
        selection.events.push(UpdateEvent {
            subject_name: line.pkgbase.to_string(),
            pkgbase: line.pkgbase.to_string(),
            alias_names: Vec::new(),
            kind: UpdateKind::Failed,
            old_version: None,
            new_version: None,
            architecture: None,
            repository: None,
            log_file: Some(line.log_file.to_string()),
            human_message,
        });
    }
    selection
}
