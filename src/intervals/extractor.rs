//! Chapter-marker extraction from free-text video descriptions
//!
//! Follows the common YouTube chapter convention: at most one `m:ss` or
//! `h:mm:ss` marker per line, each marker starting a chapter that runs until
//! the next marker (or the end of the video when its duration is known).

use super::Interval;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// First whitespace-bounded `m:ss` / `h:mm:ss` token on a line
fn timestamp_regex() -> &'static Regex {
    static TIMESTAMP: OnceLock<Regex> = OnceLock::new();
    TIMESTAMP.get_or_init(|| {
        Regex::new(r"(?:^|\s)((?:[0-9]{1,2}:)?[0-9]{1,2}:[0-9]{2})(?:\s|$)")
            .expect("timestamp pattern is valid")
    })
}

/// Find the first timestamp token on a single line
pub fn find_timestamp(line: &str) -> Option<&str> {
    timestamp_regex()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Convert a `m:ss` or `h:mm:ss` token to seconds
///
/// Components are not range-checked, so `12:99` is 819 seconds. Tokens with a
/// non-numeric component or a component count other than 2 or 3 yield `None`.
pub fn parse_timestamp(token: &str) -> Option<u32> {
    let parts = token
        .split(':')
        .map(|part| part.parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()?;

    match parts.as_slice() {
        [minutes, seconds] => Some(minutes * 60 + seconds),
        [hours, minutes, seconds] => Some(hours * 3600 + minutes * 60 + seconds),
        _ => None,
    }
}

/// Turn a description into ordered, non-overlapping intervals
///
/// Markers at or past a known `duration_seconds` are dropped. Duplicate start
/// times keep the first occurrence. The final marker only becomes an interval
/// when the duration is known, since nothing else bounds it.
pub fn extract_intervals(description: &str, duration_seconds: Option<f64>) -> Vec<Interval> {
    let mut starts: Vec<f64> = Vec::new();

    for line in description.lines() {
        let Some(token) = find_timestamp(line) else {
            continue;
        };
        let Some(seconds) = parse_timestamp(token) else {
            debug!("Skipping unparseable timestamp '{}'", token);
            continue;
        };

        let start = f64::from(seconds);
        if let Some(duration) = duration_seconds {
            if start >= duration {
                debug!("Skipping timestamp {} at or past duration {}s", token, duration);
                continue;
            }
        }

        starts.push(start);
    }

    // Stable sort keeps the first occurrence ahead of later equal starts
    starts.sort_by(|a, b| a.total_cmp(b));
    starts.dedup();

    let mut intervals = Vec::with_capacity(starts.len());
    for (i, &start_time) in starts.iter().enumerate() {
        let end_time = match starts.get(i + 1).copied().or(duration_seconds) {
            Some(end) => end,
            None => continue,
        };

        if end_time <= start_time {
            continue;
        }

        intervals.push(Interval::new(start_time, end_time));
    }

    intervals
}
