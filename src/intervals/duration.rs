//! ISO-8601 style video durations as reported by the catalog (`PT1H2M3S`)

use regex::Regex;
use std::sync::OnceLock;

fn duration_regex() -> &'static Regex {
    static DURATION: OnceLock<Regex> = OnceLock::new();
    DURATION.get_or_init(|| {
        Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("duration pattern is valid")
    })
}

/// Parse a `PT#H#M#S` duration into seconds
///
/// Absent components count as zero. Strings without a `PT` marker return `None`.
pub fn parse_iso8601_duration(duration: &str) -> Option<u32> {
    let caps = duration_regex().captures(duration)?;

    let component = |index: usize| -> Option<u32> {
        match caps.get(index) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    let hours = component(1)?;
    let minutes = component(2)?;
    let seconds = component(3)?;

    hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}
