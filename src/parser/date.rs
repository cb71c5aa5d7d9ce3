//! Date normalization with fallback heuristics.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

/// Explicit formats tried after the standard parsers give up. The
/// day-of-week prefix is stripped beforehand: mailers routinely write a
/// weekday that contradicts the date, which strict parsing rejects.
const FALLBACK_FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse a `Date:` header value into an absolute timestamp.
///
/// Tries RFC 2822 then RFC 3339 on the full string; when both fail, strips
/// a trailing parenthesized comment (`... +0000 (UTC)`) and retries, then
/// drops any leading day-of-week and runs a short list of explicit
/// formats. `None` means unparseable; callers decide how such records
/// sort. Nothing here ever errors.
pub fn normalize_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(dt) = parse_standard(trimmed) {
        return Some(dt);
    }

    let stripped = strip_trailing_comment(trimmed);
    if stripped != trimmed {
        if let Some(dt) = parse_standard(stripped) {
            return Some(dt);
        }
    }

    for candidate in [trimmed, stripped] {
        let candidate = strip_day_of_week(candidate);
        for fmt in FALLBACK_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(candidate, fmt) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }
    }

    debug!(date = trimmed, "could not parse date");
    None
}

/// RFC 2822 then RFC 3339.
fn parse_standard(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Strip a trailing parenthesized comment, e.g. a timezone name.
fn strip_trailing_comment(s: &str) -> &str {
    let trimmed = s.trim_end();
    if trimmed.ends_with(')') {
        if let Some(open) = trimmed.rfind('(') {
            return trimmed[..open].trim_end();
        }
    }
    trimmed
}

/// Strip a leading day-of-week prefix ("Thu, " or "Thu ").
fn strip_day_of_week(s: &str) -> &str {
    const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    for day in DAYS {
        if let Some(rest) = s.strip_prefix(day) {
            if let Some(rest) = rest.strip_prefix(',') {
                return rest.trim_start();
            }
            if rest.starts_with(' ') {
                return rest.trim_start();
            }
        }
    }
    s
}
