//! Magic-group timestamp parsing: turns a [TimestampDescriptor] plus
//! a set of regex captures into a [chrono::NaiveDateTime], applying the source
//! file's mtime year as a default and accepting either numeric or 3-letter-name months.

use chrono::{NaiveDate, NaiveDateTime};
use model::TimestampDescriptor;
use regex::Captures;
use std::collections::BTreeMap;

/// Result of a successful magic-group parse: the bound timestamp plus any
/// non-magic named groups on the timestamp regex, which become user fields.
pub struct ParsedTimestamp {
    pub naive: NaiveDateTime,
    pub user_fields: BTreeMap<String, String>,
}

const MONTH_NAMES: [&str; 12] = ["jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec"];

/// Picks the first group in `names` whose capture is present and non-empty.
fn pick<'h>(names: &[String], captures: &Captures<'h>) -> Option<&'h str> {
    names.iter().find_map(|name| captures.name(name).map(|m| m.as_str()).filter(|s| !s.is_empty()))
}

fn parse_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    if raw.len() <= 2 {
        Some(2000 + year)
    } else {
        Some(year)
    }
}

fn parse_month(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    let lower = raw.to_lowercase();
    MONTH_NAMES.iter().position(|name| lower.starts_with(name)).map(|i| i as u32 + 1)
}

/// Parses a timestamp from `captures` per the magic-group rules: at least four of
/// the six `{Y,M,D,h,m,s}` slots must bind, year defaults to `source_mtime_year`,
/// month may be numeric or an English name, seconds default to 0.
pub fn parse_timestamp(descriptor: &TimestampDescriptor, captures: &Captures, source_mtime_year: i32) -> Option<ParsedTimestamp> {
    let year_str = pick(&descriptor.year_groups, captures);
    let month_str = pick(&descriptor.month_groups, captures);
    let day_str = pick(&descriptor.day_groups, captures);
    let hour_str = pick(&descriptor.hour_groups, captures);
    let minute_str = pick(&descriptor.minute_groups, captures);
    let second_str = pick(&descriptor.second_groups, captures);

    let bound_count = [year_str, month_str, day_str, hour_str, minute_str, second_str].iter().filter(|v| v.is_some()).count();
    if bound_count < 4 {
        return None;
    }

    let year = match year_str {
        Some(raw) => parse_year(raw)?,
        None => source_mtime_year,
    };
    let month = month_str.and_then(parse_month).unwrap_or(1);
    let day: u32 = day_str.and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = hour_str.and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = minute_str.and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = second_str.and_then(|s| s.parse().ok()).unwrap_or(0);

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    let mut user_fields = BTreeMap::new();
    for name in &descriptor.user_field_groups {
        if let Some(m) = captures.name(name) {
            user_fields.insert(name.clone(), m.as_str().to_owned());
        }
    }

    Some(ParsedTimestamp { naive, user_fields })
}
