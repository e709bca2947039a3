//! Human-readable durations and timestamps
//!
//! Thresholds follow the relative-time rules wallets and explorers use
//! ("a few seconds", "a minute", "3 days", "a year").

use chrono::{DateTime, Datelike, Utc};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
/// Days in a 400-year Gregorian cycle, which holds 4800 months.
const DAYS_PER_400_YEARS: u128 = 146_097;

/// Rendered for timestamps chrono cannot represent
pub const INVALID_DATE: &str = "Invalid date";

fn round_div(numerator: u128, denominator: u128) -> u128 {
    (2 * numerator + denominator) / (2 * denominator)
}

fn plural(count: u128, unit: &str) -> String {
    format!("{} {}s", count, unit)
}

/// Describe a duration, e.g. `humanize_duration(259_200) == "3 days"`.
pub fn humanize_duration(seconds: u64) -> String {
    let secs = seconds as u128;
    let minutes = round_div(secs, MINUTE as u128);
    let hours = round_div(secs, HOUR as u128);
    let days = round_div(secs, DAY as u128);
    let months = round_div(secs * 4_800, DAYS_PER_400_YEARS * DAY as u128);
    let years = round_div(secs * 400, DAYS_PER_400_YEARS * DAY as u128);

    if secs < 45 {
        "a few seconds".to_string()
    } else if minutes <= 1 {
        "a minute".to_string()
    } else if minutes < 45 {
        plural(minutes, "minute")
    } else if hours <= 1 {
        "an hour".to_string()
    } else if hours < 22 {
        plural(hours, "hour")
    } else if days <= 1 {
        "a day".to_string()
    } else if days < 26 {
        plural(days, "day")
    } else if months <= 1 {
        "a month".to_string()
    } else if months < 11 {
        plural(months, "month")
    } else if years <= 1 {
        "a year".to_string()
    } else {
        plural(years, "year")
    }
}

/// "in 3 days" when `timestamp` is ahead of `now`, "3 days ago" otherwise.
pub fn format_relative(timestamp: u64, now: u64) -> String {
    if timestamp > now {
        format!("in {}", humanize_duration(timestamp - now))
    } else {
        format!("{} ago", humanize_duration(now - timestamp))
    }
}

fn to_datetime(timestamp: u64) -> Option<DateTime<Utc>> {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Long form used on the proposal sidebar: "March 31st 2021, 2:32:05" (UTC).
pub fn format_timestamp(timestamp: u64) -> String {
    match to_datetime(timestamp) {
        Some(dt) => format!(
            "{} {}{} {}",
            dt.format("%B"),
            dt.day(),
            ordinal_suffix(dt.day()),
            dt.format("%Y, %-I:%M:%S")
        ),
        None => INVALID_DATE.to_string(),
    }
}

/// Date only: "March 31, 2021" (UTC).
pub fn format_date(timestamp: u64) -> String {
    match to_datetime(timestamp) {
        Some(dt) => dt.format("%B %-d, %Y").to_string(),
        None => INVALID_DATE.to_string(),
    }
}
