//! Rollout Aggregation
//!
//! Derived views over the validator directory, computed on demand.

use chrono::{DateTime, FixedOffset};

use crate::types::{ValidatorRecord, ValidatorStatus};

/// Completed share as a whole percentage, rounding half up
///
/// Zero validators yields 0.
pub fn progress_percentage(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    // round(100 * c / t) == floor((200 * c + t) / (2 * t))
    ((200 * completed + total) / (2 * total)) as u32
}

/// Most recent `lastUpdate` across records, compared as points in time
///
/// Unparseable timestamps rank below every parseable one.
pub fn latest_update<'a, I>(records: I) -> Option<String>
where
    I: IntoIterator<Item = &'a ValidatorRecord>,
{
    records
        .into_iter()
        .filter_map(|r| r.last_update.as_deref())
        .map(|ts| (parse_timestamp(ts), ts))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, ts)| ts.to_string())
}

pub fn count_completed<'a, I>(records: I) -> usize
where
    I: IntoIterator<Item = &'a ValidatorRecord>,
{
    records
        .into_iter()
        .filter(|r| r.status == ValidatorStatus::Completed)
        .count()
}

pub fn pending<'a, I>(records: I) -> Vec<ValidatorRecord>
where
    I: IntoIterator<Item = &'a ValidatorRecord>,
{
    records
        .into_iter()
        .filter(|r| r.status == ValidatorStatus::Pending)
        .cloned()
        .collect()
}

fn parse_timestamp(ts: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(ts).ok()
}
