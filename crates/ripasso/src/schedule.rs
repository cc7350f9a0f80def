use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

use crate::types::{ScheduleEntry, Subject};

/// Lookup from calendar day to its schedule entry
pub type ScheduleIndex = BTreeMap<NaiveDate, ScheduleEntry>;

/// Expand the plan into one entry per calendar day, starting at `start`.
///
/// Subjects are walked in order and share a single day cursor, so the day
/// after a subject's last day is day 1 of the next subject. Weekends are not
/// skipped.
pub fn build_schedule(plan: &[Subject], start: NaiveDate) -> Vec<ScheduleEntry> {
    let total: usize = plan.iter().map(|s| s.duration_days as usize).sum();
    let mut entries = Vec::with_capacity(total);
    let mut day = start;

    for subject in plan {
        for day_index in 1..=subject.duration_days {
            entries.push(ScheduleEntry::new(day, subject, day_index));
            day += Duration::days(1);
        }
    }

    entries
}

/// Index entries by date. Dates are unique in a built schedule.
pub fn index_schedule(entries: &[ScheduleEntry]) -> ScheduleIndex {
    entries.iter().map(|e| (e.date, e.clone())).collect()
}
