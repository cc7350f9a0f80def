//! Month-by-month calendar layout of the schedule.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::dates;
use crate::schedule::ScheduleIndex;
use crate::types::ScheduleEntry;

const DAYS_PER_WEEK: usize = 7;

/// A real day of the month
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
    #[serde(rename = "dateKey")]
    pub date: NaiveDate,
    pub is_scheduled: bool,
    pub schedule_entry: Option<ScheduleEntry>,
}

impl DayCell {
    pub fn date_key(&self) -> String {
        dates::canonical_date_key(&self.date)
    }
}

/// One slot of a week row. Blanks pad the month to whole weeks and are
/// serialized as `null`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CalendarCell {
    Blank,
    Day(DayCell),
}

impl CalendarCell {
    pub fn day(&self) -> Option<&DayCell> {
        match self {
            CalendarCell::Blank => None,
            CalendarCell::Day(cell) => Some(cell),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    pub year: i32,
    /// 0-based month
    pub month_index: u32,
    pub label: String,
    /// Sunday-first rows of exactly seven cells
    pub weeks: Vec<Vec<CalendarCell>>,
}

/// Lay out every month touched by the schedule, first through last entry.
///
/// `schedule` is expected in chronological order, as produced by
/// [`crate::schedule::build_schedule`].
pub fn build_calendar(schedule: &[ScheduleEntry], index: &ScheduleIndex) -> Vec<MonthBucket> {
    let (Some(first), Some(last)) = (schedule.first(), schedule.last()) else {
        return Vec::new();
    };

    let end = first_of_month(last.date);
    let mut cursor = first_of_month(first.date);
    let mut months = Vec::new();

    while cursor <= end {
        let (bucket, next) = build_month(cursor, index);
        months.push(bucket);
        cursor = next;
    }

    months
}

/// Build the bucket starting at `first` and return it with the first day of
/// the following month
fn build_month(first: NaiveDate, index: &ScheduleIndex) -> (MonthBucket, NaiveDate) {
    let leading = first.weekday().num_days_from_sunday() as usize;
    let mut cells: Vec<CalendarCell> = vec![CalendarCell::Blank; leading];

    let mut last = first;
    for day in first.iter_days().take_while(|d| d.month() == first.month()) {
        let entry = index.get(&day).cloned();
        cells.push(CalendarCell::Day(DayCell {
            date: day,
            is_scheduled: entry.is_some(),
            schedule_entry: entry,
        }));
        last = day;
    }

    while cells.len() % DAYS_PER_WEEK != 0 {
        cells.push(CalendarCell::Blank);
    }

    let weeks = cells
        .chunks(DAYS_PER_WEEK)
        .map(|week| week.to_vec())
        .collect();

    let bucket = MonthBucket {
        year: first.year(),
        month_index: first.month0(),
        label: dates::month_label(first.year(), first.month0()).unwrap_or_default(),
        weeks,
    };

    (bucket, last + Duration::days(1))
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}
