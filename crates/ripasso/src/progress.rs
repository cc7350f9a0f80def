//! Completion percentages.

use serde::Serialize;

use crate::plan::{MOCK_WEIGHT, SUBJECT_WEIGHT};
use crate::state::StudyState;
use crate::types::{MockExam, ScheduleEntry, Subject, TopicKey};

/// Segments in the dashboard's progress meters
pub const METER_SEGMENTS: u32 = 10;

/// Share of plan subjects marked complete, 0..=100.
///
/// Numbers that are not part of the plan are ignored, so stale saves cannot
/// push the figure past 100.
pub fn subject_percent(plan: &[Subject], state: &StudyState) -> f64 {
    if plan.is_empty() {
        return 0.0;
    }
    let done = plan
        .iter()
        .filter(|s| state.subjects.contains(s.number))
        .count();
    100.0 * done as f64 / plan.len() as f64
}

/// Share of mocks marked done, 0..=100. An empty list counts as 0.
pub fn mock_percent(mocks: &[MockExam]) -> f64 {
    let done = mocks.iter().filter(|m| m.done).count();
    100.0 * done as f64 / mocks.len().max(1) as f64
}

/// Weighted blend of subject and mock completion, rounded to 2 decimals
pub fn overall_percent(subject_percent: f64, mock_percent: f64) -> f64 {
    round2(subject_percent * SUBJECT_WEIGHT + mock_percent * MOCK_WEIGHT)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Filled segments of a [`METER_SEGMENTS`]-wide meter
pub fn meter_segments(percent: f64) -> u32 {
    let filled = (percent / (100.0 / f64::from(METER_SEGMENTS))).round();
    filled.clamp(0.0, f64::from(METER_SEGMENTS)) as u32
}

/// Everything the dashboard shows about progress
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub subject_percent: f64,
    pub mock_percent: f64,
    pub overall_percent: f64,
    pub subjects_done: usize,
    pub subjects_total: usize,
    pub mocks_done: usize,
    pub mocks_total: usize,
    pub topics_done: usize,
    pub topics_total: usize,
    pub days_done: usize,
    pub days_total: usize,
}

impl ProgressReport {
    pub fn compute(plan: &[Subject], schedule: &[ScheduleEntry], state: &StudyState) -> Self {
        let subject_percent = subject_percent(plan, state);
        let mock_percent = mock_percent(&state.mocks);

        let topic_keys = || {
            plan.iter().flat_map(|s| {
                (0..s.topics.len()).map(move |idx| TopicKey::new(s.number, idx))
            })
        };

        Self {
            subject_percent,
            mock_percent,
            overall_percent: overall_percent(subject_percent, mock_percent),
            subjects_done: plan
                .iter()
                .filter(|s| state.subjects.contains(s.number))
                .count(),
            subjects_total: plan.len(),
            mocks_done: state.mocks.iter().filter(|m| m.done).count(),
            mocks_total: state.mocks.len(),
            topics_done: topic_keys().filter(|k| state.topics.is_done(k)).count(),
            topics_total: topic_keys().count(),
            days_done: schedule
                .iter()
                .filter(|e| state.days.is_done(&e.date))
                .count(),
            days_total: schedule.len(),
        }
    }
}
