use chrono::{Duration, NaiveDate};

use crate::plan::{self, const_date};
use crate::types::MockExam;

/// A run of mocks every `step_days` from `start` while the date is `<= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub step_days: i64,
}

/// When mock exams happen: a fixed-size warm-up followed by bounded phases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCadence {
    pub warm_up_start: NaiveDate,
    pub warm_up_count: u32,
    pub warm_up_step_days: i64,
    pub phases: Vec<Phase>,
}

impl MockCadence {
    /// The cadence of the fixed plan: warm-up, main phase, final push
    pub fn reference() -> Self {
        Self {
            warm_up_start: const_date(plan::MOCK_START),
            warm_up_count: plan::WARM_UP_COUNT,
            warm_up_step_days: plan::WARM_UP_STEP_DAYS,
            phases: vec![
                Phase {
                    start: const_date(plan::MAIN_PHASE.0),
                    end: const_date(plan::MAIN_PHASE.1),
                    step_days: plan::PHASE_STEP_DAYS,
                },
                Phase {
                    start: const_date(plan::FINAL_PUSH.0),
                    end: const_date(plan::FINAL_PUSH.1),
                    step_days: plan::PHASE_STEP_DAYS,
                },
            ],
        }
    }
}

/// Generate the mock list for a cadence.
///
/// Ids start at 1 and follow generation order. Phases are not de-duplicated
/// against each other.
pub fn generate_mocks(cadence: &MockCadence) -> Vec<MockExam> {
    let mut dates = Vec::new();

    let mut day = cadence.warm_up_start;
    for _ in 0..cadence.warm_up_count {
        dates.push(day);
        day += Duration::days(cadence.warm_up_step_days);
    }

    for phase in &cadence.phases {
        // A non-positive step would never reach the end date
        if phase.step_days <= 0 {
            continue;
        }
        let mut day = phase.start;
        while day <= phase.end {
            dates.push(day);
            day += Duration::days(phase.step_days);
        }
    }

    dates
        .into_iter()
        .zip(1..)
        .map(|(date, id)| MockExam::new(id, date))
        .collect()
}

/// The mock list used when nothing valid has been saved yet
pub fn default_mocks() -> Vec<MockExam> {
    generate_mocks(&MockCadence::reference())
}
