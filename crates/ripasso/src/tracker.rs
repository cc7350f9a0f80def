//! The combined view: fixed plan, derived schedule and calendar, and the
//! user's completion state, with persistence after every change.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use crate::calendar::{build_calendar, MonthBucket};
use crate::persistence::{Persistence, Slice};
use crate::plan::{self, STUDY_PLAN};
use crate::progress::ProgressReport;
use crate::schedule::{build_schedule, index_schedule, ScheduleIndex};
use crate::state::{self, Action, StudyState};
use crate::types::{MockExam, ScheduleEntry, Subject};

/// An action that points at something the plan does not have
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("Unknown subject {0}")]
    UnknownSubject(u32),

    #[error("Subject {subject} has no topic {topic}")]
    UnknownTopic { subject: u32, topic: usize },

    #[error("{0} is not a scheduled study day")]
    UnscheduledDay(NaiveDate),

    #[error("Unknown mock {0}")]
    UnknownMock(u32),
}

pub struct Tracker {
    plan: &'static [Subject],
    schedule: Vec<ScheduleEntry>,
    index: ScheduleIndex,
    calendar: Vec<MonthBucket>,
    state: StudyState,
    persistence: Persistence,
}

impl Tracker {
    /// Tracker for the fixed study plan, loading state from `persistence`
    pub fn open(persistence: Persistence) -> Self {
        Self::with_plan(STUDY_PLAN, plan::schedule_start(), persistence)
    }

    pub fn with_plan(
        plan: &'static [Subject],
        start: NaiveDate,
        persistence: Persistence,
    ) -> Self {
        let schedule = build_schedule(plan, start);
        let index = index_schedule(&schedule);
        let calendar = build_calendar(&schedule, &index);
        let state = persistence.load_state();

        info!(
            subjects = plan.len(),
            days = schedule.len(),
            months = calendar.len(),
            mocks = state.mocks.len(),
            subjects_done = state.subjects.len(),
            days_done = state.days.len(),
            "Study plan loaded"
        );

        Self {
            plan,
            schedule,
            index,
            calendar,
            state,
            persistence,
        }
    }

    pub fn plan(&self) -> &'static [Subject] {
        self.plan
    }

    pub fn schedule(&self) -> &[ScheduleEntry] {
        &self.schedule
    }

    pub fn calendar(&self) -> &[MonthBucket] {
        &self.calendar
    }

    pub fn state(&self) -> &StudyState {
        &self.state
    }

    pub fn mocks(&self) -> &[MockExam] {
        &self.state.mocks
    }

    pub fn progress(&self) -> ProgressReport {
        ProgressReport::compute(self.plan, &self.schedule, &self.state)
    }

    /// Check that an action targets an existing subject, topic, scheduled
    /// day or mock
    pub fn validate(&self, action: &Action) -> Result<(), ActionError> {
        match action {
            Action::ToggleSubject { number } => {
                self.subject(*number)?;
            }
            Action::ToggleTopic { subject, topic } | Action::SetTopicNote { subject, topic, .. } => {
                if *topic >= self.subject(*subject)?.topics.len() {
                    return Err(ActionError::UnknownTopic {
                        subject: *subject,
                        topic: *topic,
                    });
                }
            }
            Action::ToggleDay { date } => {
                if !self.index.contains_key(date) {
                    return Err(ActionError::UnscheduledDay(*date));
                }
            }
            Action::ToggleMock { id } | Action::SetMockNote { id, .. } => {
                if !self.state.mocks.iter().any(|m| m.id == *id) {
                    return Err(ActionError::UnknownMock(*id));
                }
            }
            Action::ClearDays => {}
        }
        Ok(())
    }

    fn subject(&self, number: u32) -> Result<&Subject, ActionError> {
        self.plan
            .iter()
            .find(|s| s.number == number)
            .ok_or(ActionError::UnknownSubject(number))
    }

    /// Validate and apply one action, then persist the slice it touched
    pub fn dispatch(&mut self, action: Action) -> Result<ProgressReport, ActionError> {
        self.validate(&action)?;

        let slice = action.slice();
        let clears = matches!(action, Action::ClearDays);

        let current = std::mem::take(&mut self.state);
        self.state = state::apply(current, action);

        if clears {
            self.persistence.clear(Slice::Days);
        } else {
            self.persistence.save(slice, &self.state);
        }

        let progress = self.progress();
        info!(
            slice = %slice,
            overall = progress.overall_percent,
            "State updated"
        );
        Ok(progress)
    }
}
