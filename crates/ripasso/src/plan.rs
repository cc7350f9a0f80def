//! Fixed study plan: subjects, start dates, mock cadence and progress weights.
//!
//! Everything here is policy decided at build time.

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::Subject;

/// First day of the subject schedule
pub const SCHEDULE_START: NaiveDateParts = (2025, 11, 27);

/// First warm-up mock
pub const MOCK_START: NaiveDateParts = (2025, 12, 22);

pub const WARM_UP_COUNT: u32 = 4;
pub const WARM_UP_STEP_DAYS: i64 = 3;

pub const MAIN_PHASE: (NaiveDateParts, NaiveDateParts) = ((2026, 1, 1), (2026, 1, 19));
pub const FINAL_PUSH: (NaiveDateParts, NaiveDateParts) = ((2026, 1, 20), (2026, 2, 5));
pub const PHASE_STEP_DAYS: i64 = 2;

/// Share of the overall score taken by subject completion
pub const SUBJECT_WEIGHT: f64 = 0.6;
/// Share of the overall score taken by mock completion
pub const MOCK_WEIGHT: f64 = 0.4;

/// Longest subject name shown in a calendar cell before abbreviating
pub const CALENDAR_NAME_LEN: usize = 18;

pub type NaiveDateParts = (i32, u32, u32);

/// Build a date from a constant. Only called on the literals above.
pub fn const_date((y, m, d): NaiveDateParts) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

pub fn schedule_start() -> NaiveDate {
    const_date(SCHEDULE_START)
}

pub const STUDY_PLAN: &[Subject] = &[
    Subject {
        number: 1,
        name: "DBMS",
        duration_days: 4,
        topics: &[
            "ER Model",
            "Keys & Constraints",
            "SQL Queries",
            "Normalization",
            "Transactions",
            "Indexing",
        ],
    },
    Subject {
        number: 2,
        name: "Computer Organization (COA)",
        duration_days: 4,
        topics: &["Number Systems", "Addressing Modes", "Pipelining", "Cache", "I/O"],
    },
    Subject {
        number: 3,
        name: "Operating Systems",
        duration_days: 4,
        topics: &[
            "Scheduling",
            "Deadlocks",
            "Paging",
            "Page Replacement",
            "Disk Scheduling",
        ],
    },
    Subject {
        number: 4,
        name: "Computer Networks",
        duration_days: 7,
        topics: &[
            "OSI/TCPIP",
            "Encoding/CRC",
            "Subnetting",
            "Routing",
            "TCP/UDP",
            "Congestion",
            "App Layer",
        ],
    },
    Subject {
        number: 5,
        name: "C Programming",
        duration_days: 3,
        topics: &["Loops", "Arrays", "Pointers", "Functions", "Structs"],
    },
    Subject {
        number: 6,
        name: "Data Structures",
        duration_days: 4,
        topics: &["Linked Lists", "Trees", "Heaps", "Graphs", "Hashing"],
    },
    Subject {
        number: 7,
        name: "Algorithms",
        duration_days: 6,
        topics: &[
            "Complexity",
            "Sorting",
            "Divide&Conquer",
            "Greedy",
            "DP",
            "Graph Algos",
        ],
    },
    Subject {
        number: 8,
        name: "Discrete Mathematics",
        duration_days: 4,
        topics: &["Logic", "Sets", "Graph Theory", "P&C"],
    },
    Subject {
        number: 9,
        name: "Linear Algebra",
        duration_days: 2,
        topics: &["Matrices", "Rank", "Eigenvalues", "Systems"],
    },
    Subject {
        number: 10,
        name: "Probability & Stats",
        duration_days: 2,
        topics: &["Bayes", "Random Variables", "Distributions", "Variance"],
    },
    Subject {
        number: 11,
        name: "TOC",
        duration_days: 3,
        topics: &["DFA/NFA", "Regex", "PDA", "Turing Machines"],
    },
    Subject {
        number: 12,
        name: "Digital Logic",
        duration_days: 3,
        topics: &["Boolean Algebra", "K-Maps", "Combinational", "Sequential"],
    },
];

/// A block of the suggested daily routine shown on the dashboard
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TimeSlot {
    pub hours: &'static str,
    pub activity: &'static str,
}

pub const DAILY_TIMETABLE: &[TimeSlot] = &[
    TimeSlot {
        hours: "6:00 - 9:00 AM",
        activity: "Main subject lectures (2x) + running notes",
    },
    TimeSlot {
        hours: "9:30 AM - 1:00 PM",
        activity: "Continue lectures + 5-10 PYQs topic-wise",
    },
    TimeSlot {
        hours: "2:00 - 4:30 PM",
        activity: "Dedicated PYQ solving",
    },
    TimeSlot {
        hours: "4:45 - 6:30 PM",
        activity: "Revision & error log",
    },
    TimeSlot {
        hours: "7:00 - 9:00 PM",
        activity: "Aptitude (1-1.5 hr daily)",
    },
    TimeSlot {
        hours: "9:30 - 11:00 PM",
        activity: "Light revision & next day plan",
    },
];

/// Look up a subject of the fixed plan by number
pub fn subject(number: u32) -> Option<&'static Subject> {
    STUDY_PLAN.iter().find(|s| s.number == number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_plan_numbers_are_unique_and_dense() {
        let numbers: Vec<u32> = STUDY_PLAN.iter().map(|s| s.number).collect();
        let expected: Vec<u32> = (1..=STUDY_PLAN.len() as u32).collect();
        assert_eq!(numbers, expected);

        let unique: HashSet<_> = numbers.iter().collect();
        assert_eq!(unique.len(), STUDY_PLAN.len());
    }

    #[test]
    fn test_plan_durations_positive() {
        assert!(STUDY_PLAN.iter().all(|s| s.duration_days > 0));
    }

    #[test]
    fn test_plan_total_days() {
        let total: u32 = STUDY_PLAN.iter().map(|s| s.duration_days).sum();
        assert_eq!(total, 46);
    }

    #[test]
    fn test_every_subject_has_topics() {
        assert!(STUDY_PLAN.iter().all(|s| !s.topics.is_empty()));
    }

    #[test]
    fn test_weights_sum_to_one() {
        assert!((SUBJECT_WEIGHT + MOCK_WEIGHT - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_constant_dates_are_valid() {
        assert_ne!(const_date(SCHEDULE_START), NaiveDate::MIN);
        assert_ne!(const_date(MOCK_START), NaiveDate::MIN);
        assert_ne!(const_date(MAIN_PHASE.0), NaiveDate::MIN);
        assert_ne!(const_date(MAIN_PHASE.1), NaiveDate::MIN);
        assert_ne!(const_date(FINAL_PUSH.0), NaiveDate::MIN);
        assert_ne!(const_date(FINAL_PUSH.1), NaiveDate::MIN);
    }

    #[test]
    fn test_subject_lookup() {
        assert_eq!(subject(4).map(|s| s.name), Some("Computer Networks"));
        assert!(subject(0).is_none());
        assert!(subject(13).is_none());
    }
}
