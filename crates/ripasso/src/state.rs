//! User completion state and the actions that change it.
//!
//! Every update here is a plain function from old state to new state; saving
//! is left to the caller.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::persistence::Slice;
use crate::types::{MockExam, TopicKey};

/// Subject numbers marked complete. Stored as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletedSubjects(BTreeSet<u32>);

impl CompletedSubjects {
    pub fn contains(&self, number: u32) -> bool {
        self.0.contains(&number)
    }

    pub fn toggle(mut self, number: u32) -> Self {
        if !self.0.remove(&number) {
            self.0.insert(number);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Decode a string-keyed map, dropping only the entries whose key does not
/// parse
fn parse_keys<'de, D, K, V>(deserializer: D, slice: Slice) -> Result<BTreeMap<K, V>, D::Error>
where
    D: Deserializer<'de>,
    K: FromStr + Ord,
    K::Err: fmt::Display,
    V: Deserialize<'de>,
{
    let raw = BTreeMap::<String, V>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| match key.parse() {
            Ok(parsed) => Some((parsed, value)),
            Err(e) => {
                warn!(slice = %slice, key = %key, error = %e, "Dropping entry with unreadable key");
                None
            }
        })
        .collect())
}

/// Per-topic done flags. Toggling off keeps an explicit `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TopicCompletion(BTreeMap<TopicKey, bool>);

impl<'de> Deserialize<'de> for TopicCompletion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        parse_keys(deserializer, Slice::Topics).map(Self)
    }
}

impl TopicCompletion {
    pub fn is_done(&self, key: &TopicKey) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    pub fn toggle(mut self, key: TopicKey) -> Self {
        let next = !self.is_done(&key);
        self.0.insert(key, next);
        self
    }
}

/// Calendar days marked complete.
///
/// Only completed days are held, so un-marking a day removes it. Stored as a
/// `{ "YYYY-MM-DD": true }` map; `false` entries in old saves are dropped on
/// load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayCompletion(BTreeSet<NaiveDate>);

impl DayCompletion {
    pub fn is_done(&self, date: &NaiveDate) -> bool {
        self.0.contains(date)
    }

    pub fn toggle(mut self, date: NaiveDate) -> Self {
        if !self.0.remove(&date) {
            self.0.insert(date);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for DayCompletion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|date| (date, true)))
    }
}

impl<'de> Deserialize<'de> for DayCompletion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: BTreeMap<NaiveDate, bool> = parse_keys(deserializer, Slice::Days)?;
        Ok(Self(
            raw.into_iter()
                .filter_map(|(date, done)| done.then_some(date))
                .collect(),
        ))
    }
}

/// Free-text notes per topic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TopicNotes(BTreeMap<TopicKey, String>);

impl<'de> Deserialize<'de> for TopicNotes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        parse_keys(deserializer, Slice::Notes).map(Self)
    }
}

impl TopicNotes {
    pub fn get(&self, key: &TopicKey) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn set(mut self, key: TopicKey, text: String) -> Self {
        self.0.insert(key, text);
        self
    }
}

/// Flip `done` on the mock with `id`; other mocks are untouched
pub fn toggle_mock(mut mocks: Vec<MockExam>, id: u32) -> Vec<MockExam> {
    if let Some(mock) = mocks.iter_mut().find(|m| m.id == id) {
        mock.done = !mock.done;
    }
    mocks
}

pub fn set_mock_note(mut mocks: Vec<MockExam>, id: u32, text: String) -> Vec<MockExam> {
    if let Some(mock) = mocks.iter_mut().find(|m| m.id == id) {
        mock.note = text;
    }
    mocks
}

/// Everything the user has marked or written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyState {
    #[serde(rename = "completedSubjects")]
    pub subjects: CompletedSubjects,
    #[serde(rename = "completedTopics")]
    pub topics: TopicCompletion,
    #[serde(rename = "completedDays")]
    pub days: DayCompletion,
    #[serde(rename = "topicNotes")]
    pub notes: TopicNotes,
    pub mocks: Vec<MockExam>,
}

impl StudyState {
    #[cfg(test)]
    pub fn new(mocks: Vec<MockExam>) -> Self {
        Self {
            mocks,
            ..Default::default()
        }
    }
}

/// A single user interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    ToggleSubject { number: u32 },
    ToggleTopic { subject: u32, topic: usize },
    ToggleDay { date: NaiveDate },
    SetTopicNote { subject: u32, topic: usize, text: String },
    ToggleMock { id: u32 },
    SetMockNote { id: u32, text: String },
    ClearDays,
}

impl Action {
    /// The state slice this action changes
    pub fn slice(&self) -> Slice {
        match self {
            Action::ToggleSubject { .. } => Slice::Subjects,
            Action::ToggleTopic { .. } => Slice::Topics,
            Action::ToggleDay { .. } | Action::ClearDays => Slice::Days,
            Action::SetTopicNote { .. } => Slice::Notes,
            Action::ToggleMock { .. } | Action::SetMockNote { .. } => Slice::Mocks,
        }
    }
}

/// Apply `action` to `state`, returning the new state
pub fn apply(state: StudyState, action: Action) -> StudyState {
    let StudyState {
        subjects,
        topics,
        days,
        notes,
        mocks,
    } = state;

    match action {
        Action::ToggleSubject { number } => StudyState {
            subjects: subjects.toggle(number),
            topics,
            days,
            notes,
            mocks,
        },
        Action::ToggleTopic { subject, topic } => StudyState {
            subjects,
            topics: topics.toggle(TopicKey::new(subject, topic)),
            days,
            notes,
            mocks,
        },
        Action::ToggleDay { date } => StudyState {
            subjects,
            topics,
            days: days.toggle(date),
            notes,
            mocks,
        },
        Action::SetTopicNote {
            subject,
            topic,
            text,
        } => StudyState {
            subjects,
            topics,
            days,
            notes: notes.set(TopicKey::new(subject, topic), text),
            mocks,
        },
        Action::ToggleMock { id } => StudyState {
            subjects,
            topics,
            days,
            notes,
            mocks: toggle_mock(mocks, id),
        },
        Action::SetMockNote { id, text } => StudyState {
            subjects,
            topics,
            days,
            notes,
            mocks: set_mock_note(mocks, id, text),
        },
        Action::ClearDays => StudyState {
            subjects,
            topics,
            days: DayCompletion::default(),
            notes,
            mocks,
        },
    }
}
