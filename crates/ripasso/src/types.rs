use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::dates;

/// A subject of the study plan
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Position in the plan, unique, starting at 1
    pub number: u32,

    pub name: &'static str,

    /// Number of consecutive calendar days the subject occupies
    pub duration_days: u32,

    pub topics: &'static [&'static str],
}

/// One calendar day of the sequential study plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    #[serde(rename = "dateKey")]
    pub date: NaiveDate,

    pub subject_number: u32,

    pub subject_name: String,

    /// 1-based day counter within the subject
    #[serde(rename = "dayIndexWithinSubject")]
    pub day_index: u32,
}

impl ScheduleEntry {
    pub fn new(date: NaiveDate, subject: &Subject, day_index: u32) -> Self {
        Self {
            date,
            subject_number: subject.number,
            subject_name: subject.name.to_string(),
            day_index,
        }
    }

    pub fn date_key(&self) -> String {
        dates::canonical_date_key(&self.date)
    }
}

/// A scheduled full-length practice exam
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MockExam {
    pub id: u32,

    /// Older saves wrote this field as `dateISO`
    #[serde(rename = "dateKey", alias = "dateISO")]
    pub date: NaiveDate,

    #[serde(default, deserialize_with = "null_as_default")]
    pub done: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub note: String,
}

/// Read `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl MockExam {
    pub fn new(id: u32, date: NaiveDate) -> Self {
        Self {
            id,
            date,
            done: false,
            note: String::new(),
        }
    }

    pub fn date_key(&self) -> String {
        dates::canonical_date_key(&self.date)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopicKeyError {
    #[error("topic key must look like '<subject>-<topic>', got '{0}'")]
    MissingSeparator(String),

    #[error("invalid number in topic key '{0}'")]
    InvalidNumber(String),
}

/// Identifies a topic by subject number and 0-based topic index.
///
/// Stored and sent over the wire as `"{subject}-{topic}"`, which is the only
/// place the string form exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicKey {
    pub subject: u32,
    pub topic: usize,
}

impl TopicKey {
    pub fn new(subject: u32, topic: usize) -> Self {
        Self { subject, topic }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.subject, self.topic)
    }
}

impl FromStr for TopicKey {
    type Err = TopicKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (subject, topic) = s
            .split_once('-')
            .ok_or_else(|| TopicKeyError::MissingSeparator(s.to_string()))?;

        Ok(Self {
            subject: parse_digits(subject, s)?,
            topic: parse_digits(topic, s)?,
        })
    }
}

/// Parse a key part made of ASCII digits only, so "+1" or " 1" never alias "1"
fn parse_digits<T: FromStr>(part: &str, key: &str) -> Result<T, TopicKeyError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TopicKeyError::InvalidNumber(key.to_string()));
    }
    part.parse()
        .map_err(|_| TopicKeyError::InvalidNumber(key.to_string()))
}

impl Serialize for TopicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TopicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
