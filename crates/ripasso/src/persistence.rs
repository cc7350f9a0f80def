//! Load and save state slices through a [`KeyValueStore`].
//!
//! Loading never fails: each slice decodes to a [`Loaded`] value that says
//! whether the stored data was used or a fallback was substituted. Saving is
//! best-effort and only logs on failure.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use crate::mocks::default_mocks;
use crate::state::{CompletedSubjects, DayCompletion, StudyState, TopicCompletion, TopicNotes};
use crate::storage::{KeyValueStore, StorageError};
use crate::types::MockExam;

/// An independently persisted part of [`StudyState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slice {
    Subjects,
    Topics,
    Days,
    Notes,
    Mocks,
}

impl Slice {
    #[cfg(test)]
    pub const ALL: [Slice; 5] = [
        Slice::Subjects,
        Slice::Topics,
        Slice::Days,
        Slice::Notes,
        Slice::Mocks,
    ];

    pub fn storage_key(self) -> &'static str {
        match self {
            Slice::Subjects => "completedSubjects",
            Slice::Topics => "completedTopics",
            Slice::Days => "completedDays",
            Slice::Notes => "topicNotes",
            Slice::Mocks => "mocks",
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_key())
    }
}

/// Why a slice was replaced by its fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Nothing stored under the key
    Missing,
    /// Stored value is not valid JSON of the expected shape
    Malformed(String),
    /// Stored list is empty where at least one record is required
    Empty,
    /// The backend could not be read
    Unreadable(String),
}

/// Result of decoding a stored slice
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    Stored(T),
    Fallback { value: T, reason: FallbackReason },
}

impl<T> Loaded<T> {
    pub fn into_inner(self) -> T {
        match self {
            Loaded::Stored(value) | Loaded::Fallback { value, .. } => value,
        }
    }

    /// Whether the fallback should be written back. A backend that could
    /// not be read may still hold real data, so it is left alone.
    pub fn should_persist_fallback(&self) -> bool {
        matches!(
            self.fallback_reason(),
            Some(FallbackReason::Missing | FallbackReason::Malformed(_) | FallbackReason::Empty)
        )
    }

    #[cfg(test)]
    pub fn is_stored(&self) -> bool {
        matches!(self, Loaded::Stored(_))
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Loaded::Stored(_) => None,
            Loaded::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Decode a raw stored value, substituting `fallback()` when absent or invalid
pub fn decode_slice<T, F>(raw: Option<&str>, fallback: F) -> Loaded<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    let Some(raw) = raw else {
        return Loaded::Fallback {
            value: fallback(),
            reason: FallbackReason::Missing,
        };
    };

    match serde_json::from_str(raw) {
        Ok(value) => Loaded::Stored(value),
        Err(e) => Loaded::Fallback {
            value: fallback(),
            reason: FallbackReason::Malformed(e.to_string()),
        },
    }
}

/// Decode the stored mock list.
///
/// Only a missing value, a non-array or an empty array is replaced by the
/// generated list. Records are decoded one by one: a record that cannot be
/// read is dropped and the rest are kept.
pub fn decode_mocks(raw: Option<&str>) -> Loaded<Vec<MockExam>> {
    let records: Vec<serde_json::Value> = match decode_slice(raw, Vec::new) {
        Loaded::Stored(records) => records,
        Loaded::Fallback { reason, .. } => {
            return Loaded::Fallback {
                value: default_mocks(),
                reason,
            }
        }
    };

    if records.is_empty() {
        return Loaded::Fallback {
            value: default_mocks(),
            reason: FallbackReason::Empty,
        };
    }

    let total = records.len();
    let mocks: Vec<MockExam> = records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, record)| match serde_json::from_value(record) {
            Ok(mock) => Some(mock),
            Err(e) => {
                warn!(index = idx, error = %e, "Dropping unreadable mock record");
                None
            }
        })
        .collect();

    if mocks.is_empty() {
        return Loaded::Fallback {
            value: default_mocks(),
            reason: FallbackReason::Malformed(format!("none of {} mock records is readable", total)),
        };
    }

    Loaded::Stored(mocks)
}

/// Reads and writes [`StudyState`] slices
pub struct Persistence {
    store: Box<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new<S: KeyValueStore + 'static>(store: S) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    fn read(&self, slice: Slice) -> Result<Option<String>, StorageError> {
        self.store.get(slice.storage_key())
    }

    fn load<T, F>(&self, slice: Slice, fallback: F) -> Loaded<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        match self.read(slice) {
            Ok(raw) => decode_slice(raw.as_deref(), fallback),
            Err(e) => Loaded::Fallback {
                value: fallback(),
                reason: FallbackReason::Unreadable(e.to_string()),
            },
        }
    }

    pub fn load_subjects(&self) -> Loaded<CompletedSubjects> {
        self.load(Slice::Subjects, CompletedSubjects::default)
    }

    pub fn load_topics(&self) -> Loaded<TopicCompletion> {
        self.load(Slice::Topics, TopicCompletion::default)
    }

    pub fn load_days(&self) -> Loaded<DayCompletion> {
        self.load(Slice::Days, DayCompletion::default)
    }

    pub fn load_notes(&self) -> Loaded<TopicNotes> {
        self.load(Slice::Notes, TopicNotes::default)
    }

    /// Mocks fall back to a generated list, also when the stored list is empty
    pub fn load_mocks(&self) -> Loaded<Vec<MockExam>> {
        match self.read(Slice::Mocks) {
            Ok(raw) => decode_mocks(raw.as_deref()),
            Err(e) => Loaded::Fallback {
                value: default_mocks(),
                reason: FallbackReason::Unreadable(e.to_string()),
            },
        }
    }

    /// Load every slice. Slices decode independently, so one corrupt value
    /// does not reset the others. A regenerated mock list is saved straight
    /// away so its dates stay fixed from then on, unless the store could not
    /// be read.
    pub fn load_state(&self) -> StudyState {
        let subjects = log_fallback(Slice::Subjects, self.load_subjects());
        let topics = log_fallback(Slice::Topics, self.load_topics());
        let days = log_fallback(Slice::Days, self.load_days());
        let notes = log_fallback(Slice::Notes, self.load_notes());

        let mocks = self.load_mocks();
        let regenerated = mocks.should_persist_fallback();
        let mocks = log_fallback(Slice::Mocks, mocks);

        let state = StudyState {
            subjects,
            topics,
            days,
            notes,
            mocks,
        };

        if regenerated {
            self.save(Slice::Mocks, &state);
        }

        state
    }

    /// Store one slice of `state`. Failures are logged and dropped; the
    /// in-memory state stays as it is.
    pub fn save(&self, slice: Slice, state: &StudyState) {
        let encoded = match slice {
            Slice::Subjects => encode(&state.subjects),
            Slice::Topics => encode(&state.topics),
            Slice::Days => encode(&state.days),
            Slice::Notes => encode(&state.notes),
            Slice::Mocks => encode(&state.mocks),
        };

        let result = encoded
            .map_err(|e| e.to_string())
            .and_then(|json| {
                self.store
                    .set(slice.storage_key(), &json)
                    .map_err(|e| e.to_string())
            });

        match result {
            Ok(()) => debug!(slice = %slice, "Saved slice"),
            Err(e) => warn!(slice = %slice, error = %e, "Failed to save slice, keeping it in memory"),
        }
    }

    /// Store every slice
    #[cfg(test)]
    pub fn save_all(&self, state: &StudyState) {
        for slice in Slice::ALL {
            self.save(slice, state);
        }
    }

    /// Remove a slice from storage. Failures are logged and dropped.
    pub fn clear(&self, slice: Slice) {
        match self.store.remove(slice.storage_key()) {
            Ok(()) => debug!(slice = %slice, "Cleared slice"),
            Err(e) => warn!(slice = %slice, error = %e, "Failed to clear slice"),
        }
    }
}

fn encode<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

fn log_fallback<T>(slice: Slice, loaded: Loaded<T>) -> T {
    match loaded.fallback_reason() {
        None => {}
        Some(FallbackReason::Missing) => debug!(slice = %slice, "Nothing stored, using default"),
        Some(reason) => warn!(slice = %slice, reason = ?reason, "Ignoring stored value, using default"),
    }
    loaded.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{apply, Action};
    use crate::storage::{MemoryStore, SqliteStore};
    use crate::types::TopicKey;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ========== decode_slice tests ==========

    #[test]
    fn test_decode_missing() {
        let loaded: Loaded<Vec<u32>> = decode_slice(None, Vec::new);
        assert_eq!(
            loaded,
            Loaded::Fallback {
                value: vec![],
                reason: FallbackReason::Missing
            }
        );
    }

    #[test]
    fn test_decode_malformed() {
        let loaded: Loaded<Vec<u32>> = decode_slice(Some("{not json"), Vec::new);
        assert!(matches!(
            loaded.fallback_reason(),
            Some(FallbackReason::Malformed(_))
        ));
        assert!(loaded.into_inner().is_empty());
    }

    #[test]
    fn test_decode_wrong_shape() {
        let loaded: Loaded<Vec<u32>> = decode_slice(Some(r#"{"a":1}"#), Vec::new);
        assert!(!loaded.is_stored());
    }

    #[test]
    fn test_decode_null_uses_fallback() {
        let loaded: Loaded<Vec<u32>> = decode_slice(Some("null"), Vec::new);
        assert!(!loaded.is_stored());
    }

    #[test]
    fn test_decode_valid() {
        let loaded: Loaded<Vec<u32>> = decode_slice(Some("[3,1]"), Vec::new);
        assert_eq!(loaded, Loaded::Stored(vec![3, 1]));
    }

    // ========== decode_mocks tests ==========

    #[test]
    fn test_decode_mocks_absent_generates_default() {
        let loaded = decode_mocks(None);
        assert_eq!(loaded.fallback_reason(), Some(&FallbackReason::Missing));
        assert_eq!(loaded.into_inner(), default_mocks());
    }

    #[test]
    fn test_decode_mocks_corrupt_generates_default() {
        assert_eq!(decode_mocks(Some("garbage")).into_inner(), default_mocks());
        assert_eq!(decode_mocks(Some(r#"{"id":1}"#)).into_inner(), default_mocks());
    }

    #[test]
    fn test_decode_mocks_empty_array_generates_default() {
        let loaded = decode_mocks(Some("[]"));
        assert_eq!(loaded.fallback_reason(), Some(&FallbackReason::Empty));
        assert_eq!(loaded.into_inner(), default_mocks());
    }

    #[test]
    fn test_decode_mocks_valid_list_unchanged() {
        let raw = r#"[{"id":1,"dateKey":"2026-03-01","done":true,"note":"fine"}]"#;
        let loaded = decode_mocks(Some(raw));

        assert!(loaded.is_stored());
        let mocks = loaded.into_inner();
        assert_eq!(mocks.len(), 1);
        assert_eq!(mocks[0].date, date(2026, 3, 1));
        assert!(mocks[0].done);
    }

    #[test]
    fn test_decode_mocks_null_fields_keep_list() {
        let raw = r#"[
            {"id":1,"dateKey":"2025-12-22","done":true,"note":null},
            {"id":2,"dateKey":"2025-12-25","done":true,"note":"ok"}
        ]"#;
        let loaded = decode_mocks(Some(raw));

        assert!(loaded.is_stored());
        let mocks = loaded.into_inner();
        assert_eq!(mocks.len(), 2);
        assert!(mocks.iter().all(|m| m.done));
        assert_eq!(mocks[0].note, "");
        assert_eq!(mocks[1].note, "ok");
    }

    #[test]
    fn test_decode_mocks_drops_only_unreadable_records() {
        let raw = r#"[
            {"id":1,"dateKey":"not a date","done":true},
            {"id":2,"dateKey":"2025-12-25","done":true}
        ]"#;
        let mocks = decode_mocks(Some(raw)).into_inner();

        assert_eq!(mocks.len(), 1);
        assert_eq!(mocks[0].id, 2);
    }

    #[test]
    fn test_decode_mocks_all_records_unreadable() {
        let loaded = decode_mocks(Some(r#"[1, "two"]"#));
        assert!(matches!(
            loaded.fallback_reason(),
            Some(FallbackReason::Malformed(_))
        ));
        assert_eq!(loaded.into_inner(), default_mocks());
    }

    #[test]
    fn test_should_persist_fallback() {
        assert!(decode_mocks(None).should_persist_fallback());
        assert!(decode_mocks(Some("[]")).should_persist_fallback());
        assert!(decode_mocks(Some("garbage")).should_persist_fallback());
        assert!(!decode_mocks(Some(r#"[{"id":1,"dateKey":"2025-12-22"}]"#))
            .should_persist_fallback());

        let unreadable: Loaded<Vec<MockExam>> = Loaded::Fallback {
            value: default_mocks(),
            reason: FallbackReason::Unreadable("busy".to_string()),
        };
        assert!(!unreadable.should_persist_fallback());
    }

    // ========== Persistence tests ==========

    #[test]
    fn test_load_state_from_empty_store() {
        let persistence = Persistence::new(MemoryStore::new());
        let state = persistence.load_state();

        assert!(state.subjects.is_empty());
        assert!(state.days.is_empty());
        assert_eq!(state.mocks, default_mocks());
    }

    #[test]
    fn test_regenerated_mocks_are_saved() {
        let persistence = Persistence::new(MemoryStore::new());
        persistence.load_state();

        assert!(persistence.load_mocks().is_stored());
    }

    #[test]
    fn test_load_state_keeps_mocks_with_null_note() {
        let raw = r#"[{"id":1,"dateKey":"2025-12-22","done":true,"note":null},{"id":2,"dateKey":"2025-12-25","done":true,"note":"ok"}]"#;
        let persistence = Persistence::new(MemoryStore::new().with("mocks", raw));

        let state = persistence.load_state();
        assert_eq!(state.mocks.len(), 2);
        assert_eq!(state.mocks.iter().filter(|m| m.done).count(), 2);

        // The stored list was not replaced by the generated one
        let stored = persistence.store.get("mocks").unwrap();
        assert_eq!(stored.as_deref(), Some(raw));
    }

    #[test]
    fn test_read_error_does_not_overwrite_mocks() {
        let raw = r#"[{"id":1,"dateKey":"2025-12-22","done":true,"note":"72/100"}]"#;
        // Every read made by load_state fails, later reads succeed
        let store = MemoryStore::new()
            .with("mocks", raw)
            .failing_next_reads(Slice::ALL.len());
        let persistence = Persistence::new(store);

        let state = persistence.load_state();
        assert_eq!(state.mocks, default_mocks());

        let mocks = persistence.load_mocks();
        assert!(mocks.is_stored());
        let mocks = mocks.into_inner();
        assert_eq!(mocks.len(), 1);
        assert!(mocks[0].done);
        assert_eq!(mocks[0].note, "72/100");
    }

    #[test]
    fn test_bad_keys_do_not_reset_slice() {
        let store = MemoryStore::new()
            .with("completedDays", r#"{"2025-11-27":true,"someday":true}"#)
            .with("completedTopics", r#"{"1-0":true,"1-x":true}"#)
            .with("topicNotes", r#"{"2-1":"review","+2-1":"shadow"}"#);
        let persistence = Persistence::new(store);

        let state = persistence.load_state();
        assert!(state.days.is_done(&date(2025, 11, 27)));
        assert_eq!(state.days.len(), 1);
        assert!(state.topics.is_done(&TopicKey::new(1, 0)));
        assert_eq!(state.notes.get(&TopicKey::new(2, 1)), "review");

        // The next save keeps the good entries
        let state = apply(
            state,
            Action::ToggleDay {
                date: date(2025, 11, 28),
            },
        );
        persistence.save(Slice::Days, &state);
        let days = persistence.load_days().into_inner();
        assert!(days.is_done(&date(2025, 11, 27)));
        assert!(days.is_done(&date(2025, 11, 28)));
    }

    #[test]
    fn test_corrupt_slice_does_not_reset_others() {
        let store = MemoryStore::new()
            .with("completedSubjects", "[1,2]")
            .with("completedTopics", "oops")
            .with("completedDays", r#"{"2025-11-27":true}"#);
        let persistence = Persistence::new(store);

        let state = persistence.load_state();
        assert!(state.subjects.contains(1) && state.subjects.contains(2));
        assert!(state.days.is_done(&date(2025, 11, 27)));
        assert_eq!(state.topics, TopicCompletion::default());
    }

    #[test]
    fn test_mock_roundtrip_keeps_mutations() {
        let persistence = Persistence::new(MemoryStore::new());
        let state = persistence.load_state();

        let state = apply(state, Action::ToggleMock { id: 3 });
        let state = apply(
            state,
            Action::SetMockNote {
                id: 3,
                text: "ran out of time on COA".to_string(),
            },
        );
        persistence.save(Slice::Mocks, &state);

        let reloaded = persistence.load_state();
        assert_eq!(reloaded.mocks, state.mocks);
        assert!(reloaded.mocks[2].done);
        assert_eq!(reloaded.mocks[2].note, "ran out of time on COA");
    }

    #[test]
    fn test_save_all_then_load_state() {
        let persistence = Persistence::new(MemoryStore::new());
        let state = persistence.load_state();
        let state = apply(state, Action::ToggleSubject { number: 6 });
        let state = apply(state, Action::ToggleTopic { subject: 6, topic: 2 });
        let state = apply(
            state,
            Action::SetTopicNote {
                subject: 6,
                topic: 2,
                text: "heapify is O(n)".to_string(),
            },
        );
        let state = apply(
            state,
            Action::ToggleDay {
                date: date(2025, 12, 19),
            },
        );

        persistence.save_all(&state);
        assert_eq!(persistence.load_state(), state);
    }

    #[test]
    fn test_save_failure_is_swallowed() {
        let persistence = Persistence::new(MemoryStore::rejecting_writes());
        let state = persistence.load_state();
        let state = apply(state, Action::ToggleSubject { number: 1 });

        // Must not panic; state in memory is unaffected
        persistence.save(Slice::Subjects, &state);
        persistence.clear(Slice::Days);
        assert!(state.subjects.contains(1));
        assert!(!persistence.load_subjects().is_stored());
    }

    #[test]
    fn test_clear_removes_key() {
        let store = MemoryStore::new().with("completedDays", r#"{"2025-11-27":true}"#);
        let persistence = Persistence::new(store);

        persistence.clear(Slice::Days);
        assert_eq!(
            persistence.load_days().fallback_reason(),
            Some(&FallbackReason::Missing)
        );
    }

    #[test]
    fn test_legacy_mock_field_is_loaded() {
        let store = MemoryStore::new().with(
            "mocks",
            r#"[{"id":1,"dateISO":"2025-12-22","done":true,"note":""}]"#,
        );
        let persistence = Persistence::new(store);

        let mocks = persistence.load_mocks();
        assert!(mocks.is_stored());
        assert!(mocks.into_inner()[0].done);
    }

    #[test]
    fn test_sqlite_backed_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("ripasso.db");

        {
            let persistence = Persistence::new(SqliteStore::open(&db_path).unwrap());
            let state = persistence.load_state();
            let state = apply(
                state,
                Action::ToggleDay {
                    date: date(2025, 11, 28),
                },
            );
            persistence.save(Slice::Days, &state);
        }

        let persistence = Persistence::new(SqliteStore::open(&db_path).unwrap());
        let state = persistence.load_state();
        assert!(state.days.is_done(&date(2025, 11, 28)));
        assert_eq!(state.mocks.len(), 23);
    }

    #[test]
    fn test_slice_keys() {
        let keys: Vec<&str> = Slice::ALL.iter().map(|s| s.storage_key()).collect();
        assert_eq!(
            keys,
            vec![
                "completedSubjects",
                "completedTopics",
                "completedDays",
                "topicNotes",
                "mocks"
            ]
        );
    }
}
