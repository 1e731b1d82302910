//! The note entity and its persisted wire form.

use crate::lock;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Opaque identifier for a note, unique within a collection.
///
/// Ids are minted from the creation timestamp plus a process-local counter, so
/// notes created in the same millisecond still get distinct ids.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub(crate) fn generate(created_at: DateTime<Utc>) -> Self {
        static NEXT_SEQ: AtomicU32 = AtomicU32::new(1);
        // Relaxed ordering: only atomicity is needed, not synchronization.
        let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
        NoteId(format!("{}-{}", created_at.timestamp_millis(), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        NoteId(value)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        NoteId(value.to_owned())
    }
}

/// A time-locked note.
///
/// The persisted form is a camelCase JSON object: dates as `YYYY-MM-DD`, times
/// of day as `HH:MM`, timestamps as ISO-8601. `isUnlocked` is a cache of the
/// last lock evaluation and is recomputed on load and on every listing; it must
/// never be trusted on its own to gate access to `content`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    /// Stored in plaintext; hiding it is purely a presentation concern.
    pub content: String,
    pub unlock_date: NaiveDate,
    #[serde(with = "time_hm", default = "lock::default_unlock_time")]
    pub unlock_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_unlocked: bool,
}

impl Note {
    /// The instant, in the local timezone, at which this note unlocks.
    pub fn unlock_instant(&self) -> NaiveDateTime {
        lock::unlock_instant(self.unlock_date, self.unlock_time)
    }
}

/// Creation input for [`CapsuleStore::create`](crate::CapsuleStore::create).
///
/// Deserializable from the same camelCase wire form as [`Note`], so a UI form
/// can hand its JSON over directly. A missing or malformed `unlockDate` fails
/// here, at deserialization; emptiness of title and content is checked by the
/// store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub unlock_date: NaiveDate,
    #[serde(default, deserialize_with = "time_hm::deserialize_opt")]
    pub unlock_time: Option<NaiveTime>,
}

impl NoteDraft {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        unlock_date: NaiveDate,
        unlock_time: Option<NaiveTime>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            unlock_date,
            unlock_time,
        }
    }
}

/// Serde adapter for the `HH:MM` time-of-day wire form.
mod time_hm {
    use crate::lock;
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        // Data written before a time-of-day was chosen may carry an empty
        // string; it means the same thing as an absent field.
        if raw.is_empty() {
            return Ok(lock::default_unlock_time());
        }
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(de::Error::custom)
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.filter(|raw| !raw.is_empty())
            .map(|raw| NaiveTime::parse_from_str(&raw, FORMAT).map_err(de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_test::{assert_tokens, Token};

    fn sample_note() -> Note {
        Note {
            id: NoteId::from("1700000000000-1"),
            title: "Future Me".to_string(),
            content: "Hi".to_string(),
            unlock_date: NaiveDate::from_ymd_opt(2031, 5, 1).unwrap(),
            unlock_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            created_at: Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap(),
            is_unlocked: false,
        }
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let created_at = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
        let a = NoteId::generate(created_at);
        let b = NoteId::generate(created_at);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with(&created_at.timestamp_millis().to_string()));
    }

    #[test]
    fn test_note_wire_format() {
        assert_tokens(
            &sample_note(),
            &[
                Token::Struct {
                    name: "Note",
                    len: 7,
                },
                Token::Str("id"),
                Token::Str("1700000000000-1"),
                Token::Str("title"),
                Token::Str("Future Me"),
                Token::Str("content"),
                Token::Str("Hi"),
                Token::Str("unlockDate"),
                Token::Str("2031-05-01"),
                Token::Str("unlockTime"),
                Token::Str("09:00"),
                Token::Str("createdAt"),
                Token::Str("2026-08-07T12:00:00Z"),
                Token::Str("isUnlocked"),
                Token::Bool(false),
                Token::StructEnd,
            ],
        );
    }

    #[test]
    fn test_missing_unlock_time_defaults_to_midnight() {
        let note: Note = serde_json::from_str(
            r#"{
                "id": "1700000000000-9",
                "title": "t",
                "content": "c",
                "unlockDate": "2031-05-01",
                "createdAt": "2026-08-07T12:00:00Z",
                "isUnlocked": true
            }"#,
        )
        .unwrap();
        assert_eq!(note.unlock_time, NaiveTime::MIN);
    }

    #[test]
    fn test_empty_unlock_time_means_midnight() {
        let note: Note = serde_json::from_str(
            r#"{
                "id": "1700000000000-9",
                "title": "t",
                "content": "c",
                "unlockDate": "2031-05-01",
                "unlockTime": "",
                "createdAt": "2026-08-07T12:00:00Z",
                "isUnlocked": false
            }"#,
        )
        .unwrap();
        assert_eq!(note.unlock_time, NaiveTime::MIN);
    }

    #[test]
    fn test_draft_from_form_json() {
        let draft: NoteDraft = serde_json::from_str(
            r#"{"title": "Future Me", "content": "Hi", "unlockDate": "2031-05-01", "unlockTime": "09:00"}"#,
        )
        .unwrap();
        assert_eq!(draft.unlock_date, NaiveDate::from_ymd_opt(2031, 5, 1).unwrap());
        assert_eq!(draft.unlock_time, NaiveTime::from_hms_opt(9, 0, 0));

        let draft: NoteDraft =
            serde_json::from_str(r#"{"title": "t", "content": "c", "unlockDate": "2031-05-01"}"#)
                .unwrap();
        assert_eq!(draft.unlock_time, None);
    }

    #[test]
    fn test_draft_rejects_empty_unlock_date() {
        let result: Result<NoteDraft, _> =
            serde_json::from_str(r#"{"title": "t", "content": "c", "unlockDate": ""}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unlock_instant_combines_date_and_time() {
        let note = sample_note();
        assert_eq!(
            note.unlock_instant(),
            NaiveDate::from_ymd_opt(2031, 5, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap()
        );
    }
}
