use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AnswerOption, AnswerSheet};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("snapshot could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Resumable exam state, stored as JSON between page visits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub answers: Vec<Option<Vec<AnswerOption>>>,
    pub start_time: DateTime<Utc>,
    pub time_limit_secs: u32,
    #[serde(default)]
    pub current_index: Option<i64>,
}

/// Answers and cursor recovered from a snapshot for a known question count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredState {
    pub answers: AnswerSheet,
    pub current_index: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub time_limit_secs: u32,
}

impl SessionSnapshot {
    /// # Errors
    ///
    /// Returns `SnapshotError::Decode` for malformed payloads.
    pub fn decode(payload: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(payload).map_err(SnapshotError::Decode)
    }

    /// # Errors
    ///
    /// Returns `SnapshotError::Encode` if serialization fails.
    pub fn encode(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(SnapshotError::Encode)
    }

    /// Map the snapshot onto an exam with `question_count` questions.
    ///
    /// An answer list whose length does not match is discarded; the cursor
    /// is passed through untouched because the ring ignores invalid positions.
    #[must_use]
    pub fn restore(self, question_count: usize) -> RestoredState {
        let answers = if self.answers.len() == question_count {
            AnswerSheet::from_slots(self.answers)
        } else {
            AnswerSheet::new(question_count)
        };
        RestoredState {
            answers,
            current_index: self.current_index,
            start_time: self.start_time,
            time_limit_secs: self.time_limit_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn snapshot(answers: usize) -> SessionSnapshot {
        SessionSnapshot {
            answers: (0..answers)
                .map(|i| (i % 2 == 0).then(|| vec![AnswerOption::text(format!("a{i}"))]))
                .collect(),
            start_time: fixed_now(),
            time_limit_secs: 1800,
            current_index: Some(2),
        }
    }

    #[test]
    fn encodes_with_camel_case_keys() {
        let json = snapshot(1).encode().unwrap();
        assert!(json.contains("\"startTime\""));
        assert!(json.contains("\"timeLimitSecs\":1800"));
        assert!(json.contains("\"currentIndex\":2"));
        assert_eq!(SessionSnapshot::decode(&json).unwrap(), snapshot(1));
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        assert!(matches!(
            SessionSnapshot::decode("{not json"),
            Err(SnapshotError::Decode(_))
        ));
        assert!(SessionSnapshot::decode(r#"{"answers":[]}"#).is_err());
    }

    #[test]
    fn mismatched_answer_count_falls_back_to_empty_sheet() {
        let restored = snapshot(3).restore(5);
        assert_eq!(restored.answers.len(), 5);
        assert_eq!(restored.answers.answered_count(), 0);
        assert_eq!(restored.current_index, Some(2));
    }

    #[test]
    fn matching_answer_count_is_kept() {
        let restored = snapshot(4).restore(4);
        assert_eq!(restored.answers.answered_count(), 2);
    }

    #[test]
    fn missing_index_decodes_as_none() {
        let json = format!(
            r#"{{"answers":[null],"startTime":"{}","timeLimitSecs":60}}"#,
            fixed_now().to_rfc3339()
        );
        let snap = SessionSnapshot::decode(&json).unwrap();
        assert_eq!(snap.current_index, None);
    }
}
