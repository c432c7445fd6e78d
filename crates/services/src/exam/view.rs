use chrono::{DateTime, Utc};

use exam_core::model::Question;
use storage::repository::AttemptRecord;

/// What the front-end needs to render the question under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentQuestion {
    pub index: usize,
    /// 1-based position for display.
    pub number: usize,
    pub total: usize,
    pub question: Question,
    pub required_selections: usize,
    /// Letters of the options currently selected, in option order.
    pub selected: Vec<char>,
}

/// Aggregated answering progress, useful for a progress bar.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamProgress {
    pub total: usize,
    pub answered: usize,
    pub percent: f64,
}

/// Countdown state at one timer tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerTick {
    pub remaining_secs: i64,
    pub display: String,
    pub expired: bool,
}

/// Presentation-agnostic list item for a submitted exam.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptListItem {
    pub id: Option<i64>,
    pub completed_at: DateTime<Utc>,
    pub subject_code: String,
    pub score: f64,
    pub correct_count: u32,
    pub total_questions: u32,
    pub time_taken_secs: i64,
}

impl AttemptListItem {
    #[must_use]
    pub fn from_record(record: &AttemptRecord) -> Self {
        Self {
            id: record.id,
            completed_at: record.completed_at,
            subject_code: record.result.subject.code.clone(),
            score: record.result.score,
            correct_count: record.result.correct_count,
            total_questions: record.result.total_questions,
            time_taken_secs: record.result.time_taken_secs,
        }
    }
}
