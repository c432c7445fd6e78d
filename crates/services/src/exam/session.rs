use chrono::{DateTime, Utc};
use tracing::warn;

use exam_core::model::{AnswerOption, AnswerSheet, Question, QuizToken, SessionSnapshot, Subject};
use exam_core::{Countdown, QuestionRing};
use storage::repository::ActiveQuizRecord;

use super::view::{CurrentQuestion, ExamProgress, TimerTick};
use crate::error::SessionError;

/// Everything handed to grading when an exam ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub learner: String,
    pub token: QuizToken,
    pub subject: Subject,
    pub questions: Vec<Question>,
    pub answers: AnswerSheet,
    pub time_taken_secs: i64,
    /// Set when the countdown had already run out at submission time.
    pub expired: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Live state of one exam: the question ring, the answers, and the countdown.
///
/// The session is the single owner of the ring for its whole lifetime and
/// is consumed by [`ExamSession::finish`].
#[derive(Debug, Clone)]
pub struct ExamSession {
    learner: String,
    token: QuizToken,
    subject: Subject,
    ring: QuestionRing,
    answers: AnswerSheet,
    countdown: Countdown,
}

impl ExamSession {
    /// Start a fresh exam over `questions`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if `questions` is empty.
    pub fn start(
        learner: impl Into<String>,
        token: QuizToken,
        subject: Subject,
        questions: Vec<Question>,
        time_limit_secs: u32,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let ring = QuestionRing::new(questions)?;
        let answers = AnswerSheet::new(ring.len());
        Ok(Self {
            learner: learner.into(),
            token,
            subject,
            ring,
            answers,
            countdown: Countdown::from_secs(started_at, time_limit_secs),
        })
    }

    /// Rebuild a session from its active record and an optional snapshot payload.
    ///
    /// A payload that cannot be decoded is logged and ignored: the exam
    /// resumes with no answers at position 0. Start time and limit always come
    /// from the active record.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the record holds no questions.
    pub fn resume(record: ActiveQuizRecord, snapshot: Option<&str>) -> Result<Self, SessionError> {
        let mut session = Self::start(
            record.learner,
            record.token,
            record.subject,
            record.questions,
            record.time_limit_secs,
            record.started_at,
        )?;

        let Some(payload) = snapshot else {
            return Ok(session);
        };

        match SessionSnapshot::decode(payload) {
            Ok(snapshot) => {
                let restored = snapshot.restore(session.ring.len());
                session.answers = restored.answers;
                if let Some(index) = restored.current_index {
                    session.ring.jump_to_persisted(index);
                    if session.ring.current_index() == 0 && index != 0 {
                        warn!(token = %session.token, index, "stored position out of range");
                    }
                }
            }
            Err(err) => {
                warn!(token = %session.token, error = %err, "discarding unreadable snapshot");
            }
        }

        Ok(session)
    }

    #[must_use]
    pub fn learner(&self) -> &str {
        &self.learner
    }

    #[must_use]
    pub fn token(&self) -> QuizToken {
        self.token
    }

    #[must_use]
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    #[must_use]
    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.ring.current_index()
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        self.ring.current_question()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        self.ring.questions()
    }

    /// Show the next question, wrapping after the last one.
    pub fn next(&mut self) -> usize {
        self.ring.advance()
    }

    /// Show the previous question, wrapping before the first one.
    pub fn prev(&mut self) -> usize {
        self.ring.retreat()
    }

    /// Show question `index`; unknown positions are ignored.
    pub fn jump_to(&mut self, index: usize) {
        self.ring.jump_to(index);
    }

    /// Replace the selection for the current question with the options
    /// labelled by `letters`. An empty slice clears the answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownOption` if a letter has no option.
    pub fn select_letters(&mut self, letters: &[char]) -> Result<(), SessionError> {
        let question = self.ring.current_question();
        let mut selection: Vec<AnswerOption> = Vec::with_capacity(letters.len());
        for &letter in letters {
            let option = question
                .option_by_letter(letter)
                .ok_or(SessionError::UnknownOption(letter))?;
            if !selection.contains(option) {
                selection.push(option.clone());
            }
        }
        let index = self.ring.current_index();
        self.answers.set(index, selection)?;
        Ok(())
    }

    /// Clear the answer of the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Answer` if the sheet and ring disagree on size.
    pub fn clear_current(&mut self) -> Result<(), SessionError> {
        let index = self.ring.current_index();
        self.answers.clear(index)?;
        Ok(())
    }

    #[must_use]
    pub fn current(&self) -> CurrentQuestion {
        let index = self.ring.current_index();
        let question = self.ring.current_question().clone();
        let selected = self
            .answers
            .get(index)
            .map(|sel| question.letters_of(sel))
            .unwrap_or_default();
        CurrentQuestion {
            index,
            number: index + 1,
            total: self.ring.len(),
            required_selections: question.required_selections(),
            question,
            selected,
        }
    }

    #[must_use]
    pub fn progress(&self) -> ExamProgress {
        ExamProgress {
            total: self.ring.len(),
            answered: self.answers.answered_count(),
            percent: self.answers.progress_percent(),
        }
    }

    /// Resumable state for persistence.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            answers: self.answers.slots().to_vec(),
            start_time: self.countdown.started_at(),
            time_limit_secs: self.countdown.limit_secs(),
            current_index: i64::try_from(self.ring.current_index()).ok(),
        }
    }

    /// Timer state at `now`.
    #[must_use]
    pub fn tick(&self, now: DateTime<Utc>) -> TimerTick {
        TimerTick {
            remaining_secs: self.countdown.remaining_secs(now),
            display: self.countdown.format_mmss(now),
            expired: self.countdown.is_expired(now),
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.countdown.is_expired(now)
    }

    /// End the exam and hand over everything needed for grading.
    #[must_use]
    pub fn finish(self, now: DateTime<Utc>) -> Submission {
        Submission {
            expired: self.countdown.is_expired(now),
            time_taken_secs: self.countdown.elapsed_secs(now),
            learner: self.learner,
            token: self.token,
            subject: self.subject,
            questions: self.ring.into_questions(),
            answers: self.answers,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
