use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use exam_core::model::{QuizToken, Subject};
use exam_core::{QuizResult, grade};
use storage::repository::{
    ActiveQuizRecord, ActiveQuizRepository, AttemptRecord, AttemptRepository, ProgressRepository,
    SnapshotRepository, Storage, StorageError, SubmissionCommit,
};

use super::plan::ExamBuilder;
use super::session::ExamSession;
use super::view::{AttemptListItem, TimerTick};
use crate::Clock;
use crate::bank::QuestionBank;
use crate::error::SessionError;

pub const DEFAULT_QUESTION_COUNT: usize = 50;
pub const DEFAULT_TIME_LIMIT_MINUTES: u32 = 30;

/// Parameters for a new exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamConfig {
    pub learner: String,
    pub subject: Subject,
    pub question_count: usize,
    pub time_limit_minutes: u32,
    pub shuffle_options: bool,
}

impl ExamConfig {
    pub fn new(learner: impl Into<String>, subject: Subject) -> Self {
        Self {
            learner: learner.into(),
            subject,
            question_count: DEFAULT_QUESTION_COUNT,
            time_limit_minutes: DEFAULT_TIME_LIMIT_MINUTES,
            shuffle_options: false,
        }
    }

    #[must_use]
    pub fn with_question_count(mut self, count: usize) -> Self {
        self.question_count = count;
        self
    }

    #[must_use]
    pub fn with_time_limit_minutes(mut self, minutes: u32) -> Self {
        self.time_limit_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_shuffle_options(mut self, shuffle: bool) -> Self {
        self.shuffle_options = shuffle;
        self
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_minutes.saturating_mul(60)
    }
}

/// Result of submitting an exam.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub attempt_id: i64,
    pub result: QuizResult,
    /// Set when the submission was forced by the countdown.
    pub expired: bool,
}

/// Orchestrates exam start, resume, persistence, and submission.
#[derive(Clone)]
pub struct ExamLoopService {
    clock: Clock,
    active: Arc<dyn ActiveQuizRepository>,
    snapshots: Arc<dyn SnapshotRepository>,
    progress: Arc<dyn ProgressRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl ExamLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        active: Arc<dyn ActiveQuizRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
        progress: Arc<dyn ProgressRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            active,
            snapshots,
            progress,
            attempts,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.active),
            Arc::clone(&storage.snapshots),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.attempts),
        )
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Start a new exam drawn from `bank`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no question can be selected, or
    /// storage errors.
    pub async fn start_exam(
        &self,
        bank: &QuestionBank,
        config: &ExamConfig,
    ) -> Result<ExamSession, SessionError> {
        let mut rng = StdRng::from_os_rng();
        self.start_exam_with_rng(bank, config, &mut rng).await
    }

    /// Same as [`ExamLoopService::start_exam`] with a caller-provided RNG.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no question can be selected, or
    /// storage errors.
    pub async fn start_exam_with_rng<R: Rng + Send + ?Sized>(
        &self,
        bank: &QuestionBank,
        config: &ExamConfig,
        rng: &mut R,
    ) -> Result<ExamSession, SessionError> {
        let code = config.subject.code.as_str();
        let mut progress = self
            .progress
            .get_progress(&config.learner, code)
            .await?
            .unwrap_or_default();

        let plan = ExamBuilder::new(bank.questions())
            .with_shuffle_options(config.shuffle_options)
            .build(&mut progress, config.question_count, rng);
        if plan.is_empty() {
            return Err(SessionError::Empty);
        }
        if plan.bag_refilled {
            self.progress
                .save_progress(&config.learner, code, &progress)
                .await?;
        }
        debug!(
            penalty = plan.penalty_selected,
            bag = plan.bag_selected,
            random = plan.random_selected,
            "selected exam questions"
        );

        let record = ActiveQuizRecord {
            learner: config.learner.clone(),
            token: QuizToken::generate(),
            subject: config.subject.clone(),
            questions: plan.questions,
            time_limit_secs: config.time_limit_secs(),
            started_at: self.clock.now(),
        };
        if let Some(replaced) = self.active.save_active(&record).await? {
            self.snapshots.clear_snapshot(replaced).await?;
            info!(learner = %record.learner, token = %replaced, "unfinished exam replaced");
        }

        let session = ExamSession::start(
            record.learner,
            record.token,
            record.subject,
            record.questions,
            record.time_limit_secs,
            record.started_at,
        )?;
        self.persist(&session).await?;

        info!(
            learner = %session.learner(),
            token = %session.token(),
            questions = session.total_questions(),
            "exam started"
        );
        Ok(session)
    }

    /// Reopen the learner's active exam, restoring its snapshot when one is stored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if the learner has no active exam
    /// with this token, or storage errors.
    pub async fn resume_exam(
        &self,
        learner: &str,
        token: QuizToken,
    ) -> Result<ExamSession, SessionError> {
        let record = self
            .active
            .get_active(learner, token)
            .await?
            .ok_or(SessionError::NotFound)?;
        let payload = self.snapshots.load_snapshot(token).await?;
        let session = ExamSession::resume(record, payload.as_deref())?;
        info!(
            learner,
            token = %token,
            position = session.current_index(),
            "exam resumed"
        );
        Ok(session)
    }

    /// Save the session's resumable snapshot, replacing the previous one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if encoding or storage fails.
    pub async fn persist(&self, session: &ExamSession) -> Result<(), SessionError> {
        let payload = session.snapshot().encode()?;
        self.snapshots
            .save_snapshot(session.token(), &payload)
            .await?;
        Ok(())
    }

    /// Timer state of `session` according to the service clock.
    #[must_use]
    pub fn tick(&self, session: &ExamSession) -> TimerTick {
        session.tick(self.clock.now())
    }

    /// Grade and record the exam, then drop its active record and snapshot.
    ///
    /// The attempt, the progress update, and the cleanup are stored in one
    /// commit, so a failed submission can be retried without counting misses
    /// twice.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if the exam was already submitted or
    /// replaced, or `SessionError::Storage` if the commit fails.
    pub async fn submit(&self, session: ExamSession) -> Result<SubmitOutcome, SessionError> {
        let now = self.clock.now();
        let submission = session.finish(now);
        let result = grade(
            &submission.questions,
            &submission.answers,
            &submission.subject,
            submission.time_taken_secs,
        );

        let code = submission.subject.code.as_str();
        let mut progress = self
            .progress
            .get_progress(&submission.learner, code)
            .await?
            .unwrap_or_default();
        progress.apply_result(&result);

        let commit = SubmissionCommit {
            attempt: AttemptRecord::new(
                submission.learner.clone(),
                submission.token,
                now,
                result.clone(),
            ),
            subject_code: code.to_owned(),
            progress,
        };
        let attempt_id = self
            .attempts
            .commit_submission(&commit)
            .await
            .map_err(|err| match err {
                StorageError::Conflict => SessionError::NotFound,
                other => SessionError::Storage(other),
            })?;

        info!(
            learner = %submission.learner,
            token = %submission.token,
            score = result.score,
            expired = submission.expired,
            "exam submitted"
        );

        Ok(SubmitOutcome {
            attempt_id,
            result,
            expired: submission.expired,
        })
    }

    /// Most recent submitted exams for `learner`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on read failures.
    pub async fn history(
        &self,
        learner: &str,
        limit: u32,
    ) -> Result<Vec<AttemptListItem>, SessionError> {
        let records = self.attempts.list_attempts(learner, limit).await?;
        Ok(records.iter().map(AttemptListItem::from_record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let cfg = ExamConfig::new("anonymous", Subject::from_code("AIL303m"));
        assert_eq!(cfg.question_count, 50);
        assert_eq!(cfg.time_limit_secs(), 1800);
        assert!(!cfg.shuffle_options);
    }

    #[test]
    fn config_builders() {
        let cfg = ExamConfig::new("ana", Subject::from_code("S"))
            .with_question_count(5)
            .with_time_limit_minutes(2)
            .with_shuffle_options(true);
        assert_eq!(cfg.question_count, 5);
        assert_eq!(cfg.time_limit_secs(), 120);
        assert!(cfg.shuffle_options);
    }
}
