use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{LearnerProgress, Question, QuizToken, Subject};
use exam_core::QuizResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("conflict: the record changed or no longer exists")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of an exam in progress.
///
/// The question list is frozen at start so a resumed exam shows the same
/// questions in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveQuizRecord {
    pub learner: String,
    pub token: QuizToken,
    pub subject: Subject,
    pub questions: Vec<Question>,
    pub time_limit_secs: u32,
    pub started_at: DateTime<Utc>,
}

/// Persisted shape of a submitted exam.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub id: Option<i64>,
    pub learner: String,
    pub token: QuizToken,
    pub completed_at: DateTime<Utc>,
    pub result: QuizResult,
}

impl AttemptRecord {
    #[must_use]
    pub fn new(
        learner: impl Into<String>,
        token: QuizToken,
        completed_at: DateTime<Utc>,
        result: QuizResult,
    ) -> Self {
        Self {
            id: None,
            learner: learner.into(),
            token,
            completed_at,
            result,
        }
    }
}

/// Everything written when an exam is submitted.
///
/// Stored all-or-nothing: the attempt is appended, the learner's progress for
/// the subject replaced, and the active exam and its snapshot dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionCommit {
    pub attempt: AttemptRecord,
    pub subject_code: String,
    pub progress: LearnerProgress,
}

/// At most one exam in progress per learner.
#[async_trait]
pub trait ActiveQuizRepository: Send + Sync {
    /// Store the learner's active exam, replacing any previous one.
    ///
    /// Returns the token of the replaced exam when it differs from the new one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn save_active(
        &self,
        record: &ActiveQuizRecord,
    ) -> Result<Option<QuizToken>, StorageError>;

    /// Fetch the learner's active exam if its token matches.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_active(
        &self,
        learner: &str,
        token: QuizToken,
    ) -> Result<Option<ActiveQuizRecord>, StorageError>;
}

/// Opaque key/value store for resumable session snapshots.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the payload cannot be stored.
    async fn save_snapshot(&self, token: QuizToken, payload: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_snapshot(&self, token: QuizToken) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn clear_snapshot(&self, token: QuizToken) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_progress(
        &self,
        learner: &str,
        subject_code: &str,
    ) -> Result<Option<LearnerProgress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the progress cannot be stored.
    async fn save_progress(
        &self,
        learner: &str,
        subject_code: &str,
        progress: &LearnerProgress,
    ) -> Result<(), StorageError>;
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append a submitted exam and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError>;

    /// Store a submission atomically and return the attempt's row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict`, with nothing written, if the exam is
    /// no longer the learner's active exam. Other errors also leave storage
    /// untouched.
    async fn commit_submission(&self, submission: &SubmissionCommit) -> Result<i64, StorageError>;

    /// Most recent attempts first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_attempts(
        &self,
        learner: &str,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    active: Arc<Mutex<HashMap<String, ActiveQuizRecord>>>,
    snapshots: Arc<Mutex<HashMap<QuizToken, String>>>,
    progress: Arc<Mutex<HashMap<(String, String), LearnerProgress>>>,
    attempts: Arc<Mutex<Vec<AttemptRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ActiveQuizRepository for InMemoryRepository {
    async fn save_active(
        &self,
        record: &ActiveQuizRecord,
    ) -> Result<Option<QuizToken>, StorageError> {
        let mut guard = self.active.lock().map_err(poisoned)?;
        let replaced = guard.insert(record.learner.clone(), record.clone());
        Ok(replaced
            .map(|previous| previous.token)
            .filter(|token| *token != record.token))
    }

    async fn get_active(
        &self,
        learner: &str,
        token: QuizToken,
    ) -> Result<Option<ActiveQuizRecord>, StorageError> {
        let guard = self.active.lock().map_err(poisoned)?;
        Ok(guard.get(learner).filter(|r| r.token == token).cloned())
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryRepository {
    async fn save_snapshot(&self, token: QuizToken, payload: &str) -> Result<(), StorageError> {
        let mut guard = self.snapshots.lock().map_err(poisoned)?;
        guard.insert(token, payload.to_owned());
        Ok(())
    }

    async fn load_snapshot(&self, token: QuizToken) -> Result<Option<String>, StorageError> {
        let guard = self.snapshots.lock().map_err(poisoned)?;
        Ok(guard.get(&token).cloned())
    }

    async fn clear_snapshot(&self, token: QuizToken) -> Result<(), StorageError> {
        let mut guard = self.snapshots.lock().map_err(poisoned)?;
        guard.remove(&token);
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        learner: &str,
        subject_code: &str,
    ) -> Result<Option<LearnerProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard
            .get(&(learner.to_owned(), subject_code.to_owned()))
            .cloned())
    }

    async fn save_progress(
        &self,
        learner: &str,
        subject_code: &str,
        progress: &LearnerProgress,
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.insert(
            (learner.to_owned(), subject_code.to_owned()),
            progress.clone(),
        );
        Ok(())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        let id = i64::try_from(guard.len() + 1)
            .map_err(|_| StorageError::Serialization("attempt id overflow".into()))?;
        let mut stored = attempt.clone();
        stored.id = Some(id);
        guard.push(stored);
        Ok(id)
    }

    async fn commit_submission(&self, submission: &SubmissionCommit) -> Result<i64, StorageError> {
        let attempt = &submission.attempt;
        let mut active = self.active.lock().map_err(poisoned)?;
        let mut snapshots = self.snapshots.lock().map_err(poisoned)?;
        let mut progress = self.progress.lock().map_err(poisoned)?;
        let mut attempts = self.attempts.lock().map_err(poisoned)?;

        let is_active = active
            .get(&attempt.learner)
            .is_some_and(|r| r.token == attempt.token);
        if !is_active {
            return Err(StorageError::Conflict);
        }
        let id = i64::try_from(attempts.len() + 1)
            .map_err(|_| StorageError::Serialization("attempt id overflow".into()))?;

        active.remove(&attempt.learner);
        snapshots.remove(&attempt.token);
        progress.insert(
            (attempt.learner.clone(), submission.subject_code.clone()),
            submission.progress.clone(),
        );
        let mut stored = attempt.clone();
        stored.id = Some(id);
        attempts.push(stored);
        Ok(id)
    }

    async fn list_attempts(
        &self,
        learner: &str,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut out: Vec<_> = guard
            .iter()
            .filter(|a| a.learner == learner)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(b.id.cmp(&a.id)));
        out.truncate(limit);
        Ok(out)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub active: Arc<dyn ActiveQuizRepository>,
    pub snapshots: Arc<dyn SnapshotRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            active: Arc::new(repo.clone()),
            snapshots: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            attempts: Arc::new(repo),
        }
    }
}
