use async_trait::async_trait;
use exam_core::QuizResult;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, from_json, ser, to_json, token_from_str};
use super::progress_repo::upsert_progress;
use crate::repository::{AttemptRecord, AttemptRepository, StorageError, SubmissionCommit};

async fn insert_attempt<'c, E>(executor: E, attempt: &AttemptRecord) -> Result<i64, StorageError>
where
    E: sqlx::Executor<'c, Database = sqlx::Sqlite>,
{
    let res = sqlx::query(
        r"
            INSERT INTO attempts (
                learner, token, subject_code, score,
                time_taken_secs, completed_at, result
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
    )
    .bind(&attempt.learner)
    .bind(attempt.token.to_string())
    .bind(&attempt.result.subject.code)
    .bind(attempt.result.score)
    .bind(attempt.result.time_taken_secs)
    .bind(attempt.completed_at)
    .bind(to_json(&attempt.result)?)
    .execute(executor)
    .await
    .map_err(conn)?;

    Ok(res.last_insert_rowid())
}

fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptRecord, StorageError> {
    let token: String = row.try_get("token").map_err(ser)?;
    let result: String = row.try_get("result").map_err(ser)?;
    let result: QuizResult = from_json("result", &result)?;

    Ok(AttemptRecord {
        id: Some(row.try_get("id").map_err(ser)?),
        learner: row.try_get("learner").map_err(ser)?,
        token: token_from_str(&token)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        result,
    })
}

#[async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        insert_attempt(&self.pool, attempt).await
    }

    async fn commit_submission(&self, submission: &SubmissionCommit) -> Result<i64, StorageError> {
        let attempt = &submission.attempt;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        // Dropped uncommitted on any early return, which rolls back.
        let removed = sqlx::query("DELETE FROM active_quizzes WHERE learner = ?1 AND token = ?2")
            .bind(&attempt.learner)
            .bind(attempt.token.to_string())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        if removed.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        sqlx::query("DELETE FROM session_snapshots WHERE snapshot_key = ?1")
            .bind(attempt.token.snapshot_key())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        upsert_progress(
            &mut *tx,
            &attempt.learner,
            &submission.subject_code,
            &submission.progress,
        )
        .await?;
        let id = insert_attempt(&mut *tx, attempt).await?;

        tx.commit().await.map_err(conn)?;
        Ok(id)
    }

    async fn list_attempts(
        &self,
        learner: &str,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, learner, token, completed_at, result
                FROM attempts
                WHERE learner = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(learner)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }
        Ok(out)
    }
}
