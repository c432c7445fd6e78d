use async_trait::async_trait;
use chrono::Utc;
use exam_core::model::LearnerProgress;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, from_json, ser, to_json};
use crate::repository::{ProgressRepository, StorageError};

pub(super) async fn upsert_progress<'c, E>(
    executor: E,
    learner: &str,
    subject_code: &str,
    progress: &LearnerProgress,
) -> Result<(), StorageError>
where
    E: sqlx::Executor<'c, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r"
            INSERT INTO learner_progress (
                learner, subject_code, penalties, question_bag, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(learner, subject_code) DO UPDATE SET
                penalties = excluded.penalties,
                question_bag = excluded.question_bag,
                updated_at = excluded.updated_at
        ",
    )
    .bind(learner)
    .bind(subject_code)
    .bind(to_json(&progress.penalties)?)
    .bind(to_json(&progress.question_bag)?)
    .bind(Utc::now())
    .execute(executor)
    .await
    .map_err(conn)?;
    Ok(())
}

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        learner: &str,
        subject_code: &str,
    ) -> Result<Option<LearnerProgress>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT penalties, question_bag
                FROM learner_progress
                WHERE learner = ?1 AND subject_code = ?2
            ",
        )
        .bind(learner)
        .bind(subject_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let penalties: String = row.try_get("penalties").map_err(ser)?;
        let question_bag: String = row.try_get("question_bag").map_err(ser)?;
        Ok(Some(LearnerProgress {
            penalties: from_json("penalties", &penalties)?,
            question_bag: from_json("question_bag", &question_bag)?,
        }))
    }

    async fn save_progress(
        &self,
        learner: &str,
        subject_code: &str,
        progress: &LearnerProgress,
    ) -> Result<(), StorageError> {
        upsert_progress(&self.pool, learner, subject_code, progress).await
    }
}
