use async_trait::async_trait;
use exam_core::model::{Question, QuizToken, Subject};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, from_json, ser, to_json, token_from_str, u32_from_i64};
use crate::repository::{ActiveQuizRecord, ActiveQuizRepository, StorageError};

fn map_active_row(row: &sqlx::sqlite::SqliteRow) -> Result<ActiveQuizRecord, StorageError> {
    let token: String = row.try_get("token").map_err(ser)?;
    let questions: String = row.try_get("questions").map_err(ser)?;
    let questions: Vec<Question> = from_json("questions", &questions)?;

    Ok(ActiveQuizRecord {
        learner: row.try_get("learner").map_err(ser)?,
        token: token_from_str(&token)?,
        subject: Subject::new(
            row.try_get::<String, _>("subject_code").map_err(ser)?,
            row.try_get::<String, _>("subject_name").map_err(ser)?,
        ),
        questions,
        time_limit_secs: u32_from_i64(
            "time_limit_secs",
            row.try_get::<i64, _>("time_limit_secs").map_err(ser)?,
        )?,
        started_at: row.try_get("started_at").map_err(ser)?,
    })
}

#[async_trait]
impl ActiveQuizRepository for SqliteRepository {
    async fn save_active(
        &self,
        record: &ActiveQuizRecord,
    ) -> Result<Option<QuizToken>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let previous: Option<String> =
            sqlx::query_scalar("SELECT token FROM active_quizzes WHERE learner = ?1")
                .bind(&record.learner)
                .fetch_optional(&mut *tx)
                .await
                .map_err(conn)?;

        sqlx::query(
            r"
                INSERT INTO active_quizzes (
                    learner, token, subject_code, subject_name,
                    questions, time_limit_secs, started_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(learner) DO UPDATE SET
                    token = excluded.token,
                    subject_code = excluded.subject_code,
                    subject_name = excluded.subject_name,
                    questions = excluded.questions,
                    time_limit_secs = excluded.time_limit_secs,
                    started_at = excluded.started_at
            ",
        )
        .bind(&record.learner)
        .bind(record.token.to_string())
        .bind(&record.subject.code)
        .bind(&record.subject.name)
        .bind(to_json(&record.questions)?)
        .bind(i64::from(record.time_limit_secs))
        .bind(record.started_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        let replaced = previous.as_deref().map(token_from_str).transpose()?;
        Ok(replaced.filter(|token| *token != record.token))
    }

    async fn get_active(
        &self,
        learner: &str,
        token: QuizToken,
    ) -> Result<Option<ActiveQuizRecord>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    learner, token, subject_code, subject_name,
                    questions, time_limit_secs, started_at
                FROM active_quizzes
                WHERE learner = ?1 AND token = ?2
            ",
        )
        .bind(learner)
        .bind(token.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_active_row).transpose()
    }
}
