use async_trait::async_trait;
use chrono::Utc;
use exam_core::model::QuizToken;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{SnapshotRepository, StorageError};

#[async_trait]
impl SnapshotRepository for SqliteRepository {
    async fn save_snapshot(&self, token: QuizToken, payload: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO session_snapshots (snapshot_key, payload, saved_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(snapshot_key) DO UPDATE SET
                    payload = excluded.payload,
                    saved_at = excluded.saved_at
            ",
        )
        .bind(token.snapshot_key())
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn load_snapshot(&self, token: QuizToken) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT payload FROM session_snapshots WHERE snapshot_key = ?1")
            .bind(token.snapshot_key())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.map(|r| r.try_get::<String, _>("payload").map_err(ser))
            .transpose()
    }

    async fn clear_snapshot(&self, token: QuizToken) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM session_snapshots WHERE snapshot_key = ?1")
            .bind(token.snapshot_key())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
