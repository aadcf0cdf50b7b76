//! Metadata store capability and its SQLite implementation.

use crate::models::video::VideoRecord;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

/// Schema for the `videos` table, embedded so `--migrate` and tests share it.
pub const SCHEMA_SQL: &str = include_str!("../../migrations/0001_init.sql");

const VIDEO_COLUMNS: &str = "id, competition_id, uploader_id, original_filename, stored_filename, \
                             upload_timestamp, file_size, content_type";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type MetadataResult<T> = Result<T, MetadataError>;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert or replace a record keyed by its ID.
    async fn save(&self, record: &VideoRecord) -> MetadataResult<VideoRecord>;

    async fn find_by_id(&self, id: &str) -> MetadataResult<Option<VideoRecord>>;

    async fn find_by_competition_id(&self, competition_id: &str)
    -> MetadataResult<Vec<VideoRecord>>;

    async fn find_by_uploader_id(&self, uploader_id: &str) -> MetadataResult<Vec<VideoRecord>>;

    /// Returns whether a record was removed.
    async fn delete_by_id(&self, id: &str) -> MetadataResult<bool>;

    async fn ping(&self) -> MetadataResult<()>;
}

#[derive(Clone)]
pub struct SqliteMetadataStore {
    db: Arc<SqlitePool>,
}

impl SqliteMetadataStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

/// Apply [`SCHEMA_SQL`] statement by statement.
pub async fn apply_schema(db: &SqlitePool) -> MetadataResult<()> {
    let statements = SCHEMA_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn save(&self, record: &VideoRecord) -> MetadataResult<VideoRecord> {
        let saved = sqlx::query_as::<_, VideoRecord>(&format!(
            r#"
            INSERT INTO videos ({VIDEO_COLUMNS})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                competition_id = excluded.competition_id,
                uploader_id = excluded.uploader_id,
                original_filename = excluded.original_filename,
                stored_filename = excluded.stored_filename,
                upload_timestamp = excluded.upload_timestamp,
                file_size = excluded.file_size,
                content_type = excluded.content_type
            RETURNING {VIDEO_COLUMNS}
            "#
        ))
        .bind(&record.id)
        .bind(&record.competition_id)
        .bind(&record.uploader_id)
        .bind(&record.original_filename)
        .bind(&record.stored_filename)
        .bind(record.upload_timestamp)
        .bind(record.file_size)
        .bind(&record.content_type)
        .fetch_one(&*self.db)
        .await?;

        Ok(saved)
    }

    async fn find_by_id(&self, id: &str) -> MetadataResult<Option<VideoRecord>> {
        let record = sqlx::query_as::<_, VideoRecord>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;

        Ok(record)
    }

    async fn find_by_competition_id(
        &self,
        competition_id: &str,
    ) -> MetadataResult<Vec<VideoRecord>> {
        let records = sqlx::query_as::<_, VideoRecord>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE competition_id = ? \
             ORDER BY upload_timestamp ASC, id ASC"
        ))
        .bind(competition_id)
        .fetch_all(&*self.db)
        .await?;

        Ok(records)
    }

    async fn find_by_uploader_id(&self, uploader_id: &str) -> MetadataResult<Vec<VideoRecord>> {
        let records = sqlx::query_as::<_, VideoRecord>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE uploader_id = ? \
             ORDER BY upload_timestamp ASC, id ASC"
        ))
        .bind(uploader_id)
        .fetch_all(&*self.db)
        .await?;

        Ok(records)
    }

    async fn delete_by_id(&self, id: &str) -> MetadataResult<bool> {
        let result = sqlx::query("DELETE FROM videos WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> MetadataResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }
}
