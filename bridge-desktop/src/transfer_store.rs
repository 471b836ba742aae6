//! Transfer Record Storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    persistence::{TransferRecord, TransferRecordStore, TransferStatus},
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::PathBuf;
use tracing::debug;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS transfers (
        track_id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        author TEXT NOT NULL,
        duration TEXT,
        source_url TEXT NOT NULL,
        file_path TEXT NOT NULL,
        mime_type TEXT NOT NULL,
        file_size INTEGER NOT NULL,
        bytes_transferred INTEGER NOT NULL,
        status TEXT NOT NULL,
        error TEXT,
        thumbnail_url TEXT,
        thumbnail_path TEXT,
        created_at TEXT NOT NULL,
        downloaded_at TEXT
    )
"#;

fn db_error(context: &str) -> impl Fn(sqlx::Error) -> BridgeError + '_ {
    move |e| BridgeError::Persistence(format!("{}: {}", context, e))
}

/// SQLite-backed transfer record store
///
/// One row per track. Writes are upserts, so the transfer engine can persist
/// after every state change without checking for an existing row.
pub struct SqliteTransferRecordStore {
    pool: SqlitePool,
}

impl SqliteTransferRecordStore {
    /// Open (or create) the database at `db_path`.
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(db_error("Failed to connect to DB"))?;

        let store = Self { pool };
        store.migrate().await?;
        debug!(path = ?db_path, "Initialized transfer store");
        Ok(store)
    }

    /// In-memory store (for testing). A single connection keeps every query on the same database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_error("Failed to connect to DB"))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to create table"))?;
        Ok(())
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BridgeError::Persistence(format!("Invalid timestamp '{}': {}", value, e)))
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn record_from_row(row: &SqliteRow) -> Result<TransferRecord> {
    let status: String = row.try_get("status").map_err(db_error("Bad status column"))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(db_error("Bad created_at column"))?;
    let downloaded_at: Option<String> = row
        .try_get("downloaded_at")
        .map_err(db_error("Bad downloaded_at column"))?;
    let file_size: i64 = row.try_get("file_size").map_err(db_error("Bad file_size column"))?;
    let bytes_transferred: i64 = row
        .try_get("bytes_transferred")
        .map_err(db_error("Bad bytes_transferred column"))?;
    let file_path: String = row.try_get("file_path").map_err(db_error("Bad file_path column"))?;
    let thumbnail_path: Option<String> = row
        .try_get("thumbnail_path")
        .map_err(db_error("Bad thumbnail_path column"))?;

    Ok(TransferRecord {
        track_id: row.try_get("track_id").map_err(db_error("Bad track_id column"))?,
        title: row.try_get("title").map_err(db_error("Bad title column"))?,
        author: row.try_get("author").map_err(db_error("Bad author column"))?,
        duration: row.try_get("duration").map_err(db_error("Bad duration column"))?,
        source_url: row
            .try_get("source_url")
            .map_err(db_error("Bad source_url column"))?,
        file_path: PathBuf::from(file_path),
        mime_type: row.try_get("mime_type").map_err(db_error("Bad mime_type column"))?,
        file_size: file_size.max(0) as u64,
        bytes_transferred: bytes_transferred.max(0) as u64,
        status: status.parse::<TransferStatus>()?,
        error: row.try_get("error").map_err(db_error("Bad error column"))?,
        thumbnail_url: row
            .try_get("thumbnail_url")
            .map_err(db_error("Bad thumbnail_url column"))?,
        thumbnail_path: thumbnail_path.map(PathBuf::from),
        created_at: parse_timestamp(&created_at)?,
        downloaded_at: downloaded_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

#[async_trait]
impl TransferRecordStore for SqliteTransferRecordStore {
    async fn persist_transfer_record(&self, record: &TransferRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transfers (
                track_id, title, author, duration, source_url, file_path, mime_type,
                file_size, bytes_transferred, status, error, thumbnail_url, thumbnail_path,
                created_at, downloaded_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(track_id) DO UPDATE SET
                title = excluded.title,
                author = excluded.author,
                duration = excluded.duration,
                source_url = excluded.source_url,
                file_path = excluded.file_path,
                mime_type = excluded.mime_type,
                file_size = excluded.file_size,
                bytes_transferred = excluded.bytes_transferred,
                status = excluded.status,
                error = excluded.error,
                thumbnail_url = excluded.thumbnail_url,
                thumbnail_path = excluded.thumbnail_path,
                downloaded_at = excluded.downloaded_at
            "#,
        )
        .bind(&record.track_id)
        .bind(&record.title)
        .bind(&record.author)
        .bind(&record.duration)
        .bind(&record.source_url)
        .bind(record.file_path.to_string_lossy().into_owned())
        .bind(&record.mime_type)
        .bind(to_i64(record.file_size))
        .bind(to_i64(record.bytes_transferred))
        .bind(record.status.as_str())
        .bind(&record.error)
        .bind(&record.thumbnail_url)
        .bind(
            record
                .thumbnail_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        )
        .bind(record.created_at.to_rfc3339())
        .bind(record.downloaded_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to persist transfer"))?;

        debug!(track_id = %record.track_id, status = %record.status, "Stored transfer record");
        Ok(())
    }

    async fn query_transfer_record(&self, track_id: &str) -> Result<Option<TransferRecord>> {
        let row = sqlx::query("SELECT * FROM transfers WHERE track_id = ?")
            .bind(track_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to query transfer"))?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn list_transfer_records(&self) -> Result<Vec<TransferRecord>> {
        let rows = sqlx::query("SELECT * FROM transfers ORDER BY created_at, track_id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list transfers"))?;

        rows.iter().map(record_from_row).collect()
    }

    async fn delete_transfer_record(&self, track_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM transfers WHERE track_id = ?")
            .bind(track_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete transfer"))?;

        debug!(track_id, "Deleted transfer record");
        Ok(())
    }
}
