// SQLite-backed store for moderation data.
//
// Tables:
// - offender_records: Per-user warning/block counters
// - moderation_records: Audit trail of non-clean submissions
//
// The offender increment is a single upsert statement, so concurrent
// offenses by the same user serialize inside SQLite and never lose an
// update.

use crate::core::moderation::{
    ContentType, ModerationError, ModerationRecord, ModerationRecordStore, ModerationVerdict,
    NewModerationRecord, OffenderRecord, OffenderStore, RecordFilter, ReviewSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

#[derive(Clone)]
pub struct SqliteModerationStore {
    pool: Pool<Sqlite>,
}

impl SqliteModerationStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS offender_records (
                user_id INTEGER PRIMARY KEY,
                warning_count INTEGER NOT NULL DEFAULT 0,
                block_count INTEGER NOT NULL DEFAULT 0,
                last_offense_at TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id INTEGER NOT NULL,
                content_type TEXT NOT NULL,
                content_excerpt TEXT NOT NULL,
                severity_rank INTEGER,
                blocked BOOLEAN NOT NULL,
                verdict TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_moderation_records_created
                ON moderation_records(created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(())
    }

    fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ModerationRecord, ModerationError> {
        let content_type_str: String = row.get("content_type");
        let content_type = ContentType::parse(&content_type_str).ok_or_else(|| {
            ModerationError::StorageError(format!("Unknown content type: {}", content_type_str))
        })?;

        let verdict_json: String = row.get("verdict");
        let verdict: ModerationVerdict = serde_json::from_str(&verdict_json)
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        let created_at_str: String = row.get("created_at");
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(ModerationRecord {
            id: row.get("id"),
            author_id: row.get::<i64, _>("author_id") as u64,
            content_type,
            content_excerpt: row.get("content_excerpt"),
            verdict,
            created_at,
        })
    }
}

#[async_trait]
impl OffenderStore for SqliteModerationStore {
    async fn get(&self, user_id: u64) -> Result<OffenderRecord, ModerationError> {
        let row = sqlx::query(
            "SELECT warning_count, block_count, last_offense_at FROM offender_records WHERE user_id = ?",
        )
        .bind(user_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        if let Some(row) = row {
            let last_offense_at = row
                .get::<Option<String>, _>("last_offense_at")
                .and_then(|s| {
                    DateTime::parse_from_rfc3339(&s)
                        .map(|dt| dt.with_timezone(&Utc))
                        .ok()
                });

            Ok(OffenderRecord {
                user_id,
                warning_count: row.get::<i32, _>("warning_count") as u32,
                block_count: row.get::<i32, _>("block_count") as u32,
                last_offense_at,
            })
        } else {
            Ok(OffenderRecord::zeroed(user_id))
        }
    }

    async fn record_offense(
        &self,
        user_id: u64,
        blocked: bool,
        at: DateTime<Utc>,
    ) -> Result<OffenderRecord, ModerationError> {
        let warning_inc: i32 = if blocked { 0 } else { 1 };
        let block_inc: i32 = if blocked { 1 } else { 0 };

        sqlx::query(
            r#"
            INSERT INTO offender_records (user_id, warning_count, block_count, last_offense_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                warning_count = warning_count + excluded.warning_count,
                block_count = block_count + excluded.block_count,
                last_offense_at = excluded.last_offense_at
            "#,
        )
        .bind(user_id as i64)
        .bind(warning_inc)
        .bind(block_inc)
        .bind(at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        self.get(user_id).await
    }
}

#[async_trait]
impl ModerationRecordStore for SqliteModerationStore {
    async fn insert(
        &self,
        record: NewModerationRecord,
    ) -> Result<ModerationRecord, ModerationError> {
        let verdict_json = serde_json::to_string(&record.verdict)
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;
        let severity_rank = record.verdict.severity.map(|s| s.rank());

        let result = sqlx::query(
            r#"
            INSERT INTO moderation_records (
                author_id, content_type, content_excerpt, severity_rank, blocked, verdict, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.author_id as i64)
        .bind(record.content_type.as_str())
        .bind(&record.content_excerpt)
        .bind(severity_rank)
        .bind(record.verdict.should_block)
        .bind(&verdict_json)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(ModerationRecord {
            id: result.last_insert_rowid(),
            author_id: record.author_id,
            content_type: record.content_type,
            content_excerpt: record.content_excerpt,
            verdict: record.verdict,
            created_at: record.created_at,
        })
    }

    async fn recent(&self, filter: RecordFilter) -> Result<Vec<ModerationRecord>, ModerationError> {
        let min_rank = filter.min_severity.map(|s| s.rank());
        let since = filter.since.map(|t| t.to_rfc3339());
        // SQLite treats LIMIT -1 as "no limit"
        let limit = if filter.limit > 0 {
            filter.limit as i64
        } else {
            -1
        };

        let rows = sqlx::query(
            r#"
            SELECT id, author_id, content_type, content_excerpt, verdict, created_at
            FROM moderation_records
            WHERE (?1 IS NULL OR severity_rank >= ?1)
              AND (?2 IS NULL OR created_at >= ?2)
            ORDER BY created_at DESC, id DESC
            LIMIT ?3
            "#,
        )
        .bind(min_rank)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(Self::record_from_row(row)?);
        }
        Ok(records)
    }

    async fn summary(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<ReviewSummary, ModerationError> {
        let since = since.map(|t| t.to_rfc3339());

        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN blocked THEN 0 ELSE 1 END), 0) AS warnings,
                COALESCE(SUM(CASE WHEN blocked THEN 1 ELSE 0 END), 0) AS blocks
            FROM moderation_records
            WHERE (?1 IS NULL OR created_at >= ?1)
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(ReviewSummary {
            warnings: row.get::<i64, _>("warnings") as u64,
            blocks: row.get::<i64, _>("blocks") as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{Issue, Severity};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    async fn memory_store() -> SqliteModerationStore {
        // A single connection so every statement sees the same :memory: db
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory SQLite");
        let store = SqliteModerationStore::new(pool);
        store.migrate().await.expect("migration failed");
        store
    }

    fn verdict(blocked: bool, severity: Option<Severity>) -> ModerationVerdict {
        ModerationVerdict {
            is_clean: false,
            should_block: blocked,
            severity,
            score: 42,
            issues: vec![Issue::PhoneDetected { weight: 20 }],
            suggestions: vec!["Évitez de partager vos coordonnées".to_string()],
        }
    }

    fn record(blocked: bool, severity: Option<Severity>) -> NewModerationRecord {
        NewModerationRecord {
            author_id: 42,
            content_type: ContentType::Message,
            content_excerpt: "contact-moi au...".to_string(),
            verdict: verdict(blocked, severity),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_unknown_user_reads_zeroed() {
        let store = memory_store().await;
        let record = store.get(999).await.unwrap();
        assert_eq!(record, OffenderRecord::zeroed(999));
    }

    #[tokio::test]
    async fn test_offense_upsert_increments() {
        let store = memory_store().await;

        store.record_offense(7, false, Utc::now()).await.unwrap();
        store.record_offense(7, false, Utc::now()).await.unwrap();
        let updated = store.record_offense(7, true, Utc::now()).await.unwrap();

        assert_eq!(updated.warning_count, 2);
        assert_eq!(updated.block_count, 1);
        assert!(updated.last_offense_at.is_some());
    }

    #[tokio::test]
    async fn test_record_round_trip() {
        let store = memory_store().await;

        let inserted = store.insert(record(true, Some(Severity::High))).await.unwrap();
        assert!(inserted.id > 0);

        let fetched = store.recent(RecordFilter::default()).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, inserted.id);
        assert_eq!(fetched[0].author_id, 42);
        assert_eq!(fetched[0].content_type, ContentType::Message);
        assert_eq!(fetched[0].verdict, inserted.verdict);
    }

    #[tokio::test]
    async fn test_recent_severity_filter_and_limit() {
        let store = memory_store().await;
        store.insert(record(false, None)).await.unwrap();
        store.insert(record(false, Some(Severity::Low))).await.unwrap();
        store.insert(record(true, Some(Severity::High))).await.unwrap();
        store
            .insert(record(true, Some(Severity::Critical)))
            .await
            .unwrap();

        let severe = store
            .recent(RecordFilter {
                min_severity: Some(Severity::High),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(severe.len(), 2);

        let limited = store
            .recent(RecordFilter {
                limit: 3,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 3);
    }

    #[tokio::test]
    async fn test_summary_counts_warnings_and_blocks() {
        let store = memory_store().await;
        store.insert(record(false, Some(Severity::Low))).await.unwrap();
        store.insert(record(false, None)).await.unwrap();
        store.insert(record(true, Some(Severity::High))).await.unwrap();

        let summary = store.summary(None).await.unwrap();
        assert_eq!(summary.warnings, 2);
        assert_eq!(summary.blocks, 1);
    }

    #[tokio::test]
    async fn test_concurrent_offenses_on_file_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("moderation.db");
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&format!("sqlite://{}?mode=rwc", db_path.display()))
            .await
            .expect("Failed to open SQLite file");
        let store = Arc::new(SqliteModerationStore::new(pool));
        store.migrate().await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.record_offense(7, false, Utc::now()).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = store.get(7).await.unwrap();
        assert_eq!(record.warning_count, 10);
    }
}
