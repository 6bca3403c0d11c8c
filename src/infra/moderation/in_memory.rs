// In-memory implementations of the moderation ports.
//
// Used by tests and local development. DashMap gives us a concurrent map
// whose entry API makes the offender increment an atomic read-modify-write,
// matching the contract the SQLite store honors with an upsert.

use crate::core::moderation::{
    ModerationError, ModerationRecord, ModerationRecordStore, NewModerationRecord, OffenderRecord,
    OffenderStore, RecordFilter, ReviewSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory offender history keyed by user id.
pub struct InMemoryOffenderStore {
    data: DashMap<u64, OffenderRecord>,
}

impl InMemoryOffenderStore {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Number of users with history (test helper).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for InMemoryOffenderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OffenderStore for InMemoryOffenderStore {
    async fn get(&self, user_id: u64) -> Result<OffenderRecord, ModerationError> {
        Ok(self
            .data
            .get(&user_id)
            .map(|r| r.clone())
            .unwrap_or_else(|| OffenderRecord::zeroed(user_id)))
    }

    async fn record_offense(
        &self,
        user_id: u64,
        blocked: bool,
        at: DateTime<Utc>,
    ) -> Result<OffenderRecord, ModerationError> {
        // entry() holds the shard lock for the whole update, so concurrent
        // offenses by the same user can never lose an increment.
        let mut entry = self
            .data
            .entry(user_id)
            .or_insert_with(|| OffenderRecord::zeroed(user_id));
        if blocked {
            entry.block_count += 1;
        } else {
            entry.warning_count += 1;
        }
        entry.last_offense_at = Some(at);
        Ok(entry.clone())
    }
}

/// In-memory audit trail.
pub struct InMemoryRecordStore {
    records: DashMap<i64, ModerationRecord>,
    next_id: AtomicI64,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicI64::new(0),
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModerationRecordStore for InMemoryRecordStore {
    async fn insert(
        &self,
        record: NewModerationRecord,
    ) -> Result<ModerationRecord, ModerationError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = ModerationRecord {
            id,
            author_id: record.author_id,
            content_type: record.content_type,
            content_excerpt: record.content_excerpt,
            verdict: record.verdict,
            created_at: record.created_at,
        };
        self.records.insert(id, stored.clone());
        Ok(stored)
    }

    async fn recent(&self, filter: RecordFilter) -> Result<Vec<ModerationRecord>, ModerationError> {
        let mut records: Vec<ModerationRecord> = self
            .records
            .iter()
            .filter(|entry| {
                let record = entry.value();
                let severity_ok = match filter.min_severity {
                    Some(min) => record.verdict.severity.map(|s| s >= min).unwrap_or(false),
                    None => true,
                };
                let since_ok = match filter.since {
                    Some(since) => record.created_at >= since,
                    None => true,
                };
                severity_ok && since_ok
            })
            .map(|entry| entry.value().clone())
            .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        if filter.limit > 0 {
            records.truncate(filter.limit);
        }
        Ok(records)
    }

    async fn summary(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<ReviewSummary, ModerationError> {
        let mut warnings = 0u64;
        let mut blocks = 0u64;

        for entry in self.records.iter() {
            let record = entry.value();
            if let Some(since) = since {
                if record.created_at < since {
                    continue;
                }
            }
            if record.verdict.should_block {
                blocks += 1;
            } else {
                warnings += 1;
            }
        }

        Ok(ReviewSummary { warnings, blocks })
    }
}
