// Moderation service - core pipeline for scoring user content.
//
// One evaluation is a one-shot run: validate -> detect -> offender signal ->
// score -> decide -> record -> notify. The verdict is computed before any
// side effect; record persistence and admin notification never change it.
//
// NO HTTP or database dependencies here - just pure domain logic behind
// storage ports.

use super::decision::decide;
use super::detectors::run_detectors;
use super::moderation_models::{
    Issue, ModerationConfig, ModerationRecord, ModerationVerdict, NewModerationRecord,
    OffenderRecord, RecordFilter, ReviewSummary, Severity, SubmissionContext,
};
use super::scorer::classify;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid author id")]
    InvalidId,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Notification error: {0}")]
    NotificationError(String),
}

// ============================================================================
// STORAGE TRAITS (PORTS)
// ============================================================================

/// Per-user offender history. Lookup is on the hot path and must be O(1) by
/// user id; the increment must be an atomic read-modify-write so concurrent
/// offenses by the same user never lose an update.
#[async_trait]
pub trait OffenderStore: Send + Sync {
    /// Get a user's history, zeroed if the user has never offended.
    async fn get(&self, user_id: u64) -> Result<OffenderRecord, ModerationError>;

    /// Atomically count one offense (warning when not blocked, block
    /// otherwise) and stamp `last_offense_at`. Returns the updated record.
    async fn record_offense(
        &self,
        user_id: u64,
        blocked: bool,
        at: DateTime<Utc>,
    ) -> Result<OffenderRecord, ModerationError>;
}

/// Audit trail of non-clean submissions, read by the admin review surface.
#[async_trait]
pub trait ModerationRecordStore: Send + Sync {
    /// Persist a record; the store assigns the id.
    async fn insert(&self, record: NewModerationRecord)
        -> Result<ModerationRecord, ModerationError>;

    /// Recent records, newest first, filtered by minimum severity and time.
    async fn recent(&self, filter: RecordFilter) -> Result<Vec<ModerationRecord>, ModerationError>;

    /// Warning/block counts for the admin dashboard.
    async fn summary(&self, since: Option<DateTime<Utc>>)
        -> Result<ReviewSummary, ModerationError>;
}

/// Outbound admin alert for blocked or critical content.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminAlert {
    pub record_id: i64,
    pub author_id: u64,
    pub severity: Severity,
    pub blocked: bool,
}

/// Admin notification channel. Delivery must be idempotent on the record id
/// so a retried enqueue never double-notifies.
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn notify(&self, alert: AdminAlert) -> Result<(), ModerationError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub verdict: ModerationVerdict,
    /// Id of the persisted ModerationRecord, if one was written.
    pub record_id: Option<i64>,
    /// Set when the offender history was unreachable and the verdict was
    /// computed without the repeat-offender signal.
    pub history_degraded: bool,
}

/// Content-moderation engine, generic over its storage and notification
/// ports.
pub struct ModerationService<O: OffenderStore, R: ModerationRecordStore, N: AdminNotifier> {
    offenders: O,
    records: R,
    notifier: N,
    config: ModerationConfig,
}

impl<O: OffenderStore, R: ModerationRecordStore, N: AdminNotifier> ModerationService<O, R, N> {
    pub fn new(offenders: O, records: R, notifier: N) -> Self {
        Self::with_config(offenders, records, notifier, ModerationConfig::default())
    }

    pub fn with_config(offenders: O, records: R, notifier: N, config: ModerationConfig) -> Self {
        Self {
            offenders,
            records,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    /// Evaluate one submission and persist the audit trail for non-clean
    /// content.
    ///
    /// Empty or whitespace-only content short-circuits before any detector
    /// runs: clean verdict, no record, no offender lookup.
    pub async fn evaluate(
        &self,
        ctx: &SubmissionContext,
    ) -> Result<Evaluation, ModerationError> {
        if ctx.author_id == 0 {
            return Err(ModerationError::InvalidId);
        }
        if ctx.content.chars().count() > self.config.max_content_len {
            return Err(ModerationError::InvalidInput(format!(
                "content exceeds {} characters",
                self.config.max_content_len
            )));
        }

        if ctx.content.trim().is_empty() {
            return Ok(Evaluation {
                verdict: ModerationVerdict::clean(),
                record_id: None,
                history_degraded: false,
            });
        }

        let mut issues = run_detectors(&ctx.content, &self.config);
        let mut history_degraded = false;

        // The repeat-offender signal only escalates existing findings;
        // clean text stays clean regardless of history.
        if !issues.is_empty() {
            match self.offenders.get(ctx.author_id).await {
                Ok(history) => {
                    if let Some(issue) = self.repeat_offender_issue(&history) {
                        issues.push(issue);
                    }
                }
                Err(e) => {
                    // Fail open: score without the signal, but leave a marker
                    // for the observability layer.
                    tracing::warn!(
                        author_id = ctx.author_id,
                        error = %e,
                        "Offender history unavailable, evaluating in degraded mode"
                    );
                    history_degraded = true;
                }
            }
        }

        let (score, severity) = classify(&issues, &self.config);
        let verdict = decide(score, severity, issues);

        let record_id = if verdict.is_clean {
            None
        } else {
            self.write_record(ctx, &verdict).await
        };

        if !verdict.is_clean {
            tracing::info!(
                author_id = ctx.author_id,
                content_type = %ctx.content_type,
                score = verdict.score,
                severity = ?verdict.severity,
                blocked = verdict.should_block,
                "Content moderation verdict"
            );
        }

        Ok(Evaluation {
            verdict,
            record_id,
            history_degraded,
        })
    }

    fn repeat_offender_issue(&self, history: &OffenderRecord) -> Option<Issue> {
        let threshold = self.config.repeat_offender_threshold;
        if history.warning_count < threshold {
            return None;
        }

        let over = history.warning_count - threshold;
        let weight = (self.config.repeat_offender_base + self.config.repeat_offender_step * over)
            .min(self.config.repeat_offender_cap);

        Some(Issue::RepeatOffender {
            weight,
            prior_warnings: history.warning_count,
        })
    }

    /// Persist the audit record, bump the author's offender history and
    /// enqueue an admin alert for blocking/critical verdicts.
    ///
    /// Failures here are logged, never propagated - an audit-write fault
    /// must not change a verdict that was already computed.
    async fn write_record(
        &self,
        ctx: &SubmissionContext,
        verdict: &ModerationVerdict,
    ) -> Option<i64> {
        let now = Utc::now();
        let new_record = NewModerationRecord {
            author_id: ctx.author_id,
            content_type: ctx.content_type,
            content_excerpt: excerpt(&ctx.content, self.config.excerpt_len),
            verdict: verdict.clone(),
            created_at: now,
        };

        let record = match self.records.insert(new_record).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(
                    author_id = ctx.author_id,
                    error = %e,
                    "Failed to persist moderation record"
                );
                return None;
            }
        };

        if let Err(e) = self
            .offenders
            .record_offense(ctx.author_id, verdict.should_block, now)
            .await
        {
            tracing::error!(
                author_id = ctx.author_id,
                error = %e,
                "Failed to update offender history"
            );
        }

        if verdict.should_block || verdict.severity == Some(Severity::Critical) {
            if let Some(severity) = verdict.severity {
                let alert = AdminAlert {
                    record_id: record.id,
                    author_id: ctx.author_id,
                    severity,
                    blocked: verdict.should_block,
                };
                if let Err(e) = self.notifier.notify(alert).await {
                    tracing::error!(
                        record_id = record.id,
                        error = %e,
                        "Failed to enqueue admin notification"
                    );
                }
            }
        }

        Some(record.id)
    }

    /// Recent records for the admin review surface.
    pub async fn recent_records(
        &self,
        filter: RecordFilter,
    ) -> Result<Vec<ModerationRecord>, ModerationError> {
        self.records.recent(filter).await
    }

    /// Warning/block counts for the admin review surface.
    pub async fn review_summary(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<ReviewSummary, ModerationError> {
        self.records.summary(since).await
    }

    /// A user's offender history (moderator tooling).
    pub async fn offender_history(&self, user_id: u64) -> Result<OffenderRecord, ModerationError> {
        self.offenders.get(user_id).await
    }
}

/// Truncate content for the review UI, keeping char boundaries intact.
fn excerpt(content: &str, max_chars: usize) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= max_chars {
        trimmed.to_string()
    } else {
        let mut cut: String = trimmed.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    }
}

// ============================================================================
// TESTS
// ============================================================================
