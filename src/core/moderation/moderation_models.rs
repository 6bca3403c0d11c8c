// Moderation domain models - data structures for the content scoring engine.
//
// These are pure domain types with no HTTP or database dependencies.
// The api layer serializes them as-is; the infra layer persists them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of user content is being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    Post,
    Comment,
    Message,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Post => "POST",
            ContentType::Comment => "COMMENT",
            ContentType::Message => "MESSAGE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "POST" => Some(ContentType::Post),
            "COMMENT" => Some(ContentType::Comment),
            "MESSAGE" => Some(ContentType::Message),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submission passing through the engine. Immutable, constructed per call.
#[derive(Debug, Clone)]
pub struct SubmissionContext {
    pub author_id: u64,
    pub content: String,
    pub content_type: ContentType,
}

impl SubmissionContext {
    pub fn new(author_id: u64, content: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            author_id,
            content: content.into(),
            content_type,
        }
    }
}

/// Severity tier derived from the aggregate score.
///
/// Ordered so that `High > Medium` comparisons work for block rules and
/// admin-surface filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Stable numeric rank used by the SQLite store for range filters.
    pub fn rank(&self) -> i32 {
        match self {
            Severity::Low => 0,
            Severity::Medium => 1,
            Severity::High => 2,
            Severity::Critical => 3,
        }
    }

    pub fn from_rank(rank: i32) -> Option<Self> {
        match rank {
            0 => Some(Severity::Low),
            1 => Some(Severity::Medium),
            2 => Some(Severity::High),
            3 => Some(Severity::Critical),
            _ => None,
        }
    }
}

/// A single detector finding. One variant per detector, each carrying only
/// the evidence relevant to that detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Issue {
    /// Forbidden vocabulary matched on word boundaries.
    /// `words` lists distinct matches in text order; `matches` counts every
    /// occurrence (drives both the weight and the CRITICAL ceiling).
    #[serde(rename = "FORBIDDEN_WORDS")]
    ForbiddenWords {
        weight: u32,
        words: Vec<String>,
        matches: u32,
    },
    /// A scam/solicitation template family matched. One issue per family.
    #[serde(rename = "SUSPICIOUS_PHRASES")]
    SuspiciousPhrases { weight: u32, phrase: String },
    #[serde(rename = "EMAIL_DETECTED")]
    EmailDetected { weight: u32 },
    #[serde(rename = "PHONE_DETECTED")]
    PhoneDetected { weight: u32 },
    /// A URL whose host is not on the allow-list.
    #[serde(rename = "SUSPICIOUS_URL")]
    SuspiciousUrl { weight: u32, url: String },
    #[serde(rename = "CAPS_LOCK")]
    CapsLock { weight: u32, ratio: f32 },
    #[serde(rename = "SPAM_PATTERN")]
    SpamPattern { weight: u32, signal: String },
    /// Synthetic issue injected from offender history, not from the text.
    #[serde(rename = "REPEAT_OFFENDER")]
    RepeatOffender {
        weight: u32,
        #[serde(rename = "priorWarnings")]
        prior_warnings: u32,
    },
}

impl Issue {
    pub fn kind(&self) -> IssueKind {
        match self {
            Issue::ForbiddenWords { .. } => IssueKind::ForbiddenWords,
            Issue::SuspiciousPhrases { .. } => IssueKind::SuspiciousPhrases,
            Issue::EmailDetected { .. } => IssueKind::EmailDetected,
            Issue::PhoneDetected { .. } => IssueKind::PhoneDetected,
            Issue::SuspiciousUrl { .. } => IssueKind::SuspiciousUrl,
            Issue::CapsLock { .. } => IssueKind::CapsLock,
            Issue::SpamPattern { .. } => IssueKind::SpamPattern,
            Issue::RepeatOffender { .. } => IssueKind::RepeatOffender,
        }
    }

    pub fn weight(&self) -> u32 {
        match self {
            Issue::ForbiddenWords { weight, .. }
            | Issue::SuspiciousPhrases { weight, .. }
            | Issue::EmailDetected { weight }
            | Issue::PhoneDetected { weight }
            | Issue::SuspiciousUrl { weight, .. }
            | Issue::CapsLock { weight, .. }
            | Issue::SpamPattern { weight, .. }
            | Issue::RepeatOffender { weight, .. } => *weight,
        }
    }
}

/// Discriminant for issue variants, used by block rules and suggestion lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    ForbiddenWords,
    SuspiciousPhrases,
    EmailDetected,
    PhoneDetected,
    SuspiciousUrl,
    CapsLock,
    SpamPattern,
    RepeatOffender,
}

/// The engine's final decision for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationVerdict {
    pub is_clean: bool,
    pub should_block: bool,
    /// `None` when the score stays below the LOW threshold.
    pub severity: Option<Severity>,
    /// Aggregate score, clamped to 0..=100.
    pub score: u32,
    /// Findings in detector execution order.
    pub issues: Vec<Issue>,
    /// Remediation hints, one per qualifying issue type, de-duplicated.
    pub suggestions: Vec<String>,
}

impl ModerationVerdict {
    /// Verdict for content with no findings (including the empty-input
    /// short-circuit).
    pub fn clean() -> Self {
        Self {
            is_clean: true,
            should_block: false,
            severity: None,
            score: 0,
            issues: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}

/// Per-user running history of past warnings and blocks.
///
/// Created zeroed on first lookup, never deleted. Both counters are
/// monotonically non-decreasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffenderRecord {
    pub user_id: u64,
    pub warning_count: u32,
    pub block_count: u32,
    pub last_offense_at: Option<DateTime<Utc>>,
}

impl OffenderRecord {
    pub fn zeroed(user_id: u64) -> Self {
        Self {
            user_id,
            warning_count: 0,
            block_count: 0,
            last_offense_at: None,
        }
    }
}

/// Persisted audit entry. Written exactly once per non-clean submission,
/// never mutated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationRecord {
    pub id: i64,
    pub author_id: u64,
    pub content_type: ContentType,
    pub content_excerpt: String,
    pub verdict: ModerationVerdict,
    pub created_at: DateTime<Utc>,
}

/// A record as handed to the store; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewModerationRecord {
    pub author_id: u64,
    pub content_type: ContentType,
    pub content_excerpt: String,
    pub verdict: ModerationVerdict,
    pub created_at: DateTime<Utc>,
}

/// Filter for the admin review surface.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub min_severity: Option<Severity>,
    pub since: Option<DateTime<Utc>>,
    pub limit: usize,
}

/// Warning/block counts displayed by the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewSummary {
    pub warnings: u64,
    pub blocks: u64,
}

/// One scam/solicitation phrase family. Templates are stored lowercase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseFamily {
    pub name: String,
    pub templates: Vec<String>,
}

/// Every weight and threshold used by the pipeline.
///
/// The numeric values are deployment-tunable defaults, not invariants; the
/// composition root can load overrides from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    pub forbidden_words: Vec<String>,
    /// Score contribution per forbidden-word occurrence.
    pub forbidden_word_weight: u32,
    /// Cap on the total forbidden-word contribution.
    pub forbidden_word_weight_cap: u32,
    /// Occurrence count at which severity is forced to CRITICAL.
    pub forbidden_critical_count: u32,
    pub phrase_families: Vec<PhraseFamily>,
    pub suspicious_phrase_weight: u32,
    pub email_weight: u32,
    pub phone_weight: u32,
    pub suspicious_url_weight: u32,
    /// Hosts considered safe; subdomains of these pass as well.
    pub allowed_domains: Vec<String>,
    pub caps_weight: u32,
    pub caps_ratio_threshold: f32,
    /// Minimum letters (in tokens of length >= 4) before caps ratio applies.
    pub caps_min_letters: usize,
    pub spam_weight: u32,
    /// Consecutive identical characters that count as a spam run.
    pub spam_run_length: usize,
    /// Symbol density threshold over non-whitespace characters.
    pub spam_symbol_ratio: f32,
    /// Minimum content length before symbol density applies.
    pub spam_symbol_min_len: usize,
    /// Prior warnings at which the repeat-offender signal kicks in.
    pub repeat_offender_threshold: u32,
    pub repeat_offender_base: u32,
    pub repeat_offender_step: u32,
    pub repeat_offender_cap: u32,
    pub max_content_len: usize,
    pub excerpt_len: usize,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            forbidden_words: [
                // French profanity
                "merde", "putain", "connard", "connasse", "salope", "pute", "enculé", "encule",
                "batard", "bâtard", "fdp", "ntm",
                // English profanity
                "bitch", "fuck", "fucking", "shit", "asshole", "bastard", "cunt",
                // Scam vocabulary
                "arnaque", "arnaqueur", "escroc", "scammer",
            ]
            .iter()
            .map(|w| w.to_string())
            .collect(),
            forbidden_word_weight: 25,
            forbidden_word_weight_cap: 80,
            forbidden_critical_count: 5,
            phrase_families: vec![
                PhraseFamily {
                    name: "contact-solicitation".to_string(),
                    templates: [
                        "envoie-moi ton numéro",
                        "envoie moi ton numero",
                        "donne-moi ton numéro",
                        "donne moi ton numero",
                        "passe-moi ton whatsapp",
                        "ajoute-moi sur snap",
                        "add me on snap",
                        "dm me your number",
                    ]
                    .iter()
                    .map(|t| t.to_string())
                    .collect(),
                },
                PhraseFamily {
                    name: "off-platform-payment".to_string(),
                    templates: [
                        "paiement hors plateforme",
                        "paye-moi sur paypal",
                        "paie-moi sur paypal",
                        "western union",
                        "moneygram",
                        "cash app",
                        "virement direct",
                        "paiement direct",
                    ]
                    .iter()
                    .map(|t| t.to_string())
                    .collect(),
                },
            ],
            suspicious_phrase_weight: 30,
            email_weight: 15,
            phone_weight: 20,
            suspicious_url_weight: 20,
            allowed_domains: [
                "instagram.com",
                "twitter.com",
                "x.com",
                "facebook.com",
                "youtube.com",
                "tiktok.com",
            ]
            .iter()
            .map(|d| d.to_string())
            .collect(),
            caps_weight: 20,
            caps_ratio_threshold: 0.6,
            caps_min_letters: 12,
            spam_weight: 20,
            spam_run_length: 5,
            spam_symbol_ratio: 0.5,
            spam_symbol_min_len: 10,
            repeat_offender_threshold: 3,
            repeat_offender_base: 20,
            repeat_offender_step: 5,
            repeat_offender_cap: 40,
            max_content_len: 10_000,
            excerpt_len: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_wire_shape() {
        let issue = Issue::ForbiddenWords {
            weight: 50,
            words: vec!["merde".to_string()],
            matches: 2,
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["type"], "FORBIDDEN_WORDS");
        assert_eq!(json["weight"], 50);
        assert_eq!(json["matches"], 2);

        let offender = Issue::RepeatOffender {
            weight: 20,
            prior_warnings: 3,
        };
        let json = serde_json::to_value(&offender).unwrap();
        assert_eq!(json["type"], "REPEAT_OFFENDER");
        assert_eq!(json["priorWarnings"], 3);
    }

    #[test]
    fn test_verdict_wire_shape() {
        let verdict = ModerationVerdict::clean();
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["isClean"], true);
        assert_eq!(json["shouldBlock"], false);
        assert!(json["severity"].is_null());
        assert_eq!(json["score"], 0);
    }

    #[test]
    fn test_verdict_round_trip() {
        let verdict = ModerationVerdict {
            is_clean: false,
            should_block: true,
            severity: Some(Severity::High),
            score: 75,
            issues: vec![Issue::PhoneDetected { weight: 20 }],
            suggestions: vec!["test".to_string()],
        };
        let json = serde_json::to_string(&verdict).unwrap();
        let back: ModerationVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, verdict);
    }

    #[test]
    fn test_content_type_tags() {
        assert_eq!(
            serde_json::to_value(ContentType::Message).unwrap(),
            serde_json::json!("MESSAGE")
        );
        assert_eq!(ContentType::parse("POST"), Some(ContentType::Post));
        assert_eq!(ContentType::parse("STORY"), None);
    }

    #[test]
    fn test_severity_order_and_rank() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium > Severity::Low);
        for sev in [
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ] {
            assert_eq!(Severity::from_rank(sev.rank()), Some(sev));
        }
    }
}
