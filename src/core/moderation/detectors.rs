// Detector set - pure text analysis functions.
//
// Each detector is a pure function of (text, config) and emits zero or more
// Issues. No shared mutable state, safe to run in any order; `run_detectors`
// fixes the execution order so verdicts are reproducible.

use super::moderation_models::{Issue, ModerationConfig};
use once_cell::sync::Lazy;
use regex::Regex;

/// Standard email pattern.
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("Invalid email regex")
});

/// Phone candidates: optional international prefix, digit groups separated by
/// spaces, dots or dashes. Candidates still need >= 8 digits to count.
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\+?\d{1,3}(?:[ .\-]?\d{2,4}){2,5}").expect("Invalid phone regex")
});

/// Links with an explicit scheme or a bare www. prefix.
static URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:https?://|www\.)[^\s<>()]+").expect("Invalid URL regex"));

/// Run every detector in a fixed order and collect the findings.
pub fn run_detectors(text: &str, config: &ModerationConfig) -> Vec<Issue> {
    let mut issues = Vec::new();
    issues.extend(detect_forbidden_words(text, config));
    issues.extend(detect_suspicious_phrases(text, config));
    issues.extend(detect_email(text, config));
    issues.extend(detect_phone(text, config));
    issues.extend(detect_suspicious_urls(text, config));
    issues.extend(detect_excessive_caps(text, config));
    issues.extend(detect_spam_patterns(text, config));
    issues
}

/// Case-insensitive match against the forbidden vocabulary, tokenized on word
/// boundaries so "class" never matches "ass". Weight scales with the number
/// of occurrences, capped.
pub fn detect_forbidden_words(text: &str, config: &ModerationConfig) -> Option<Issue> {
    let lowered = text.to_lowercase();
    let mut matched: Vec<String> = Vec::new();
    let mut occurrences: u32 = 0;

    for token in lowered.split(|c: char| !c.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        if config.forbidden_words.iter().any(|w| w == token) {
            occurrences += 1;
            if !matched.iter().any(|m| m == token) {
                matched.push(token.to_string());
            }
        }
    }

    if occurrences == 0 {
        return None;
    }

    let weight = (config.forbidden_word_weight * occurrences).min(config.forbidden_word_weight_cap);
    Some(Issue::ForbiddenWords {
        weight,
        words: matched,
        matches: occurrences,
    })
}

/// Match known scam/solicitation phrase templates. One issue per template
/// family, with the first matched template as evidence.
pub fn detect_suspicious_phrases(text: &str, config: &ModerationConfig) -> Vec<Issue> {
    let lowered = text.to_lowercase();
    let mut issues = Vec::new();

    for family in &config.phrase_families {
        if let Some(template) = family.templates.iter().find(|t| lowered.contains(t.as_str())) {
            issues.push(Issue::SuspiciousPhrases {
                weight: config.suspicious_phrase_weight,
                phrase: template.clone(),
            });
        }
    }

    issues
}

/// One issue if any email address appears, regardless of count.
pub fn detect_email(text: &str, config: &ModerationConfig) -> Option<Issue> {
    if EMAIL_REGEX.is_match(text) {
        Some(Issue::EmailDetected {
            weight: config.email_weight,
        })
    } else {
        None
    }
}

/// One issue if any phone number appears. The regex is tolerant of
/// separators; a candidate must contain at least 8 digits to count, which
/// filters out prices and years.
pub fn detect_phone(text: &str, config: &ModerationConfig) -> Option<Issue> {
    let found = PHONE_REGEX
        .find_iter(text)
        .any(|m| m.as_str().chars().filter(|c| c.is_ascii_digit()).count() >= 8);

    if found {
        Some(Issue::PhoneDetected {
            weight: config.phone_weight,
        })
    } else {
        None
    }
}

/// Flag URLs whose host is not on the allow-list. One issue per distinct
/// offending URL.
pub fn detect_suspicious_urls(text: &str, config: &ModerationConfig) -> Vec<Issue> {
    let mut issues: Vec<Issue> = Vec::new();

    for m in URL_REGEX.find_iter(text) {
        let url = m
            .as_str()
            .trim_end_matches(|c| matches!(c, '.' | ',' | '!' | '?' | ';'));
        let host = url_host(url);
        if host.is_empty() || host_is_allowed(&host, config) {
            continue;
        }
        let duplicate = issues
            .iter()
            .any(|i| matches!(i, Issue::SuspiciousUrl { url: seen, .. } if seen == url));
        if !duplicate {
            issues.push(Issue::SuspiciousUrl {
                weight: config.suspicious_url_weight,
                url: url.to_string(),
            });
        }
    }

    issues
}

/// Normalized host of a URL: scheme, www., port and path stripped, lowercased.
fn url_host(url: &str) -> String {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let end = rest
        .find(|c| matches!(c, '/' | ':' | '?' | '#'))
        .unwrap_or(rest.len());
    rest[..end].to_lowercase()
}

fn host_is_allowed(host: &str, config: &ModerationConfig) -> bool {
    config
        .allowed_domains
        .iter()
        .any(|d| host == d.as_str() || host.ends_with(&format!(".{}", d)))
}

/// Uppercase ratio over letters in tokens of length >= 4. The minimum letter
/// count keeps short text and acronyms from tripping it.
pub fn detect_excessive_caps(text: &str, config: &ModerationConfig) -> Option<Issue> {
    let mut letters = 0usize;
    let mut uppercase = 0usize;

    for token in text.split_whitespace() {
        if token.chars().count() < 4 {
            continue;
        }
        for c in token.chars().filter(|c| c.is_alphabetic()) {
            letters += 1;
            if c.is_uppercase() {
                uppercase += 1;
            }
        }
    }

    if letters < config.caps_min_letters {
        return None;
    }

    let ratio = uppercase as f32 / letters as f32;
    if ratio > config.caps_ratio_threshold {
        Some(Issue::CapsLock {
            weight: config.caps_weight,
            ratio,
        })
    } else {
        None
    }
}

/// Repeated-character runs, one token repeated to fill the message, or
/// excessive punctuation/symbol density. One issue with the first signal
/// that fires as evidence.
pub fn detect_spam_patterns(text: &str, config: &ModerationConfig) -> Option<Issue> {
    let signal = if has_repeated_run(text, config.spam_run_length) {
        Some("repeated character run")
    } else if has_dominant_token(text) {
        Some("repeated token")
    } else if symbol_density_exceeded(text, config) {
        Some("high symbol density")
    } else {
        None
    };

    signal.map(|s| Issue::SpamPattern {
        weight: config.spam_weight,
        signal: s.to_string(),
    })
}

/// True if any non-whitespace character repeats `threshold` times in a row.
fn has_repeated_run(text: &str, threshold: usize) -> bool {
    let mut prev = '\0';
    let mut count = 0usize;

    for c in text.chars() {
        if c.is_whitespace() {
            prev = '\0';
            count = 0;
            continue;
        }
        if c == prev {
            count += 1;
            if count >= threshold {
                return true;
            }
        } else {
            prev = c;
            count = 1;
        }
    }

    false
}

/// True if the message is mostly one token repeated over and over.
fn has_dominant_token(text: &str) -> bool {
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect();
    if tokens.len() < 5 {
        return false;
    }

    let mut best = 0usize;
    for token in &tokens {
        let count = tokens.iter().filter(|t| *t == token).count();
        if count > best {
            best = count;
        }
    }

    best * 2 > tokens.len()
}

fn symbol_density_exceeded(text: &str, config: &ModerationConfig) -> bool {
    let visible: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if visible.len() < config.spam_symbol_min_len {
        return false;
    }

    let symbols = visible.iter().filter(|c| !c.is_alphanumeric()).count();
    symbols as f32 / visible.len() as f32 >= config.spam_symbol_ratio
}
