// Scorer - aggregates detector findings into a 0-100 score and a severity
// tier. Pure functions, no storage access, fully deterministic.

use super::moderation_models::{Issue, ModerationConfig, Severity};

/// Sum issue weights, clamped to 0..=100.
pub fn score_issues(issues: &[Issue]) -> u32 {
    issues.iter().map(|i| i.weight()).sum::<u32>().min(100)
}

/// Severity tier for a score. Inclusive lower bounds, highest tier wins;
/// scores below 20 have no tier.
pub fn severity_for_score(score: u32) -> Option<Severity> {
    match score {
        0..=19 => None,
        20..=39 => Some(Severity::Low),
        40..=69 => Some(Severity::Medium),
        70..=89 => Some(Severity::High),
        _ => Some(Severity::Critical),
    }
}

/// Score the issue set and apply the CRITICAL ceiling override: a
/// forbidden-word occurrence count at or above the configured cap forces
/// severity to CRITICAL regardless of the aggregate score.
pub fn classify(issues: &[Issue], config: &ModerationConfig) -> (u32, Option<Severity>) {
    let score = score_issues(issues);
    let mut severity = severity_for_score(score);

    let forced_critical = issues.iter().any(|i| {
        matches!(i, Issue::ForbiddenWords { matches, .. }
            if *matches >= config.forbidden_critical_count)
    });
    if forced_critical {
        severity = Some(Severity::Critical);
    }

    (score, severity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> Issue {
        Issue::PhoneDetected { weight: 20 }
    }

    fn url(weight: u32) -> Issue {
        Issue::SuspiciousUrl {
            weight,
            url: "https://bit.ly/x".to_string(),
        }
    }

    #[test]
    fn test_score_sums_and_clamps() {
        assert_eq!(score_issues(&[]), 0);
        assert_eq!(score_issues(&[phone()]), 20);
        assert_eq!(score_issues(&[url(60), url(60)]), 100);
    }

    #[test]
    fn test_severity_tier_bounds() {
        assert_eq!(severity_for_score(0), None);
        assert_eq!(severity_for_score(19), None);
        assert_eq!(severity_for_score(20), Some(Severity::Low));
        assert_eq!(severity_for_score(39), Some(Severity::Low));
        assert_eq!(severity_for_score(40), Some(Severity::Medium));
        assert_eq!(severity_for_score(69), Some(Severity::Medium));
        assert_eq!(severity_for_score(70), Some(Severity::High));
        assert_eq!(severity_for_score(89), Some(Severity::High));
        assert_eq!(severity_for_score(90), Some(Severity::Critical));
        assert_eq!(severity_for_score(100), Some(Severity::Critical));
    }

    #[test]
    fn test_adding_an_issue_never_lowers_the_score() {
        let base = vec![phone(), url(20)];
        let base_score = score_issues(&base);

        let mut extended = base.clone();
        extended.push(Issue::EmailDetected { weight: 15 });
        assert!(score_issues(&extended) >= base_score);
    }

    #[test]
    fn test_critical_ceiling_override() {
        let config = ModerationConfig::default();

        // Capped weight keeps the aggregate at HIGH, but the occurrence
        // count forces CRITICAL.
        let issues = vec![Issue::ForbiddenWords {
            weight: config.forbidden_word_weight_cap,
            words: vec!["merde".to_string()],
            matches: config.forbidden_critical_count,
        }];
        let (score, severity) = classify(&issues, &config);
        assert_eq!(score, 80);
        assert_eq!(severity, Some(Severity::Critical));

        // Below the occurrence cap the aggregate score decides.
        let issues = vec![Issue::ForbiddenWords {
            weight: 50,
            words: vec!["merde".to_string()],
            matches: 2,
        }];
        let (_, severity) = classify(&issues, &config);
        assert_eq!(severity, Some(Severity::Medium));
    }
}
