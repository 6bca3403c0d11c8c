// Decision engine - maps score + severity + issues to a final verdict.
//
// Side-effect free so the block rules can be unit-tested exhaustively.

use super::moderation_models::{Issue, IssueKind, ModerationVerdict, Severity};

/// Fixed remediation string for an issue kind. Email and phone share the
/// same text on purpose; the suggestion list de-duplicates it.
pub fn suggestion_for(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::ForbiddenWords => "Supprimez les termes injurieux ou interdits de votre contenu",
        IssueKind::SuspiciousPhrases => {
            "Les sollicitations et paiements hors plateforme ne sont pas autorisés"
        }
        IssueKind::EmailDetected | IssueKind::PhoneDetected => {
            "Évitez de partager vos coordonnées dans le contenu public"
        }
        IssueKind::SuspiciousUrl => "Retirez les liens vers des sites externes non vérifiés",
        IssueKind::CapsLock => "Évitez d'écrire votre message entièrement en majuscules",
        IssueKind::SpamPattern => "Réduisez les répétitions et la ponctuation excessive",
        IssueKind::RepeatOffender => {
            "Votre historique de modération entraîne un examen renforcé de vos contenus"
        }
    }
}

/// Build the verdict for a scored issue set.
///
/// Block rules: HIGH and CRITICAL always block; MEDIUM blocks only when the
/// issues include explicit language or scam phrases. MEDIUM generic noise
/// (caps + a URL) is flagged but allowed.
pub fn decide(score: u32, severity: Option<Severity>, issues: Vec<Issue>) -> ModerationVerdict {
    let is_clean = issues.is_empty();

    let has_explicit = issues.iter().any(|i| {
        matches!(
            i.kind(),
            IssueKind::ForbiddenWords | IssueKind::SuspiciousPhrases
        )
    });

    let should_block = match severity {
        Some(Severity::High) | Some(Severity::Critical) => true,
        Some(Severity::Medium) => has_explicit,
        _ => false,
    };

    let mut suggestions: Vec<String> = Vec::new();
    for issue in &issues {
        let text = suggestion_for(issue.kind());
        if !suggestions.iter().any(|s| s == text) {
            suggestions.push(text.to_string());
        }
    }

    ModerationVerdict {
        is_clean,
        should_block,
        severity,
        score,
        issues,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forbidden() -> Issue {
        Issue::ForbiddenWords {
            weight: 25,
            words: vec!["merde".to_string()],
            matches: 1,
        }
    }

    #[test]
    fn test_empty_issue_set_is_clean() {
        let verdict = decide(0, None, Vec::new());
        assert!(verdict.is_clean);
        assert!(!verdict.should_block);
        assert_eq!(verdict.severity, None);
        assert!(verdict.suggestions.is_empty());
    }

    #[test]
    fn test_medium_generic_noise_is_flagged_not_blocked() {
        let issues = vec![
            Issue::CapsLock {
                weight: 20,
                ratio: 0.9,
            },
            Issue::SuspiciousUrl {
                weight: 20,
                url: "https://bit.ly/x".to_string(),
            },
        ];
        let verdict = decide(40, Some(Severity::Medium), issues);
        assert!(!verdict.is_clean);
        assert!(!verdict.should_block);
    }

    #[test]
    fn test_medium_with_explicit_language_blocks() {
        let issues = vec![forbidden(), Issue::PhoneDetected { weight: 20 }];
        let verdict = decide(45, Some(Severity::Medium), issues);
        assert!(verdict.should_block);
    }

    #[test]
    fn test_high_and_critical_always_block() {
        let issues = vec![Issue::SpamPattern {
            weight: 20,
            signal: "repeated character run".to_string(),
        }];
        assert!(decide(70, Some(Severity::High), issues.clone()).should_block);
        assert!(decide(95, Some(Severity::Critical), issues).should_block);
    }

    #[test]
    fn test_sub_low_is_recorded_but_not_blocked() {
        let verdict = decide(15, None, vec![Issue::EmailDetected { weight: 15 }]);
        assert!(!verdict.is_clean);
        assert!(!verdict.should_block);
        assert_eq!(verdict.severity, None);
    }

    #[test]
    fn test_suggestions_follow_issue_order_and_deduplicate() {
        let issues = vec![
            Issue::EmailDetected { weight: 15 },
            Issue::PhoneDetected { weight: 20 },
            Issue::SuspiciousUrl {
                weight: 20,
                url: "https://bit.ly/x".to_string(),
            },
        ];
        let verdict = decide(55, Some(Severity::Medium), issues);

        // Email and phone share one remediation string, emitted once.
        assert_eq!(verdict.suggestions.len(), 2);
        assert_eq!(
            verdict.suggestions[0],
            "Évitez de partager vos coordonnées dans le contenu public"
        );
        assert_eq!(
            verdict.suggestions[1],
            "Retirez les liens vers des sites externes non vérifiés"
        );
    }
}
