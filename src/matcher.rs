use crate::outcome::Severity;
use crate::rules::{RuleSetKind, RuleSpec};
use crate::statistics::CascadeObserver;
use anyhow::Result;
use regex::{Captures, Regex, RegexBuilder};

/// A rule with its pattern compiled.
///
/// Matching is always case-insensitive. Multiline rules additionally let
/// `.` match `\n`, which is needed for folded `Diagnostic-Code` values.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    regex: Regex,
    severity: Severity,
    email_group: Option<usize>,
}

impl CompiledRule {
    pub fn compile(spec: &RuleSpec) -> Result<Self> {
        let regex = RegexBuilder::new(&spec.pattern)
            .case_insensitive(true)
            .dot_matches_new_line(spec.multiline)
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid regex pattern '{}': {}", spec.pattern, e))?;

        if let Some(group) = spec.email_group {
            // captures_len() counts the implicit whole-match group 0
            if group == 0 || group >= regex.captures_len() {
                anyhow::bail!(
                    "Pattern '{}' has no capture group {} for the email address",
                    spec.pattern,
                    group
                );
            }
        }

        Ok(CompiledRule {
            regex,
            severity: spec.severity,
            email_group: spec.email_group,
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn email_group(&self) -> Option<usize> {
        self.email_group
    }

    /// Captures of the first match in `text`, or `None`. Never fails.
    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.regex.captures(text)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// The rule that decided a cascade stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleHit {
    pub set: RuleSetKind,
    pub index: usize,
    pub severity: Severity,
    /// Address captured by the rule's email group, if it has one.
    pub email: Option<String>,
}

/// Ordered rules of one kind. The first match wins.
#[derive(Debug, Clone)]
pub struct RuleSet {
    kind: RuleSetKind,
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn new(kind: RuleSetKind, rules: Vec<CompiledRule>) -> Self {
        Self { kind, rules }
    }

    pub fn kind(&self) -> RuleSetKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Try every rule in order against `text` and stop at the first match.
    ///
    /// An empty `text` matches nothing and consults no rule.
    pub fn first_match(&self, text: &str, observer: &dyn CascadeObserver) -> Option<RuleHit> {
        if text.is_empty() {
            return None;
        }

        for (index, rule) in self.rules.iter().enumerate() {
            observer.rule_evaluated(self.kind, index);
            let Some(caps) = rule.captures(text) else {
                continue;
            };
            observer.rule_matched(self.kind, index);

            let email = rule
                .email_group
                .and_then(|group| caps.get(group))
                .map(|m| m.as_str().to_string());

            log::debug!(
                "{}[{}] matched ({}): {}",
                self.kind,
                index,
                rule.severity,
                rule.pattern()
            );
            return Some(RuleHit {
                set: self.kind,
                index,
                severity: rule.severity,
                email,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::NoopObserver;

    fn spec(pattern: &str, severity: Severity) -> RuleSpec {
        RuleSpec {
            pattern: pattern.to_string(),
            severity,
            multiline: false,
            email_group: None,
        }
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let rule = CompiledRule::compile(&spec("user unknown", Severity::Hard)).unwrap();
        assert!(rule.is_match("550 USER UNKNOWN"));
        assert!(rule.is_match("User Unknown here"));
        assert!(!rule.is_match("user is known"));
    }

    #[test]
    fn test_multiline_lets_dot_cross_folded_lines() {
        let folded = "smtp; 550 5.2.2 the user's\n\tmailbox is full";
        let single = CompiledRule::compile(&spec("user.*full", Severity::Soft)).unwrap();
        assert!(!single.is_match(folded));

        let multi = CompiledRule::compile(&RuleSpec {
            multiline: true,
            ..spec("user.*full", Severity::Soft)
        })
        .unwrap();
        assert!(multi.is_match(folded));
    }

    #[test]
    fn test_first_match_wins_in_author_order() {
        let rules = vec![
            CompiledRule::compile(&spec("over quota", Severity::Soft)).unwrap(),
            CompiledRule::compile(&spec("quota", Severity::Hard)).unwrap(),
        ];
        let set = RuleSet::new(RuleSetKind::Common, rules);

        let hit = set.first_match("mailbox over quota", &NoopObserver).unwrap();
        assert_eq!(hit.index, 0);
        assert_eq!(hit.severity, Severity::Soft);

        let hit = set.first_match("quota reached", &NoopObserver).unwrap();
        assert_eq!(hit.index, 1);
        assert_eq!(hit.severity, Severity::Hard);
    }

    #[test]
    fn test_email_group_extraction() {
        let rule = CompiledRule::compile(&RuleSpec {
            email_group: Some(1),
            ..spec(r"<(\S+@\S+\w)>.*user unknown", Severity::Hard)
        })
        .unwrap();
        let set = RuleSet::new(RuleSetKind::Body, vec![rule]);
        let hit = set
            .first_match("<jdoe@example.com>: user unknown", &NoopObserver)
            .unwrap();
        assert_eq!(hit.email.as_deref(), Some("jdoe@example.com"));
    }

    #[test]
    fn test_empty_text_and_no_match() {
        let set = RuleSet::new(
            RuleSetKind::Common,
            vec![CompiledRule::compile(&spec(".*", Severity::Hard)).unwrap()],
        );
        assert_eq!(set.first_match("", &NoopObserver), None);

        let set = RuleSet::new(
            RuleSetKind::Common,
            vec![CompiledRule::compile(&spec("quota", Severity::Hard)).unwrap()],
        );
        assert_eq!(set.first_match("all good", &NoopObserver), None);
    }

    #[test]
    fn test_group_zero_is_not_an_email_group() {
        let err = CompiledRule::compile(&RuleSpec {
            email_group: Some(0),
            ..spec(r"(\S+@\S+)", Severity::Hard)
        });
        assert!(err.is_err());
    }
}
