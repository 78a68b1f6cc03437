use crate::rules::{RuleSetKind, RuleTable};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives a callback for every rule the cascade consults.
///
/// Implementations must be cheap; they run inside the match loop.
pub trait CascadeObserver: Send + Sync {
    fn rule_evaluated(&self, _set: RuleSetKind, _index: usize) {}

    fn rule_matched(&self, _set: RuleSetKind, _index: usize) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CascadeObserver for NoopObserver {}

#[derive(Debug)]
struct SetCounters {
    evaluations: Vec<AtomicU64>,
    matches: Vec<AtomicU64>,
}

impl SetCounters {
    fn new(len: usize) -> Self {
        Self {
            evaluations: (0..len).map(|_| AtomicU64::new(0)).collect(),
            matches: (0..len).map(|_| AtomicU64::new(0)).collect(),
        }
    }
}

/// Per-rule evaluation and hit counters, safe to share across threads.
#[derive(Debug)]
pub struct RuleStatistics {
    sets: [SetCounters; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleStats {
    pub set: RuleSetKind,
    pub index: usize,
    pub pattern: String,
    pub evaluations: u64,
    pub matches: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub total_evaluations: u64,
    pub total_matches: u64,
    /// Rules with at least one match, most matched first.
    pub matched_rules: Vec<RuleStats>,
    pub unmatched_rules: Vec<RuleStats>,
}

impl RuleStatistics {
    pub fn new(table: &RuleTable) -> Self {
        let counters = |kind: RuleSetKind| SetCounters::new(table.set(kind).len());
        Self {
            sets: RuleSetKind::ALL.map(counters),
        }
    }

    pub fn evaluations(&self, set: RuleSetKind) -> u64 {
        self.sets[set.index()]
            .evaluations
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }

    pub fn matches(&self, set: RuleSetKind) -> u64 {
        self.sets[set.index()]
            .matches
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }

    pub fn rule_evaluations(&self, set: RuleSetKind, index: usize) -> u64 {
        self.sets[set.index()]
            .evaluations
            .get(index)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    pub fn rule_matches(&self, set: RuleSetKind, index: usize) -> u64 {
        self.sets[set.index()]
            .matches
            .get(index)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        for set in &self.sets {
            for counter in set.evaluations.iter().chain(set.matches.iter()) {
                counter.store(0, Ordering::Relaxed);
            }
        }
    }

    pub fn report(&self, table: &RuleTable) -> StatisticsReport {
        let mut matched_rules = Vec::new();
        let mut unmatched_rules = Vec::new();
        let mut total_evaluations = 0;
        let mut total_matches = 0;

        for kind in RuleSetKind::ALL {
            for (index, rule) in table.set(kind).rules().iter().enumerate() {
                let stats = RuleStats {
                    set: kind,
                    index,
                    pattern: rule.pattern().to_string(),
                    evaluations: self.rule_evaluations(kind, index),
                    matches: self.rule_matches(kind, index),
                };
                total_evaluations += stats.evaluations;
                total_matches += stats.matches;
                if stats.matches > 0 {
                    matched_rules.push(stats);
                } else {
                    unmatched_rules.push(stats);
                }
            }
        }

        matched_rules.sort_by(|a, b| b.matches.cmp(&a.matches));

        StatisticsReport {
            total_evaluations,
            total_matches,
            matched_rules,
            unmatched_rules,
        }
    }
}

impl CascadeObserver for RuleStatistics {
    fn rule_evaluated(&self, set: RuleSetKind, index: usize) {
        if let Some(counter) = self.sets[set.index()].evaluations.get(index) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn rule_matched(&self, set: RuleSetKind, index: usize) {
        if let Some(counter) = self.sets[set.index()].matches.get(index) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_evaluations_until_first_match() {
        let table = RuleTable::builtin().unwrap();
        let stats = RuleStatistics::new(&table);

        // second diagnostic-code rule ("...mailbox...full")
        let hit = table
            .set(RuleSetKind::DiagnosticCode)
            .first_match("552 5.2.2 mailbox full", &stats)
            .unwrap();
        assert_eq!(hit.index, 1);
        assert_eq!(stats.evaluations(RuleSetKind::DiagnosticCode), 2);
        assert_eq!(stats.rule_matches(RuleSetKind::DiagnosticCode, 1), 1);
        assert_eq!(stats.matches(RuleSetKind::Common), 0);
    }

    #[test]
    fn test_report_lists_unmatched_rules() {
        let table = RuleTable::builtin().unwrap();
        let stats = RuleStatistics::new(&table);
        table
            .set(RuleSetKind::Common)
            .first_match("please try later", &stats);

        let report = stats.report(&table);
        assert_eq!(report.total_matches, 1);
        assert_eq!(report.matched_rules.len(), 1);
        assert_eq!(report.matched_rules[0].set, RuleSetKind::Common);
        assert_eq!(report.unmatched_rules.len(), table.len() - 1);

        stats.reset();
        assert_eq!(stats.report(&table).total_evaluations, 0);
    }

    #[test]
    fn test_out_of_range_index_is_ignored() {
        let table = RuleTable::builtin().unwrap();
        let stats = RuleStatistics::new(&table);
        stats.rule_matched(RuleSetKind::Body, 10_000);
        assert_eq!(stats.rule_matches(RuleSetKind::Body, 10_000), 0);
    }
}
