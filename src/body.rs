//! Classification of free-text bounce bodies.

use crate::outcome::{BounceOutcome, Severity};
use crate::rules::{RuleSetKind, RuleTable};
use crate::statistics::{CascadeObserver, NoopObserver};
use std::sync::Arc;

pub struct BodyClassifier {
    rules: Arc<RuleTable>,
    observer: Arc<dyn CascadeObserver>,
}

impl BodyClassifier {
    pub fn new(rules: Arc<RuleTable>) -> Self {
        Self {
            rules,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn CascadeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Classify a decoded bounce body.
    ///
    /// An empty body is a hard bounce. Body rules run first and may also
    /// yield the bounced address; common rules only decide the severity.
    pub fn classify(&self, body: &str) -> BounceOutcome {
        let mut outcome = BounceOutcome::default();

        if body.is_empty() {
            log::debug!("Empty bounce body, classifying as hard");
            outcome.severity = Some(Severity::Hard);
            return outcome;
        }

        let observer = self.observer.as_ref();
        if let Some(hit) = self.rules.set(RuleSetKind::Body).first_match(body, observer) {
            outcome.severity = Some(hit.severity);
            outcome.email = hit.email;
            return outcome;
        }

        match self.rules.set(RuleSetKind::Common).first_match(body, observer) {
            Some(hit) => outcome.severity = Some(hit.severity),
            None => log::debug!("No rule matched the bounce body"),
        }
        outcome
    }
}
