//! Classification of structured delivery status notifications.

use crate::outcome::{BounceOutcome, Severity};
use crate::report::DeliveryStatus;
use crate::rules::{RuleSetKind, RuleTable};
use crate::statistics::{CascadeObserver, NoopObserver};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

lazy_static! {
    // quota bounces that carry no usable recipient field
    static ref QUOTA_RECIPIENT: Regex =
        Regex::new(r"(?is)quota exceed.*<(\S+@\S+\w)>").expect("valid regex");
}

const CASCADE: [RuleSetKind; 3] = [
    RuleSetKind::DiagnosticCode,
    RuleSetKind::DeliveryStatusMessage,
    RuleSetKind::Common,
];

pub struct DsnClassifier {
    rules: Arc<RuleTable>,
    observer: Arc<dyn CascadeObserver>,
}

impl DsnClassifier {
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

    /// Classify one DSN from its delivery-status fields and the
    /// human-readable `explanation` part.
    ///
    /// Without a recipient only the quota fallback is tried. A recipient
    /// with a non-`failed` action is always soft. Otherwise the
    /// diagnostic code, then the explanation, then the common phrases are
    /// matched, stopping at the first hit.
    pub fn classify(&self, status: &DeliveryStatus, explanation: &str) -> BounceOutcome {
        let mut outcome = BounceOutcome {
            action: status.action.clone(),
            status_code: status.status_code.clone(),
            diagnostic_code: status.diagnostic_code.clone(),
            ..Default::default()
        };

        let recipient = status.recipient.as_deref().filter(|r| !r.is_empty());
        let Some(recipient) = recipient else {
            if let Some(email) = quota_recipient(explanation) {
                log::debug!("No recipient field, quota fallback found {email}");
                outcome.email = Some(email);
                outcome.severity = Some(Severity::Soft);
            }
            return outcome;
        };

        outcome.email = Some(recipient.to_string());

        if !status.is_failed() {
            log::debug!(
                "Action {:?} for {recipient} is not a failure, classifying as soft",
                status.action
            );
            outcome.severity = Some(Severity::Soft);
            return outcome;
        }

        let diagnostic = status.diagnostic_code.as_deref().unwrap_or("").trim();
        outcome.severity = CASCADE.iter().find_map(|&kind| {
            let text = match kind {
                RuleSetKind::DiagnosticCode => diagnostic,
                _ => explanation,
            };
            self.rules
                .set(kind)
                .first_match(text, self.observer.as_ref())
                .map(|hit| hit.severity)
        });

        if outcome.severity.is_none() {
            log::debug!("No rule matched the failed DSN for {recipient}");
        }
        outcome
    }
}

fn quota_recipient(explanation: &str) -> Option<String> {
    QUOTA_RECIPIENT
        .captures(explanation)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
