use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a bounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Permanent failure, the recipient should be removed.
    Hard,
    /// Transient failure, delivery may succeed later.
    Soft,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Hard => write!(f, "hard"),
            Severity::Soft => write!(f, "soft"),
        }
    }
}

/// Result of classifying one bounce message.
///
/// `action`, `status_code` and `diagnostic_code` are only ever set on the
/// delivery-status path; a body-only bounce leaves them empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BounceOutcome {
    pub email: Option<String>,
    pub severity: Option<Severity>,
    pub action: Option<String>,
    pub status_code: Option<String>,
    pub diagnostic_code: Option<String>,
}

impl BounceOutcome {
    pub fn is_hard(&self) -> bool {
        self.severity == Some(Severity::Hard)
    }

    pub fn is_soft(&self) -> bool {
        self.severity == Some(Severity::Soft)
    }
}
