pub mod builtin;

use crate::matcher::{CompiledRule, RuleSet};
use crate::outcome::Severity;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// The four rule sets, in the order they are stored in a [`RuleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSetKind {
    DiagnosticCode,
    DeliveryStatusMessage,
    Body,
    Common,
}

impl RuleSetKind {
    pub const ALL: [RuleSetKind; 4] = [
        RuleSetKind::DiagnosticCode,
        RuleSetKind::DeliveryStatusMessage,
        RuleSetKind::Body,
        RuleSetKind::Common,
    ];

    pub fn index(self) -> usize {
        match self {
            RuleSetKind::DiagnosticCode => 0,
            RuleSetKind::DeliveryStatusMessage => 1,
            RuleSetKind::Body => 2,
            RuleSetKind::Common => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RuleSetKind::DiagnosticCode => "diagnostic_code",
            RuleSetKind::DeliveryStatusMessage => "delivery_status_message",
            RuleSetKind::Body => "body",
            RuleSetKind::Common => "common",
        }
    }
}

impl fmt::Display for RuleSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declarative form of a single rule, as authored in YAML or in the
/// built-in catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub pattern: String,
    pub severity: Severity,
    /// Let `.` match line breaks, for values folded over several lines.
    #[serde(default)]
    pub multiline: bool,
    /// Capture group holding the bounced address. Body rules only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_group: Option<usize>,
}

impl From<&builtin::BuiltinRule> for RuleSpec {
    fn from(rule: &builtin::BuiltinRule) -> Self {
        RuleSpec {
            pattern: rule.pattern.to_string(),
            severity: rule.severity,
            multiline: rule.multiline,
            email_group: rule.email_group,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleTableSpec {
    #[serde(default)]
    pub diagnostic_code: Vec<RuleSpec>,
    #[serde(default)]
    pub delivery_status_message: Vec<RuleSpec>,
    #[serde(default)]
    pub body: Vec<RuleSpec>,
    #[serde(default)]
    pub common: Vec<RuleSpec>,
}

impl RuleTableSpec {
    pub fn builtin() -> Self {
        let convert = |rules: &[builtin::BuiltinRule]| rules.iter().map(RuleSpec::from).collect();
        RuleTableSpec {
            diagnostic_code: convert(builtin::DIAGNOSTIC_CODE_RULES),
            delivery_status_message: convert(builtin::DELIVERY_STATUS_MESSAGE_RULES),
            body: convert(builtin::BODY_RULES),
            common: convert(builtin::COMMON_RULES),
        }
    }

    pub fn rules(&self, kind: RuleSetKind) -> &[RuleSpec] {
        match kind {
            RuleSetKind::DiagnosticCode => &self.diagnostic_code,
            RuleSetKind::DeliveryStatusMessage => &self.delivery_status_message,
            RuleSetKind::Body => &self.body,
            RuleSetKind::Common => &self.common,
        }
    }
}

/// Compiled, read-only rule catalog shared by the classifiers.
///
/// Build it once (usually behind an `Arc`) and hand it to every
/// classifier; nothing in it changes after construction.
#[derive(Debug)]
pub struct RuleTable {
    sets: [RuleSet; 4],
}

impl RuleTable {
    /// Compile the embedded catalog.
    pub fn builtin() -> Result<Self> {
        Self::compile(&RuleTableSpec::builtin()).context("Built-in rule table failed to compile")
    }

    pub fn compile(spec: &RuleTableSpec) -> Result<Self> {
        let [a, b, c, d] = RuleSetKind::ALL;
        let sets = [
            compile_set(a, spec.rules(a))?,
            compile_set(b, spec.rules(b))?,
            compile_set(c, spec.rules(c))?,
            compile_set(d, spec.rules(d))?,
        ];
        log::debug!(
            "Compiled rule table: {} diagnostic-code, {} delivery-status-message, {} body, {} common",
            sets[0].len(),
            sets[1].len(),
            sets[2].len(),
            sets[3].len()
        );
        Ok(RuleTable { sets })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let spec: RuleTableSpec =
            serde_yaml::from_str(content).context("Failed to parse rule table YAML")?;
        Self::compile(&spec)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read rule file: {}", path.as_ref().display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid rule file: {}", path.as_ref().display()))
    }

    pub fn set(&self, kind: RuleSetKind) -> &RuleSet {
        &self.sets[kind.index()]
    }

    /// Total number of rules across all sets.
    pub fn len(&self) -> usize {
        self.sets.iter().map(RuleSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compile_set(kind: RuleSetKind, specs: &[RuleSpec]) -> Result<RuleSet> {
    let mut rules = Vec::with_capacity(specs.len());
    for (index, spec) in specs.iter().enumerate() {
        if spec.email_group.is_some() && kind != RuleSetKind::Body {
            anyhow::bail!("Rule {kind}[{index}] sets email_group, which only body rules may do");
        }
        let rule = CompiledRule::compile(spec)
            .with_context(|| format!("Invalid rule {kind}[{index}]"))?;
        rules.push(rule);
    }
    Ok(RuleSet::new(kind, rules))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_compiles() {
        let table = RuleTable::builtin().unwrap();
        assert_eq!(
            table.set(RuleSetKind::DiagnosticCode).len(),
            builtin::DIAGNOSTIC_CODE_RULES.len()
        );
        assert_eq!(
            table.set(RuleSetKind::DeliveryStatusMessage).len(),
            builtin::DELIVERY_STATUS_MESSAGE_RULES.len()
        );
        assert_eq!(table.set(RuleSetKind::Body).len(), builtin::BODY_RULES.len());
        assert_eq!(table.set(RuleSetKind::Common).len(), builtin::COMMON_RULES.len());
        assert!(table.len() > 150);
    }

    #[test]
    fn test_every_body_rule_names_an_email_group() {
        assert!(builtin::BODY_RULES.iter().all(|r| r.email_group == Some(1)));
        assert!(builtin::COMMON_RULES.iter().all(|r| r.email_group.is_none()));
    }

    #[test]
    fn test_malformed_pattern_is_a_load_error() {
        let yaml = r#"
diagnostic_code:
  - pattern: "mailbox full"
    severity: soft
  - pattern: "(unclosed"
    severity: hard
"#;
        let err = RuleTable::from_yaml_str(yaml).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("diagnostic_code[1]"), "{message}");
    }

    #[test]
    fn test_email_group_outside_body_rejected() {
        let yaml = r#"
common:
  - pattern: "(\\S+@\\S+) bounced"
    severity: hard
    email_group: 1
"#;
        let err = RuleTable::from_yaml_str(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("only body rules"));
    }

    #[test]
    fn test_email_group_must_exist() {
        let yaml = r#"
body:
  - pattern: "(\\S+@\\S+) bounced"
    severity: hard
    email_group: 2
"#;
        assert!(RuleTable::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_unknown_rule_field_rejected() {
        let yaml = r#"
body:
  - pattern: "x"
    severity: hard
    priority: 3
"#;
        assert!(RuleTable::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_rule_file_round_trip() {
        let spec = RuleTableSpec::builtin();
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), serde_yaml::to_string(&spec).unwrap()).unwrap();

        let table = RuleTable::from_file(file.path()).unwrap();
        assert_eq!(table.len(), RuleTable::builtin().unwrap().len());
    }

    #[test]
    fn test_missing_rule_file_names_the_path() {
        let err = RuleTable::from_file("/nonexistent/rules.yaml").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/rules.yaml"));
    }
}
