use crate::rules::RuleTable;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PROCESS_LIMIT: usize = 3000;

/// Handler options. Unknown keys in the YAML file are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Attach the raw header block of each bounce to its result.
    pub return_headers: bool,
    /// Attach the raw body (which usually embeds the original message).
    pub return_body: bool,
    /// Attach the returned original message (part 3).
    pub return_original_email: bool,
    /// Attach the original message's headers as a map, useful for reading
    /// back custom headers set when sending.
    pub return_original_email_headers_array: bool,
    /// Maximum number of messages classified per run, 0 for no limit.
    pub process_limit: usize,
    pub delete_after_processing: bool,
    /// Mailbox search criterion; defaults to today's undeleted messages.
    pub search_criterion: Option<String>,
    /// YAML rule table replacing the built-in one.
    pub rules_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            return_headers: false,
            return_body: false,
            return_original_email: false,
            return_original_email_headers_array: false,
            process_limit: DEFAULT_PROCESS_LIMIT,
            delete_after_processing: false,
            search_criterion: None,
            rules_file: None,
        }
    }
}

pub fn default_search_criterion(today: NaiveDate) -> String {
    format!("UNDELETED SINCE \"{}\"", today.format("%d-%b-%Y"))
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(criterion) = &self.search_criterion {
            if criterion.trim().is_empty() {
                anyhow::bail!("search_criterion is set but blank");
            }
        }
        if let Some(rules_file) = &self.rules_file {
            if !rules_file.is_file() {
                anyhow::bail!("rules_file does not exist: {}", rules_file.display());
            }
        }
        Ok(())
    }

    /// The configured criterion, or `UNDELETED SINCE "<today>"`.
    pub fn search_criterion(&self) -> String {
        match &self.search_criterion {
            Some(criterion) => criterion.clone(),
            None => default_search_criterion(chrono::Local::now().date_naive()),
        }
    }

    pub fn load_rule_table(&self) -> Result<RuleTable> {
        match &self.rules_file {
            Some(path) => {
                log::info!("Loading rule table from {}", path.display());
                RuleTable::from_file(path)
            }
            None => RuleTable::builtin(),
        }
    }
}

/// Load `path`, or fall back to defaults with a warning when it cannot be
/// read or parsed.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Config {
    match Config::from_file(&path) {
        Ok(config) => {
            log::info!("Loaded configuration from: {}", path.as_ref().display());
            config
        }
        Err(e) => {
            log::warn!("Failed to load config ({:#}), using defaults", e);
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.process_limit, 3000);
        assert!(!config.delete_after_processing);
        assert!(!config.return_headers);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_search_criterion_format() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 6).unwrap();
        assert_eq!(default_search_criterion(date), "UNDELETED SINCE \"06-Oct-2026\"");

        let config = Config {
            search_criterion: Some("UNSEEN".to_string()),
            ..Default::default()
        };
        assert_eq!(config.search_criterion(), "UNSEEN");
        assert!(Config::default().search_criterion().starts_with("UNDELETED SINCE \""));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("return_headers: true\nprocess_limit: 10\n").unwrap();
        assert!(config.return_headers);
        assert_eq!(config.process_limit, 10);
        assert!(!config.return_body);
    }

    #[test]
    fn test_unknown_option_rejected() {
        let result: Result<Config, _> = serde_yaml::from_str("password: hunter2\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_criterion_invalid() {
        let config = Config {
            search_criterion: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_rules_file_invalid() {
        let config = Config {
            rules_file: Some(PathBuf::from("/nonexistent/rules.yaml")),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bounce-handler.yaml");
        let config = Config {
            return_original_email: true,
            delete_after_processing: true,
            search_criterion: Some("ALL".to_string()),
            ..Default::default()
        };
        config.to_file(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let config = load_config_or_default("/nonexistent/bounce-handler.yaml");
        assert_eq!(config, Config::default());
    }
}
