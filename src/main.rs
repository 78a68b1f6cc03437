use bounce_handler::config::{load_config_or_default, Config};
use bounce_handler::statistics::StatisticsReport;
use bounce_handler::{
    BodyClassifier, BounceHandler, DeliveryStatus, DsnClassifier, MemoryMailbox, RuleSetKind,
    RuleStatistics, RuleTable,
};
use clap::{Arg, Command};
use log::LevelFilter;
use serde::Serialize;
use std::path::Path;
use std::process;
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "/etc/bounce-handler.yaml";

fn main() {
    let matches = Command::new("bounce-handler")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Classify bounced email as hard or soft and extract the failed recipient")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the configuration and rule table")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("mailbox")
                .long("mailbox")
                .value_name("FILE")
                .help("Process a YAML mailbox snapshot and print the results as JSON")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("classify-body")
                .long("classify-body")
                .value_name("FILE")
                .help("Classify a decoded bounce body")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("classify-dsn")
                .long("classify-dsn")
                .value_name("FILE")
                .help("Classify a delivery-status block")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("explanation")
                .long("explanation")
                .value_name("FILE")
                .help("Human-readable explanation part used with --classify-dsn")
                .requires("classify-dsn")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .help("Print per-rule hit statistics after processing")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_PATH);
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    let rules = match config.load_rule_table() {
        Ok(rules) => Arc::new(rules),
        Err(e) => {
            eprintln!("Error loading rule table: {e:#}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        println!("Testing configuration...");
        println!();
        println!("Process limit: {}", config.process_limit);
        println!("Search criterion: {}", config.search_criterion());
        println!("Delete after processing: {}", config.delete_after_processing);
        for kind in RuleSetKind::ALL {
            println!("Rules in {kind}: {}", rules.set(kind).len());
        }
        println!("All regex patterns compiled successfully.");
        return;
    }

    let stats = Arc::new(RuleStatistics::new(&rules));

    let result = if let Some(mailbox_file) = matches.get_one::<String>("mailbox") {
        process_mailbox(config, rules.clone(), stats.clone(), mailbox_file)
    } else if let Some(body_file) = matches.get_one::<String>("classify-body") {
        classify_body(rules.clone(), stats.clone(), body_file)
    } else if let Some(dsn_file) = matches.get_one::<String>("classify-dsn") {
        let explanation = matches.get_one::<String>("explanation").map(String::as_str);
        classify_dsn(rules.clone(), stats.clone(), dsn_file, explanation)
    } else {
        eprintln!("Nothing to do: pass --mailbox, --classify-body or --classify-dsn");
        process::exit(2);
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }

    if matches.get_flag("stats") {
        print_statistics(&stats.report(&rules));
    }
}

/// A missing default config file is fine; a missing explicitly named one is not.
fn load_config(path: &str) -> anyhow::Result<Config> {
    if Path::new(path).exists() {
        Config::from_file(path)
    } else if path == DEFAULT_CONFIG_PATH {
        Ok(load_config_or_default(path))
    } else {
        anyhow::bail!("Configuration file '{path}' not found")
    }
}

fn generate_default_config(path: &str) {
    match Config::default().to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e:#}");
            process::exit(1);
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn process_mailbox(
    config: Config,
    rules: Arc<RuleTable>,
    stats: Arc<RuleStatistics>,
    mailbox_file: &str,
) -> anyhow::Result<()> {
    let mailbox = MemoryMailbox::from_file(mailbox_file)?;
    log::info!("Loaded {} message(s) from {mailbox_file}", mailbox.len());

    let mut handler = BounceHandler::new(mailbox, config, rules)?.with_observer(stats);
    let records = handler.process()?;
    print_json(&records)
}

fn classify_body(
    rules: Arc<RuleTable>,
    stats: Arc<RuleStatistics>,
    body_file: &str,
) -> anyhow::Result<()> {
    let body = read_file(body_file)?;
    let outcome = BodyClassifier::new(rules).with_observer(stats).classify(&body);
    print_json(&outcome)
}

fn classify_dsn(
    rules: Arc<RuleTable>,
    stats: Arc<RuleStatistics>,
    dsn_file: &str,
    explanation_file: Option<&str>,
) -> anyhow::Result<()> {
    let status = DeliveryStatus::parse(&read_file(dsn_file)?);
    let explanation = match explanation_file {
        Some(path) => read_file(path)?,
        None => String::new(),
    };
    let outcome = DsnClassifier::new(rules)
        .with_observer(stats)
        .classify(&status, &explanation);
    print_json(&outcome)
}

fn read_file(path: &str) -> anyhow::Result<String> {
    use anyhow::Context;
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
}

fn print_statistics(report: &StatisticsReport) {
    eprintln!();
    eprintln!("Rule statistics");
    eprintln!("  Evaluations: {}", report.total_evaluations);
    eprintln!("  Matches:     {}", report.total_matches);

    if report.matched_rules.is_empty() {
        eprintln!("  No rule matches recorded");
    } else {
        eprintln!();
        eprintln!("  {:<24} {:>5} {:>8}  Pattern", "Set", "Rule", "Matches");
        for rule in &report.matched_rules {
            eprintln!(
                "  {:<24} {:>5} {:>8}  {}",
                rule.set.to_string(),
                rule.index,
                rule.matches,
                truncate_string(&rule.pattern, 60)
            );
        }
    }

    if !report.unmatched_rules.is_empty() {
        eprintln!();
        eprintln!("  Rules that never matched: {}", report.unmatched_rules.len());
        for rule in &report.unmatched_rules {
            eprintln!(
                "    {}[{}] {}",
                rule.set,
                rule.index,
                truncate_string(&rule.pattern, 60)
            );
        }
    }
}

fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
