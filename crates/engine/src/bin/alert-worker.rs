//! alert-worker: feeds newline-delimited JSON events through the alert engine.
//!
//! Rules are loaded from `RULES_DIR`. Every configured channel name is backed
//! by the log channel, so the worker shows what would be sent without
//! talking to any external provider. One JSON report line is printed per
//! event, as soon as its line is read. `--preview <rule-id>` buffers the
//! input and runs the dry-run path over it instead, printing a single report.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use boardwatch_core::config::load_dotenv;
use boardwatch_core::{EngineConfig, Event};
use boardwatch_engine::Engine;
use boardwatch_notify::{Dispatcher, InMemoryNotificationStore, LogChannel};
use boardwatch_rules::validation::validate_rule_with_channels;
use boardwatch_rules::RuleLoader;

// ── CLI ─────────────────────────────────────────────────────────────

/// Match marketplace events against alert rules and dispatch notifications.
#[derive(Parser, Debug)]
#[command(name = "alert-worker", version, about)]
struct Cli {
    /// NDJSON file with one event per line. Reads stdin when omitted.
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// Directory with rule YAML files (overrides the profiled RULES_DIR).
    #[arg(long)]
    rules_dir: Option<PathBuf>,

    /// Channel names to register, each backed by the log channel.
    #[arg(
        long = "channel",
        env = "ALERT_CHANNELS",
        value_delimiter = ',',
        default_value = "log,webpush,telegram"
    )]
    channels: Vec<String>,

    /// Dry-run this rule over the input events instead of ingesting them.
    #[arg(long, value_name = "RULE_ID")]
    preview: Option<String>,
}

// ── Input ───────────────────────────────────────────────────────────

/// Parse one NDJSON line into an event, filling the default currency and a
/// computed signature when the producer left them out.
fn parse_event(line: &str, default_currency: &str) -> anyhow::Result<Event> {
    let mut raw: serde_json::Value = serde_json::from_str(line)?;
    if let Some(obj) = raw.as_object_mut() {
        obj.entry("currency")
            .or_insert_with(|| serde_json::Value::from(default_currency));
    }
    let event: Event = serde_json::from_value(raw)?;
    Ok(event.with_computed_signature())
}

/// Line-at-a-time event reader. Malformed lines are logged and skipped.
struct EventReader {
    lines: tokio::io::Lines<Box<dyn AsyncBufRead + Unpin + Send>>,
    line_no: usize,
    default_currency: String,
}

impl EventReader {
    fn new(reader: Box<dyn AsyncBufRead + Unpin + Send>, default_currency: &str) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            default_currency: default_currency.to_string(),
        }
    }

    async fn next_event(&mut self) -> anyhow::Result<Option<Event>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            match parse_event(&line, &self.default_currency) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => warn!(line = self.line_no, error = %e, "skipping malformed event"),
            }
        }
        Ok(None)
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env();
    config.log_summary();

    // Rules
    let rules_dir = cli.rules_dir.clone().unwrap_or_else(|| config.rules.dir.clone());
    let loader = Arc::new(
        RuleLoader::new(rules_dir.clone())
            .with_default_cooldown_hours(config.rules.default_cooldown_hours),
    );
    let results = loader
        .load_all()
        .with_context(|| format!("scanning rules in {}", rules_dir.display()))?;
    let failed = results.iter().filter(|r| r.is_failed()).count();
    info!(
        path = %rules_dir.display(),
        loaded = loader.rules().len(),
        failed,
        "rules ready"
    );

    // Channels
    let mut dispatcher = Dispatcher::new(Arc::new(InMemoryNotificationStore::new()));
    for name in &cli.channels {
        dispatcher.register(Arc::new(LogChannel::new(name.trim())));
    }
    let channel_names = dispatcher.channel_names();
    for rule in loader.rules() {
        let report = validate_rule_with_channels(&rule, &channel_names);
        for e in &report.errors {
            warn!(rule_id = %rule.id, path = %e.path, suggestion = ?e.suggestion, "{}", e.message);
        }
    }

    let engine = Engine::from_config(loader.clone(), Arc::new(dispatcher), &config);

    // Events
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &cli.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut input = EventReader::new(reader, &config.default_currency);

    // Preview needs the whole batch; ingest streams.
    if let Some(rule_id) = &cli.preview {
        let mut events = Vec::new();
        while let Some(event) = input.next_event().await? {
            events.push(event);
        }
        info!(count = events.len(), "events read");
        let report = engine
            .preview_rule(rule_id, &events)
            .await?
            .with_context(|| format!("no rule with id '{rule_id}'"))?;
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    let sweeper = engine.spawn_dedup_sweeper(config.dedup.sweep_interval());

    let mut fired = 0usize;
    let mut ingested = 0usize;
    while let Some(event) = input.next_event().await? {
        ingested += 1;
        let event_id = event.id.clone();
        match engine.ingest(event).await {
            Ok(report) => {
                fired += report.fired_rules().count();
                println!("{}", serde_json::to_string(&report)?);
            }
            Err(e) => {
                warn!(event_id = %event_id, error = %e, "ingest failed");
                println!(
                    "{}",
                    serde_json::json!({ "eventId": event_id, "error": e.to_string() })
                );
            }
        }
    }

    sweeper.abort();
    info!(
        ingested,
        fired,
        dead_letters = engine.dead_letters().len(),
        "alert-worker finished"
    );
    Ok(())
}
