//! Run a guest module once and print its diagnostics.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use wsvm_core::prelude::*;
use wsvm_host::events::BroadcastSink;
use wsvm_host::{HostServices, RunOptions, RunOutput, RunState, VmError, WasmVm};
use wsvm_sqlite::{DatabaseSchema, SqliteEngine, SqliteKv};

use crate::config::Config;

pub struct RunArgs {
    pub module: String,
    pub entry: Option<String>,
    pub data: Option<String>,
    pub data_file: Option<String>,
    pub no_throw: bool,
    pub json: bool,
}

/// Everything one run produced, including events that arrived after the
/// guest returned.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: u32,
    pub entry: String,
    #[serde(flatten)]
    pub output: RunOutput,
    pub events: Vec<HostEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    fn failed(&self) -> bool {
        self.output.state != RunState::Finished(wsvm_host::Outcome::Ok)
    }
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = Config::load()?;
    let bytes =
        std::fs::read(&args.module).with_context(|| format!("Failed to read {}", args.module))?;
    let data = match (&args.data, &args.data_file) {
        (Some(data), _) => Some(data.clone()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?,
        ),
        (None, None) => None,
    };
    let options = RunOptions {
        entry: args.entry.clone().unwrap_or_else(|| config.vm.entry.clone()),
        throw_error: config.vm.throw_error && !args.no_throw,
    };

    let report = execute(&config, bytes, options.clone(), data)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize run report")?
        );
    } else {
        print_report(&report);
    }

    if report.failed() && options.throw_error {
        bail!(
            "run failed: {}",
            report.error.as_deref().unwrap_or("guest errored")
        );
    }
    Ok(())
}

/// Services for one run, as described by `config`.
pub fn build_services(config: &Config) -> Result<(HostServices, Arc<StaticChain>, BroadcastSink)> {
    let (engine, kv) = if config.uses_memory_database() {
        (
            SqliteEngine::new_in_memory().context("Failed to open in-memory database")?,
            SqliteKv::new_in_memory().context("Failed to open in-memory key/value store")?,
        )
    } else {
        let path = Path::new(&config.storage.database);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        (
            SqliteEngine::open(path)
                .with_context(|| format!("Failed to open database: {}", path.display()))?,
            SqliteKv::open(path)
                .with_context(|| format!("Failed to open key/value store: {}", path.display()))?,
        )
    };

    if let Some(schema_path) = &config.storage.schema {
        let text = std::fs::read_to_string(schema_path)
            .with_context(|| format!("Failed to read schema: {}", schema_path))?;
        let schema = DatabaseSchema::from_json(&text)
            .with_context(|| format!("Failed to parse schema: {}", schema_path))?;
        let tables = engine.apply_schema(&schema).context("Failed to apply schema")?;
        debug!(tables, schema = %schema_path, "schema applied");
    }

    let chain = config
        .chain
        .read_calls()?
        .into_iter()
        .fold(StaticChain::new(), |chain, (call, result)| {
            chain.with_response(call, result)
        });
    let chain = Arc::new(chain);
    let events = BroadcastSink::default();
    let env: MapEnv = config.env.clone().into_iter().collect();

    let services = HostServices::new()
        .with_env(Arc::new(env))
        .with_sql_engine(Arc::new(engine))
        .with_kv(Arc::new(kv))
        .with_chain(chain.clone())
        .with_events(Arc::new(events.clone()));
    Ok((services, chain, events))
}

/// Runs `bytes` once. Guest failures land in the report, not in `Err`.
pub fn execute(
    config: &Config,
    bytes: Vec<u8>,
    options: RunOptions,
    data: Option<String>,
) -> Result<RunReport> {
    let (services, chain, events) = build_services(config)?;
    let mut rx = events.subscribe();

    let entry = options.entry.clone();
    let mut vm = WasmVm::new(bytes, services).with_options(options);
    if let Some(data) = data {
        vm.send_event(data);
    }
    let run_id = vm.run_id();
    info!(run_id = %run_id, entry = %entry, "starting guest");

    let (output, error) = match vm.start() {
        Ok(output) => (output, None),
        Err(failure) if failure.error == VmError::AlreadyStarted => {
            bail!("execution context was already used")
        }
        Err(failure) => (failure.output, Some(failure.error.to_string())),
    };

    // Offline chain: transactions confirm as soon as the run is over.
    let confirmed = chain.confirm_pending();
    debug!(confirmed, "pending transactions confirmed");

    let mut drained = Vec::new();
    while let Ok(event) = rx.try_recv() {
        drained.push(event);
    }
    let error = error.or_else(|| {
        output
            .stderr
            .last()
            .filter(|_| output.state != RunState::Finished(wsvm_host::Outcome::Ok))
            .map(|r| r.message.clone())
    });

    Ok(RunReport {
        run_id: run_id.0,
        entry,
        output,
        events: drained,
        error,
    })
}

fn print_report(report: &RunReport) {
    println!(
        "{} {} ({}, entry `{}`)",
        "→".blue(),
        "run".bold(),
        format!("rid-{}", report.run_id).as_str().dimmed(),
        report.entry
    );
    for record in &report.output.stdout {
        println!("  {}", record.display_line());
    }
    for record in &report.output.stderr {
        println!("  {}", record.display_line().as_str().red());
    }
    for event in &report.events {
        match event {
            HostEvent::Stdout(record) => {
                println!("  {} {}", "async".cyan(), record.display_line())
            }
            HostEvent::Stderr(record) => {
                println!("  {} {}", "async".cyan(), record.display_line().as_str().red())
            }
            HostEvent::SqlChanged => println!("  {} sql changed", "event".dimmed()),
        }
    }
    if report.failed() {
        println!("{} Run errored", "✗".red().bold());
    } else {
        println!("{} Run finished", "✓".green().bold());
    }
}
