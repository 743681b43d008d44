//! cmdpipe - runs a pipeline definition and prints every host record
//!
//! Usage: `cmdpipe [--config <config.toml>] <definition.toml|definition.json>`
//!
//! Each record reaching the host is written to stdout as one JSON line, in
//! the order it was delivered. Logs go to stderr and, when
//! `logging.directory` is configured, to a daily rolling file.

use anyhow::Context;
use clap::Parser;
use cmdpipe::{
    config::LoggingSettings,
    pipeline::{HostMessage, PipelineBuilder, PipelineDefinition, PipelineJob, PipelineStatus},
    CommandRegistry, EngineConfig,
};
use std::io::Write;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Run a pipeline definition and print every host record as a JSON line
#[derive(Parser, Debug)]
#[command(name = "cmdpipe", version)]
struct Args {
    /// Engine configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pipeline definition (TOML, or JSON by extension)
    definition: PathBuf,
}

fn init_logging(settings: &LoggingSettings) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.filter));

    let (file_layer, guard) = match &settings.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cmdpipe.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    guard
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => EngineConfig::load_or_default(),
    };
    let guard = init_logging(&config.logging);

    tracing::info!(definition = ?args.definition, "Starting cmdpipe");

    let definition = PipelineDefinition::load(&args.definition)?;
    let registry = CommandRegistry::new();
    let builder = definition.into_builder(&registry, PipelineBuilder::new().config(config))?;
    let job = PipelineJob::spawn(builder, definition.input.clone())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for message in job.messages().iter() {
        match message {
            HostMessage::Record(record) => {
                serde_json::to_writer(&mut out, &record)?;
                writeln!(out)?;
            }
            HostMessage::Completed { .. } => break,
        }
    }
    out.flush()?;

    let outcome = job.join()?;
    tracing::info!(status = %outcome.status, "Finished");
    if outcome.status != PipelineStatus::Succeeded {
        if let Some(fault) = &outcome.terminal_fault {
            eprintln!("{}", fault);
        }
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}
