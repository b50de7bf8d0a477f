//! CLI for heimwatt.
//!
//! `monitor` subscribes to an MQTT topic, collects energy readings and prints a
//! per-device analysis whenever the operator asks for one. `replay` pushes
//! recorded payloads (one per line) through the same ingest and summary path,
//! which is handy for checking a capture without a broker.

mod mqtt;
mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use heimwatt_report::{JsonReport, Render, TextReport};
use session::Session;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, env = "HEIMWATT_LOG", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Subscribe to the broker and answer `analyze` / `exit` on stdin
    Monitor {
        /// Broker address: host, host:port, mqtt://host:port or tcp://host:port
        #[arg(long, env = "HEIMWATT_BROKER", default_value = "localhost")]
        broker: String,

        /// Topic carrying the energy readings
        #[arg(long, env = "HEIMWATT_TOPIC", default_value = "energy/data")]
        topic: String,

        /// MQTT client identifier
        #[arg(long, env = "HEIMWATT_CLIENT_ID", default_value = "heimwatt")]
        client_id: String,

        /// Subscription QoS level
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
        qos: u8,

        /// MQTT keep-alive interval in seconds
        #[arg(long, default_value_t = 30)]
        keep_alive_secs: u64,

        /// How `analyze` presents the summary
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Ingest recorded payloads (one JSON document per line) and print one summary
    Replay {
        /// Input file path (stdin when omitted)
        #[arg(long)]
        path: Option<PathBuf>,

        /// How the summary is presented
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn renderer(format: OutputFormat) -> Box<dyn Render> {
    match format {
        OutputFormat::Text => Box::new(TextReport::new(io::stdout())),
        OutputFormat::Json => Box::new(JsonReport::new(io::stdout())),
    }
}

/// Where the prompt and command replies go during `monitor`.
///
/// JSON summaries own stdout so it stays a clean stream of documents.
fn operator_console(format: OutputFormat) -> Box<dyn Write> {
    match format {
        OutputFormat::Text => Box::new(io::stdout()),
        OutputFormat::Json => Box::new(io::stderr()),
    }
}

fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ReplayStats {
    accepted: usize,
    rejected: usize,
}

/// Feeds every non-blank line of `reader` into the session.
fn replay_lines<R: Render>(reader: impl BufRead, session: &mut Session<R>) -> Result<ReplayStats> {
    let mut stats = ReplayStats::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }

        let _line_span = tracing::info_span!("replay", line = idx + 1).entered();
        if session.on_payload("replay", line.as_bytes()) {
            stats.accepted += 1;
        } else {
            stats.rejected += 1;
        }
    }

    Ok(stats)
}

fn replay(path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let reader: Box<dyn BufRead> = match path {
        Some(p) => Box::new(BufReader::new(
            File::open(p).with_context(|| format!("Failed to open input file {}", p.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut session = Session::new(renderer(format));
    let stats = replay_lines(reader, &mut session)?;
    if stats.rejected > 0 {
        warn!(rejected = stats.rejected, "some payloads were dropped");
    }
    info!(accepted = stats.accepted, "replay finished");

    session.analyze();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Monitor {
            broker,
            topic,
            client_id,
            qos,
            keep_alive_secs,
            format,
        } => {
            let settings = mqtt::BrokerSettings::new(
                &broker,
                topic,
                client_id,
                qos,
                Duration::from_secs(keep_alive_secs),
            )
            .context("Invalid broker settings")?;

            let mut session = Session::new(renderer(format));
            let mut console = operator_console(format);
            mqtt::run_monitor(&settings, &mut session, &mut console)
                .await
                .context("Could not connect or receive data from broker")?;
        }
        Commands::Replay { path, format } => replay(path.as_deref(), format)?,
    }

    Ok(())
}
