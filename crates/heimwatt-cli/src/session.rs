use heimwatt_core::ReadingLog;
use heimwatt_report::{summarize, Render, Summary};
use std::io::{self, Write};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const PROMPT: &str = "Type 'analyze' to view energy analysis or 'exit' to quit: ";

/// Operator commands understood by the interactive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Analyze,
    Exit,
}

#[derive(Debug, Error)]
#[error("unknown command '{0}'")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "analyze" => Ok(Self::Analyze),
            "exit" => Ok(Self::Exit),
            _ => Err(UnknownCommand(normalized)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Owns the reading log and the renderer for one run.
///
/// Payloads and commands are both handled through `&mut self`, so whoever
/// drives the session serialises them; no locking is involved.
pub struct Session<R> {
    log: ReadingLog,
    renderer: R,
}

impl<R: Render> Session<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            log: ReadingLog::new(),
            renderer,
        }
    }

    pub fn log(&self) -> &ReadingLog {
        &self.log
    }

    #[cfg(test)]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Ingests one payload; malformed ones are logged and dropped.
    ///
    /// Returns whether the payload made it into the log.
    pub fn on_payload(&mut self, source: &str, payload: &[u8]) -> bool {
        match self.log.ingest(payload) {
            Ok(reading) => {
                info!(
                    source,
                    device_id = %reading.device_id,
                    energy_consumption = reading.energy_consumption,
                    timestamp = %reading.timestamp,
                    "Received data"
                );
                true
            }
            Err(e) => {
                warn!(
                    source,
                    payload_size = payload.len(),
                    error = %e,
                    "dropping payload"
                );
                false
            }
        }
    }

    /// Summarizes the current log and hands it to the renderer.
    ///
    /// Render failures are logged; the summary is discarded either way.
    pub fn analyze(&mut self) -> Summary {
        let summary = summarize(self.log.readings());
        debug!(
            devices = summary.len(),
            readings = self.log.len(),
            "summarized reading log"
        );

        if let Err(e) = self.renderer.render(&summary) {
            error!(error = %e, "failed to render energy summary");
        }
        summary
    }

    /// Handles one line of operator input, writing user-facing replies to `out`.
    pub fn on_input(&mut self, line: &str, out: &mut impl Write) -> io::Result<Flow> {
        match line.parse::<Command>() {
            Ok(Command::Analyze) => {
                self.analyze();
                Ok(Flow::Continue)
            }
            Ok(Command::Exit) => {
                writeln!(out, "Exiting program.")?;
                Ok(Flow::Stop)
            }
            Err(e) => {
                debug!(error = %e, "rejected operator input");
                writeln!(out, "Invalid command.")?;
                Ok(Flow::Continue)
            }
        }
    }
}

pub fn prompt(out: &mut impl Write) -> io::Result<()> {
    write!(out, "{PROMPT}")?;
    out.flush()
}
