use crate::{DeviceTotal, Summary};
use serde::Serialize;
use std::io::Write;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Width of the longest bar in the text chart, in character cells.
const BAR_WIDTH: usize = 40;
const BAR_CELL: char = '#';

const LISTING_TITLE: &str = "Energy consumption by device:";
const CHART_TITLE: &str = "Energy Consumption by Device";
const X_LABEL: &str = "Device ID";
const Y_LABEL: &str = "Energy Consumption (kWh)";

/// Fallback timestamp when formatting fails
const FALLBACK_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("An error occurred while writing the report: {0}")]
    Io(#[from] std::io::Error),
    #[error("An error occurred while serializing the report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Presents a [`Summary`] to the operator.
pub trait Render {
    /// # Errors
    ///
    /// Fails when the summary cannot be written out. The summary itself is
    /// not affected and can simply be discarded.
    fn render(&mut self, summary: &Summary) -> Result<(), RenderError>;
}

impl<R: Render + ?Sized> Render for Box<R> {
    fn render(&mut self, summary: &Summary) -> Result<(), RenderError> {
        (**self).render(summary)
    }
}

/// Plain-text listing followed by a horizontal bar chart.
#[derive(Debug)]
pub struct TextReport<W> {
    out: W,
}

impl<W: Write> TextReport<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_listing(&mut self, summary: &Summary, id_width: usize) -> std::io::Result<()> {
        writeln!(self.out, "{LISTING_TITLE}")?;
        writeln!(
            self.out,
            "{:<id_width$}  {:>12}  {:>8}",
            "device_id", "total_kwh", "readings"
        )?;
        for device in summary {
            writeln!(
                self.out,
                "{:<id_width$}  {:>12.3}  {:>8}",
                device.device_id.to_string(),
                device.total_kwh,
                device.readings
            )?;
        }
        writeln!(self.out, "Total: {:.3} kWh", summary.grand_total())
    }

    fn write_chart(&mut self, summary: &Summary, id_width: usize) -> std::io::Result<()> {
        let peak = summary.peak();

        writeln!(self.out)?;
        writeln!(self.out, "{CHART_TITLE}")?;
        writeln!(self.out, "{X_LABEL:<id_width$} | {Y_LABEL}")?;
        for device in summary {
            let bar: String = std::iter::repeat(BAR_CELL)
                .take(bar_len(device, peak))
                .collect();
            writeln!(
                self.out,
                "{:<id_width$} | {bar} {:.3}",
                device.device_id.to_string(),
                device.total_kwh
            )?;
        }
        Ok(())
    }
}

impl<W: Write> Render for TextReport<W> {
    fn render(&mut self, summary: &Summary) -> Result<(), RenderError> {
        if summary.is_empty() {
            writeln!(self.out, "{LISTING_TITLE}")?;
            writeln!(self.out, "(no readings collected yet)")?;
            self.out.flush()?;
            return Ok(());
        }

        let id_width = summary
            .iter()
            .map(|d| d.device_id.to_string().chars().count())
            .chain(std::iter::once(X_LABEL.len()))
            .max()
            .unwrap_or(X_LABEL.len());

        self.write_listing(summary, id_width)?;
        self.write_chart(summary, id_width)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Number of bar cells for `device`, scaled so that `peak` fills [`BAR_WIDTH`].
fn bar_len(device: &DeviceTotal, peak: f64) -> usize {
    if peak <= 0.0 {
        return 0;
    }
    let ratio = device.total_kwh / peak;
    if !ratio.is_finite() {
        return 0;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    {
        (ratio.min(1.0) * BAR_WIDTH as f64).round() as usize
    }
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    generated_at: String,
    devices: &'a [DeviceTotal],
    grand_total_kwh: f64,
}

/// One JSON document per rendered summary, newline-terminated.
#[derive(Debug)]
pub struct JsonReport<W> {
    out: W,
}

impl<W: Write> JsonReport<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Render for JsonReport<W> {
    fn render(&mut self, summary: &Summary) -> Result<(), RenderError> {
        let document = SummaryDocument {
            generated_at: iso8601_now(),
            devices: summary.devices(),
            grand_total_kwh: summary.grand_total(),
        };
        serde_json::to_writer(&mut self.out, &document)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

fn iso8601_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| FALLBACK_TIMESTAMP.to_string())
}
