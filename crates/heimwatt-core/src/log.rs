use crate::error::Result;
use crate::reading::Reading;

/// Append-only, arrival-ordered log of decoded readings.
///
/// Readings are never removed or modified once appended. Consumers get a
/// read-only slice via [`ReadingLog::readings`].
#[derive(Debug, Default, Clone)]
pub struct ReadingLog {
    readings: Vec<Reading>,
}

impl ReadingLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one inbound payload and appends it.
    ///
    /// On failure the log is left untouched and the payload is gone for good:
    /// there is no buffering or replay of rejected messages.
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`](crate::DecodeError) describing why the
    /// payload was rejected.
    pub fn ingest(&mut self, raw: &[u8]) -> Result<&Reading> {
        let reading = Reading::decode(raw)?;
        Ok(self.append(reading))
    }

    /// Appends an already decoded reading and returns a reference to it.
    pub fn append(&mut self, reading: Reading) -> &Reading {
        #[cfg(feature = "telemetry")]
        tracing::trace!(
            device_id = %reading.device_id,
            energy_consumption = reading.energy_consumption,
            position = self.readings.len(),
            "appended reading"
        );
        self.readings.push(reading);
        &self.readings[self.readings.len() - 1]
    }

    #[must_use]
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
