//! Datenstrukturen für einzelne Energie-Messwerte.
//!
//! Ein [`Reading`] entsteht ausschließlich durch erfolgreiches Dekodieren einer
//! eingehenden Nachricht (siehe [`Reading::decode`]). Das Nachrichtenformat ist
//! ein JSON-Objekt mit genau drei Pflichtfeldern; alle weiteren Schlüssel
//! werden ignoriert:
//!
//! ```json
//! {"timestamp": "2024-03-01T12:00:00Z", "device_id": "fridge", "energy_consumption": 0.42}
//! ```

use crate::error::{DecodeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

pub const TIMESTAMP: &str = "timestamp";
pub const DEVICE_ID: &str = "device_id";
pub const ENERGY_CONSUMPTION: &str = "energy_consumption";

/// Kennung eines Geräts, so wie sie im Payload stand.
///
/// Der Wert ist opak: `"7"` und `7` gelten als unterschiedliche Geräte.
/// Zahlen werden unverändert übernommen, also auch Werte jenseits von `i64`
/// oder mit Nachkommastellen (`1.5`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceId {
    Number(Number),
    Text(String),
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for DeviceId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<Number> for DeviceId {
    fn from(n: Number) -> Self {
        Self::Number(n)
    }
}

/// Ein einzelner, unveränderlicher Messwert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// Zeitpunkt der Messung.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Das Gerät, von dem die Messung stammt.
    pub device_id: DeviceId,
    /// Verbrauch in kWh, endlich und nicht negativ.
    pub energy_consumption: f64,
}

impl Reading {
    /// Dekodiert einen rohen Payload.
    ///
    /// Zuerst wird geprüft, ob alle Pflichtfelder vorhanden (und nicht `null`)
    /// sind, erst danach werden die Werte selbst validiert. Ein fehlendes Feld
    /// wird also immer als [`DecodeError::MissingField`] gemeldet, auch wenn ein
    /// anderes Feld zusätzlich ungültig ist.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Syntax`] bei ungültigem JSON oder wenn der Payload kein
    /// Objekt ist, [`DecodeError::MissingField`] bei fehlenden Schlüsseln und
    /// [`DecodeError::InvalidField`] bei vorhandenen, aber unbrauchbaren Werten.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(raw)?;
        let Value::Object(mut record) = value else {
            return Err(DecodeError::Syntax("expected a JSON object".to_string()));
        };

        let timestamp = take_required(&mut record, TIMESTAMP)?;
        let device_id = take_required(&mut record, DEVICE_ID)?;
        let energy_consumption = take_required(&mut record, ENERGY_CONSUMPTION)?;

        Ok(Self {
            timestamp: decode_timestamp(timestamp)?,
            device_id: decode_device_id(device_id)?,
            energy_consumption: decode_consumption(energy_consumption)?,
        })
    }
}

fn take_required(record: &mut Map<String, Value>, field: &'static str) -> Result<Value> {
    match record.remove(field) {
        None | Some(Value::Null) => Err(DecodeError::MissingField { field }),
        Some(value) => Ok(value),
    }
}

fn decode_timestamp(value: Value) -> Result<OffsetDateTime> {
    match value {
        Value::String(raw) => parse_timestamp(&raw)
            .ok_or_else(|| invalid(TIMESTAMP, format!("unrecognised date-time '{raw}'"))),
        other => Err(invalid(TIMESTAMP, format!("expected a string, found {other}"))),
    }
}

fn decode_device_id(value: Value) -> Result<DeviceId> {
    match value {
        Value::String(s) => Ok(DeviceId::Text(s)),
        Value::Number(n) => Ok(DeviceId::Number(n)),
        other => Err(invalid(
            DEVICE_ID,
            format!("expected a string or a number, found {other}"),
        )),
    }
}

fn decode_consumption(value: Value) -> Result<f64> {
    let kwh = match &value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
    .ok_or_else(|| invalid(ENERGY_CONSUMPTION, format!("expected a number, found {value}")))?;

    if !kwh.is_finite() || kwh < 0.0 {
        return Err(invalid(
            ENERGY_CONSUMPTION,
            format!("expected a non-negative number, found {kwh}"),
        ));
    }
    Ok(kwh)
}

fn invalid(field: &'static str, reason: String) -> DecodeError {
    DecodeError::InvalidField { field, reason }
}

/// Parst die gängigen Zeitstempel-Varianten.
///
/// Angaben ohne Offset werden als UTC interpretiert, ein reines Datum als
/// Mitternacht UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();

    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    if let Ok(ts) = OffsetDateTime::parse(raw, &Iso8601::DEFAULT) {
        return Some(ts);
    }

    let naive = PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            raw,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            raw,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            raw,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        )
    });
    if let Ok(ts) = naive {
        return Some(ts.assume_utc());
    }

    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}
