#![warn(clippy::unwrap_used, clippy::expect_used)]

//! Per-device energy summaries.
//!
//! [`summarize`] reduces the reading log to one total per device, ranked by
//! consumption. The summary is recomputed from scratch on every request and
//! handed to a [`Render`] implementation for presentation.

mod render;

pub use render::{JsonReport, Render, RenderError, TextReport};

use heimwatt_core::{DeviceId, Reading};
use serde::Serialize;
use std::collections::HashMap;

/// Total consumption of a single device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceTotal {
    pub device_id: DeviceId,
    /// Sum of `energy_consumption` over all readings of this device, in kWh.
    /// Saturates at `f64::MAX`, so it is always finite.
    pub total_kwh: f64,
    /// Number of readings that contributed to the total.
    pub readings: usize,
}

/// Device totals ordered by `total_kwh`, highest first.
///
/// Devices with equal totals keep the order in which they first appeared in
/// the log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    devices: Vec<DeviceTotal>,
}

impl Summary {
    pub fn iter(&self) -> std::slice::Iter<'_, DeviceTotal> {
        self.devices.iter()
    }

    #[must_use]
    pub fn devices(&self) -> &[DeviceTotal] {
        &self.devices
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Sum over all devices, saturating like the device totals.
    #[must_use]
    pub fn grand_total(&self) -> f64 {
        self.devices
            .iter()
            .fold(0.0, |acc, d| saturating_add(acc, d.total_kwh))
    }

    /// Largest single device total, `0.0` for an empty summary.
    #[must_use]
    pub fn peak(&self) -> f64 {
        self.devices.first().map_or(0.0, |d| d.total_kwh)
    }
}

impl<'a> IntoIterator for &'a Summary {
    type Item = &'a DeviceTotal;
    type IntoIter = std::slice::Iter<'a, DeviceTotal>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}

/// Groups `readings` by device and ranks the totals.
///
/// Pure function of its input; an empty slice yields an empty summary.
#[must_use]
pub fn summarize(readings: &[Reading]) -> Summary {
    let mut slots: HashMap<&DeviceId, usize> = HashMap::new();
    let mut devices: Vec<DeviceTotal> = Vec::new();

    for reading in readings {
        let slot = *slots.entry(&reading.device_id).or_insert_with(|| {
            devices.push(DeviceTotal {
                device_id: reading.device_id.clone(),
                total_kwh: 0.0,
                readings: 0,
            });
            devices.len() - 1
        });

        let entry = &mut devices[slot];
        entry.total_kwh = saturating_add(entry.total_kwh, reading.energy_consumption);
        entry.readings += 1;
    }

    // `sort_by` is stable, so ties stay in first-seen order.
    devices.sort_by(|a, b| b.total_kwh.total_cmp(&a.total_kwh));

    Summary { devices }
}

/// Addition of non-negative finite kWh values that stops at `f64::MAX`
/// instead of overflowing to infinity.
fn saturating_add(total: f64, kwh: f64) -> f64 {
    (total + kwh).min(f64::MAX)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn reading(device: &str, kwh: f64) -> Reading {
        Reading {
            timestamp: datetime!(2024-03-01 12:00:00 UTC),
            device_id: DeviceId::from(device),
            energy_consumption: kwh,
        }
    }

    fn pairs(summary: &Summary) -> Vec<(String, f64)> {
        summary
            .iter()
            .map(|d| (d.device_id.to_string(), d.total_kwh))
            .collect()
    }

    #[test]
    fn sums_per_device_and_ranks_descending() {
        let readings = vec![reading("A", 5.0), reading("B", 3.0), reading("A", 2.0)];

        let summary = summarize(&readings);

        assert_eq!(
            pairs(&summary),
            vec![("A".to_string(), 7.0), ("B".to_string(), 3.0)]
        );
        assert_eq!(summary.devices()[0].readings, 2);
        assert_eq!(summary.devices()[1].readings, 1);
    }

    #[test]
    fn empty_log_gives_empty_summary() {
        let summary = summarize(&[]);
        assert!(summary.is_empty());
        #[allow(clippy::float_cmp)]
        {
            assert_eq!(summary.grand_total(), 0.0);
            assert_eq!(summary.peak(), 0.0);
        }
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let summary = summarize(&[reading("A", 5.0), reading("B", 5.0)]);
        assert_eq!(
            pairs(&summary),
            vec![("A".to_string(), 5.0), ("B".to_string(), 5.0)]
        );

        let summary = summarize(&[
            reading("C", 1.0),
            reading("B", 4.0),
            reading("A", 2.0),
            reading("C", 1.0),
            reading("A", 2.0),
        ]);
        assert_eq!(
            pairs(&summary),
            vec![
                ("B".to_string(), 4.0),
                ("A".to_string(), 4.0),
                ("C".to_string(), 2.0)
            ]
        );
    }

    #[test]
    fn text_and_numeric_ids_are_distinct_devices() {
        let mut numeric = reading("ignored", 1.0);
        numeric.device_id = DeviceId::from(7);
        let summary = summarize(&[reading("7", 2.0), numeric]);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary.devices()[0].device_id, DeviceId::from("7"));
        assert_eq!(summary.devices()[1].device_id, DeviceId::from(7));
    }

    #[test]
    fn totals_saturate_instead_of_overflowing() {
        let summary = summarize(&[
            reading("big", 1e308),
            reading("big", 1e308),
            reading("B", 1e308),
        ]);

        let big = &summary.devices()[0];
        assert_eq!(big.device_id, DeviceId::from("big"));
        assert!(big.total_kwh.is_finite());
        #[allow(clippy::float_cmp)]
        {
            assert_eq!(big.total_kwh, f64::MAX);
            assert_eq!(summary.grand_total(), f64::MAX);
        }
        assert_eq!(big.readings, 2);
    }

    #[test]
    fn grand_total_and_peak() {
        let summary = summarize(&[reading("A", 1.5), reading("B", 2.5), reading("A", 0.5)]);
        assert!((summary.grand_total() - 4.5).abs() < 1e-9);
        assert!((summary.peak() - 2.5).abs() < 1e-9);
    }
}
