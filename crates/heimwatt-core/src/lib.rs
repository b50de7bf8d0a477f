//! Heimwatt core: energy readings and the log they are collected in.
//!
//! Transport and presentation live elsewhere; this crate only decodes payloads
//! and keeps the ordered, append-only record of what arrived.

pub mod error;
pub mod log;
pub mod reading;

pub use error::DecodeError;
pub use log::ReadingLog;
pub use reading::{DeviceId, Reading};
