//! Time-display formatting settings.
//!
//! The runtime stores the three numeric formatting parameters and the
//! suffix string; rendering a time value with them is the formatting
//! routine's job, not this module's. The numeric fields and the suffix
//! live behind separate locks: suffix updates copy a string, a longer
//! critical section than the fixed-width fields ever need.

use std::io::{self, Write};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// The numeric time-format fields, as one snapshotable unit.
///
/// Part of any save/restore snapshot of simulation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFormatSettings {
    /// Display units as a power-of-ten exponent; `None` until set, in
    /// which case display falls back to the collaborator's time precision.
    pub units: Option<i32>,
    /// Number of decimal places.
    pub precision: i32,
    /// Minimum character width.
    pub width: i32,
}

impl Default for TimeFormatSettings {
    fn default() -> Self {
        Self {
            units: None,
            precision: 0,
            width: 20,
        }
    }
}

/// A full snapshot of the time-format state, suffix included.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFormatSnapshot {
    /// The numeric fields.
    pub settings: TimeFormatSettings,
    /// The suffix string appended after the digits.
    pub suffix: String,
}

/// Shared time-format state with split lock domains.
#[derive(Debug, Default)]
pub struct TimeFormat {
    settings: Mutex<TimeFormatSettings>,
    suffix: Mutex<String>,
}

impl TimeFormat {
    /// Creates the default state: no units, zero precision, width 20,
    /// empty suffix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out the numeric fields.
    pub fn settings(&self) -> TimeFormatSettings {
        *self.settings.lock()
    }

    /// The display units, or `default_precision` when never set.
    pub fn units_or(&self, default_precision: i32) -> i32 {
        self.settings.lock().units.unwrap_or(default_precision)
    }

    /// Number of decimal places.
    pub fn precision(&self) -> i32 {
        self.settings.lock().precision
    }

    /// Minimum character width.
    pub fn width(&self) -> i32 {
        self.settings.lock().width
    }

    /// Sets the display units.
    pub fn set_units(&self, value: i32) {
        self.settings.lock().units = Some(value);
    }

    /// Sets the number of decimal places.
    pub fn set_precision(&self, value: i32) {
        self.settings.lock().precision = value;
    }

    /// Sets the minimum character width.
    pub fn set_width(&self, value: i32) {
        self.settings.lock().width = value;
    }

    /// A copy of the suffix string.
    pub fn suffix(&self) -> String {
        self.suffix.lock().clone()
    }

    /// Replaces the suffix string.
    pub fn set_suffix(&self, value: impl Into<String>) {
        *self.suffix.lock() = value.into();
    }

    /// Captures the whole state for save/restore.
    pub fn snapshot(&self) -> TimeFormatSnapshot {
        TimeFormatSnapshot {
            settings: self.settings(),
            suffix: self.suffix(),
        }
    }

    /// Restores a previously captured state.
    pub fn restore(&self, snap: &TimeFormatSnapshot) {
        *self.settings.lock() = snap.settings;
        *self.suffix.lock() = snap.suffix.clone();
    }

    /// Writes a human-readable one-line listing of the current state.
    pub fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let snap = self.snapshot();
        writeln!(
            w,
            "  time format: units {:?} precision {} width {} suffix {:?}",
            snap.settings.units, snap.settings.precision, snap.settings.width, snap.suffix
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let fmt = TimeFormat::new();
        let s = fmt.settings();
        assert_eq!(s.units, None);
        assert_eq!(s.precision, 0);
        assert_eq!(s.width, 20);
        assert_eq!(fmt.suffix(), "");
    }

    #[test]
    fn test_units_fallback() {
        let fmt = TimeFormat::new();
        assert_eq!(fmt.units_or(-9), -9);
        fmt.set_units(-12);
        assert_eq!(fmt.units_or(-9), -12);
    }

    #[test]
    fn test_field_updates() {
        let fmt = TimeFormat::new();
        fmt.set_precision(3);
        fmt.set_width(12);
        fmt.set_suffix(" ns");

        assert_eq!(fmt.precision(), 3);
        assert_eq!(fmt.width(), 12);
        assert_eq!(fmt.suffix(), " ns");
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let fmt = TimeFormat::new();
        fmt.set_units(-9);
        fmt.set_precision(2);
        fmt.set_suffix(" us");
        let snap = fmt.snapshot();

        fmt.set_units(-3);
        fmt.set_suffix("");
        fmt.restore(&snap);

        assert_eq!(fmt.units_or(0), -9);
        assert_eq!(fmt.precision(), 2);
        assert_eq!(fmt.suffix(), " us");
    }

    #[test]
    fn test_snapshot_serializes() {
        let fmt = TimeFormat::new();
        fmt.set_units(-9);
        fmt.set_suffix(" ns");

        let json = serde_json::to_string(&fmt.snapshot()).unwrap();
        let restored: TimeFormatSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, fmt.snapshot());
    }
}
