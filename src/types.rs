//! Shared value types: rails, metrics, readings and samples.

use std::fmt;

use chrono::{DateTime, Local};

/// One of the four monitored power delivery paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rail {
    Pcie1,
    Pcie2,
    Eps1,
    Eps2,
}

impl Rail {
    /// All rails in wire order, the order their readings appear in a
    /// values frame.
    pub const ALL: [Rail; 4] = [Rail::Pcie1, Rail::Pcie2, Rail::Eps1, Rail::Eps2];

    pub fn label(self) -> &'static str {
        match self {
            Rail::Pcie1 => "PCIE1",
            Rail::Pcie2 => "PCIE2",
            Rail::Eps1 => "EPS1",
            Rail::Eps2 => "EPS2",
        }
    }
}

impl fmt::Display for Rail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Measured quantity, named by the unit letter used in exported rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Voltage,
    Current,
    Power,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Voltage, Metric::Current, Metric::Power];

    /// Single-letter unit tag (`U`/`I`/`P`) used in the export format.
    pub fn unit_letter(self) -> char {
        match self {
            Metric::Voltage => 'U',
            Metric::Current => 'I',
            Metric::Power => 'P',
        }
    }
}

/// Voltage/current/power triple for one rail at one sample instant.
///
/// `power` is always derived from the scaled voltage and current at
/// construction time; it is never stored independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub rail: Rail,
    /// Volts.
    pub voltage: f64,
    /// Amps.
    pub current: f64,
    /// Watts, `voltage * current`.
    pub power: f64,
}

impl Reading {
    /// Build a reading from already-scaled voltage and current.
    pub fn from_scaled(rail: Rail, voltage: f64, current: f64) -> Self {
        Self {
            rail,
            voltage,
            current,
            power: voltage * current,
        }
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Voltage => self.voltage,
            Metric::Current => self.current,
            Metric::Power => self.power,
        }
    }
}

/// One full poll's readings across all rails, stamped when decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    /// One reading per rail, in wire order.
    pub readings: [Reading; 4],
}

impl Sample {
    pub fn new(timestamp: DateTime<Local>, readings: [Reading; 4]) -> Self {
        Self {
            timestamp,
            readings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rail_wire_order_and_labels() {
        let labels: Vec<&str> = Rail::ALL.iter().map(|r| r.label()).collect();
        assert_eq!(labels, ["PCIE1", "PCIE2", "EPS1", "EPS2"]);
    }

    #[test]
    fn unit_letters_match_export_format() {
        let letters: Vec<char> = Metric::ALL.iter().map(|m| m.unit_letter()).collect();
        assert_eq!(letters, ['U', 'I', 'P']);
    }

    #[test]
    fn power_is_derived_from_scaled_values() {
        let r = Reading::from_scaled(Rail::Eps1, 12.0, 2.5);
        assert_eq!(r.power, 30.0);
        assert_eq!(r.value(Metric::Voltage), 12.0);
        assert_eq!(r.value(Metric::Current), 2.5);
        assert_eq!(r.value(Metric::Power), 30.0);
    }
}
