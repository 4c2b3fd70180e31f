//! Machine temperature readings.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const STREAMS_TABLE: &str = "streams-table";
pub const MACHINE_NAME_INDEX: &str = "machine-name-index";
pub const TEMPERATURE_INDEX: &str = "temperature-index";

/// Readings above this temperature mean the machine is overheated.
pub const OVERHEAT_THRESHOLD: f64 = 80.0;

/// Number of digits in a generated machine id.
const MACHINE_ID_DIGITS: usize = 9;

/// An item of the streams table.
///
/// Temperatures are stored as strings, the way devices report them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineReading {
    pub machine_id: i64,
    pub machine_type: String,
    pub machine_name: Option<String>,
    pub temperature: Option<String>,
}

/// Temperature state reported by the stream monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureState {
    Overheated,
    Normal,
}

impl TemperatureState {
    /// Exactly the threshold reports nothing.
    pub fn classify(temperature: f64) -> Option<Self> {
        if temperature > OVERHEAT_THRESHOLD {
            Some(TemperatureState::Overheated)
        } else if temperature < OVERHEAT_THRESHOLD {
            Some(TemperatureState::Normal)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureState::Overheated => "OVERHEATED",
            TemperatureState::Normal => "NORMAL STATE",
        }
    }
}

impl fmt::Display for TemperatureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generates a machine id of nine decimal digits, each between 0 and 8.
pub fn generate_machine_id<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    (0..MACHINE_ID_DIGITS).fold(0, |id, _| id * 10 + rng.random_range(0..9) as i64)
}

/// Applies a reported temperature to the machine's current item.
///
/// A known machine keeps its id and type; an unknown one is created from the
/// reported name and type with `new_id`.
pub fn upsert_reading(
    existing: Option<MachineReading>,
    machine_name: &str,
    machine_type: &str,
    temperature: &str,
    new_id: i64,
) -> MachineReading {
    let mut reading = existing.unwrap_or_else(|| MachineReading {
        machine_id: new_id,
        machine_type: machine_type.to_string(),
        machine_name: Some(machine_name.to_string()),
        temperature: None,
    });
    reading.temperature = Some(temperature.to_string());
    reading
}
