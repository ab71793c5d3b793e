//! Frequency band vocabulary and band power results

use crate::config_error;
use crate::error::NeurocastResult;
use serde::{Deserialize, Serialize};

/// Named frequency interval, inclusive on both ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandDefinition {
    pub name: String,
    pub low_hz: f64,
    pub high_hz: f64,
}

impl BandDefinition {
    pub fn new(name: &str, low_hz: f64, high_hz: f64) -> Self {
        BandDefinition {
            name: name.to_string(),
            low_hz,
            high_hz,
        }
    }

    /// Whether `frequency` falls inside `[low_hz, high_hz]`
    pub fn contains(&self, frequency: f64) -> bool {
        frequency >= self.low_hz && frequency <= self.high_hz
    }

    /// Outgoing address (`/<name>`)
    pub fn address(&self) -> String {
        format!("/{}", self.name)
    }

    /// Standard EEG rhythm bands: Delta, Theta, Alpha, Beta, Gamma
    pub fn eeg_bands() -> Vec<BandDefinition> {
        vec![
            BandDefinition::new("Delta", 0.5, 4.0),
            BandDefinition::new("Theta", 4.0, 8.0),
            BandDefinition::new("Alpha", 8.0, 14.0),
            BandDefinition::new("Beta", 14.0, 30.0),
            BandDefinition::new("Gamma", 30.0, 50.0),
        ]
    }
}

/// Ordered, validated set of band definitions.
///
/// Insertion order is emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSet {
    bands: Vec<BandDefinition>,
}

impl BandSet {
    pub fn new(bands: Vec<BandDefinition>) -> NeurocastResult<Self> {
        if bands.is_empty() {
            return Err(config_error!("at least one frequency band is required"));
        }

        for (i, band) in bands.iter().enumerate() {
            if band.name.trim().is_empty() {
                return Err(config_error!("band {} has an empty name", i));
            }
            let finite = band.low_hz.is_finite() && band.high_hz.is_finite();
            if !finite || band.low_hz < 0.0 || band.low_hz > band.high_hz {
                return Err(config_error!(
                    "band '{}' has an invalid range [{}, {}] Hz",
                    band.name,
                    band.low_hz,
                    band.high_hz
                ));
            }
            if bands[..i].iter().any(|other| other.name == band.name) {
                return Err(config_error!("band '{}' is defined twice", band.name));
            }
        }

        Ok(BandSet { bands })
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BandDefinition> {
        self.bands.iter()
    }
}

impl Default for BandSet {
    fn default() -> Self {
        BandSet {
            bands: BandDefinition::eeg_bands(),
        }
    }
}

/// Power reported for one band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandPower {
    pub name: String,
    pub power: f64,
}

/// Band name to power, in band-definition order.
///
/// Recomputed from scratch on every processed tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPowerResult {
    entries: Vec<BandPower>,
}

impl BandPowerResult {
    pub fn with_capacity(capacity: usize) -> Self {
        BandPowerResult {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: &str, power: f64) {
        self.entries.push(BandPower {
            name: name.to_string(),
            power,
        });
    }

    /// Power of the named band
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.power)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BandPower> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Band with the highest power
    pub fn dominant(&self) -> Option<&BandPower> {
        self.entries
            .iter()
            .max_by(|a, b| a.power.total_cmp(&b.power))
    }
}
