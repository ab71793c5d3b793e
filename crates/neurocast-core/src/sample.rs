//! Sample: one multichannel reading

use serde::{Deserialize, Serialize};

/// One multichannel reading, in arrival order.
///
/// `sequence` is assigned by the acquisition loop and increases by one per
/// sample over the whole run, so ordering is explicit rather than implied by
/// buffer position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Monotonic arrival index
    pub sequence: u64,
    /// One value per channel
    pub values: Vec<f64>,
}

impl Sample {
    /// Create a new sample
    pub fn new(sequence: u64, values: Vec<f64>) -> Self {
        Sample { sequence, values }
    }

    /// Build samples from raw rows, numbering them from `first_sequence` and
    /// truncating every row to `channel_count` values.
    pub fn from_rows(rows: Vec<Vec<f64>>, first_sequence: u64, channel_count: usize) -> Vec<Self> {
        rows.into_iter()
            .enumerate()
            .map(|(offset, mut values)| {
                values.truncate(channel_count);
                Sample::new(first_sequence + offset as u64, values)
            })
            .collect()
    }

    /// Number of values carried
    pub fn width(&self) -> usize {
        self.values.len()
    }
}
