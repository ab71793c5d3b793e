//! Upstream sample source boundary

use crate::channel::ChannelSet;
use crate::error::NeurocastResult;
use crate::invalid_input;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metadata advertised by a resolved upstream stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Stream name
    pub name: String,
    /// Declared signal type (e.g. "EEG")
    pub signal_type: String,
    /// Nominal sampling rate in Hz (0 for irregular streams)
    pub nominal_srate: f64,
    /// Advertised channel count
    pub channel_count: usize,
    /// Per-channel labels from the stream description, when present
    pub channel_labels: Vec<Option<String>>,
}

impl StreamDescriptor {
    /// Sampling rate usable for filtering and spectral estimation
    pub fn sample_rate(&self) -> NeurocastResult<f64> {
        if self.nominal_srate.is_finite() && self.nominal_srate > 0.0 {
            Ok(self.nominal_srate)
        } else {
            Err(invalid_input!(
                "stream '{}' has no regular sampling rate ({} Hz)",
                self.name,
                self.nominal_srate
            ))
        }
    }

    /// Active channels, capped at `max_channels`
    pub fn channel_set(&self, max_channels: usize) -> NeurocastResult<ChannelSet> {
        ChannelSet::resolve(self.channel_count, &self.channel_labels, max_channels)
    }
}

/// A stream of multichannel rows.
///
/// `pull_chunk` waits at most `timeout` for data and returns up to
/// `max_samples` rows; an empty result means nothing arrived and is not an
/// error.
pub trait SampleSource {
    /// Metadata of the resolved stream
    fn descriptor(&self) -> &StreamDescriptor;

    /// Pull the next available rows
    fn pull_chunk(&mut self, timeout: Duration, max_samples: usize) -> NeurocastResult<Vec<Vec<f64>>>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn descriptor(&self) -> &StreamDescriptor {
        (**self).descriptor()
    }

    fn pull_chunk(&mut self, timeout: Duration, max_samples: usize) -> NeurocastResult<Vec<Vec<f64>>> {
        (**self).pull_chunk(timeout, max_samples)
    }
}
