//! Multichannel EEG simulator built from oscillatory patterns and noise

use crate::signal_patterns::SignalPattern;
use neurocast_core::{NeurocastError, NeurocastResult, StreamDescriptor};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Configuration for the simulated stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Name advertised in the stream descriptor
    pub stream_name: String,
    /// Signal type advertised for stream resolution
    pub signal_type: String,
    /// Sampling rate in Hz
    pub sample_rate_hz: f64,
    /// One label per simulated channel
    pub channel_labels: Vec<String>,
    /// Oscillatory components summed into every channel
    pub rhythms: Vec<SignalPattern>,
    /// Gaussian noise standard deviation (0.0 = no noise)
    pub noise_std: f64,
    /// Power line interference frequency, if any
    pub powerline_hz: Option<f64>,
    pub powerline_amplitude: f64,
    /// Mean eye blinks per second on the first two channels
    pub blink_rate_hz: f64,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
    /// Deliver samples at the nominal rate instead of as fast as pulled
    pub paced: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            stream_name: "NeurocastSimulator".to_string(),
            signal_type: "EEG".to_string(),
            sample_rate_hz: 250.0,
            channel_labels: ["Fp1", "Fp2", "C3", "C4", "P7", "P8", "O1", "O2"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rhythms: SignalPattern::resting_alpha(),
            noise_std: 3.0,
            powerline_hz: Some(50.0),
            powerline_amplitude: 5.0,
            blink_rate_hz: 0.2,
            seed: None,
            paced: true,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> NeurocastResult<()> {
        if !self.sample_rate_hz.is_finite() || self.sample_rate_hz <= 0.0 {
            return Err(simulation_error(format!(
                "sample rate must be positive, got {}",
                self.sample_rate_hz
            )));
        }
        if self.channel_labels.is_empty() {
            return Err(simulation_error("at least one channel is required".to_string()));
        }
        if !self.noise_std.is_finite() || self.noise_std < 0.0 {
            return Err(simulation_error(format!(
                "noise standard deviation must be non-negative, got {}",
                self.noise_std
            )));
        }
        if !self.blink_rate_hz.is_finite() || self.blink_rate_hz < 0.0 {
            return Err(simulation_error(format!(
                "blink rate must be non-negative, got {}",
                self.blink_rate_hz
            )));
        }
        let nyquist = self.sample_rate_hz / 2.0;
        for rhythm in &self.rhythms {
            if let Some(f) = rhythm.frequency_hz() {
                if !f.is_finite() || f < 0.0 || f >= nyquist {
                    return Err(simulation_error(format!(
                        "{} at {} Hz is outside [0, {}) Hz",
                        rhythm.description(),
                        f,
                        nyquist
                    )));
                }
            }
        }
        Ok(())
    }

    /// Descriptor a consumer sees after resolving this stream
    pub fn descriptor(&self) -> StreamDescriptor {
        StreamDescriptor {
            name: self.stream_name.clone(),
            signal_type: self.signal_type.clone(),
            nominal_srate: self.sample_rate_hz,
            channel_count: self.channel_labels.len(),
            channel_labels: self.channel_labels.iter().cloned().map(Some).collect(),
        }
    }
}

fn simulation_error(reason: String) -> NeurocastError {
    NeurocastError::Source { reason }
}

/// Synthetic EEG generator
pub struct EegSimulator {
    config: SimulationConfig,
    rng: rand::rngs::StdRng,
    noise: Normal<f64>,
    samples_generated: u64,
}

impl EegSimulator {
    pub fn new(config: SimulationConfig) -> NeurocastResult<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
            None => rand::rngs::StdRng::from_entropy(),
        };
        let noise = Normal::new(0.0, config.noise_std)
            .map_err(|e| simulation_error(format!("failed to create noise distribution: {}", e)))?;

        Ok(EegSimulator {
            config,
            rng,
            noise,
            samples_generated: 0,
        })
    }

    /// Next multichannel sample
    pub fn next_sample(&mut self) -> Vec<f64> {
        let time = self.time();
        let channel_count = self.config.channel_labels.len();
        let blink_probability = self.config.blink_rate_hz / self.config.sample_rate_hz;

        let mut row = Vec::with_capacity(channel_count);
        for channel in 0..channel_count {
            // spread channels around the scalp with small phase and gain differences
            let phase = channel as f64 * PI / 8.0;
            let gain = 1.0 - 0.05 * (channel % 4) as f64;

            let mut value: f64 = self
                .config
                .rhythms
                .iter()
                .map(|r| r.value_at(time, phase))
                .sum::<f64>()
                * gain;

            value += self.noise.sample(&mut self.rng);

            if let Some(f) = self.config.powerline_hz {
                value += self.config.powerline_amplitude * (2.0 * PI * f * time).sin();
            }

            if channel < 2 && self.rng.gen::<f64>() < blink_probability {
                value += 60.0;
            }

            row.push(value);
        }

        self.samples_generated += 1;
        row
    }

    /// `count` consecutive samples
    pub fn generate_chunk(&mut self, count: usize) -> Vec<Vec<f64>> {
        (0..count).map(|_| self.next_sample()).collect()
    }

    /// Stream time of the next sample, in seconds
    pub fn time(&self) -> f64 {
        self.samples_generated as f64 / self.config.sample_rate_hz
    }

    pub fn samples_generated(&self) -> u64 {
        self.samples_generated
    }

    pub fn channel_count(&self) -> usize {
        self.config.channel_labels.len()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}
