//! Simulated stream behind the `SampleSource` boundary

use crate::eeg_simulator::{EegSimulator, SimulationConfig};
use neurocast_core::{NeurocastError, NeurocastResult, SampleSource, StreamDescriptor};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Synthetic EEG source.
///
/// Paced sources release samples as the stream clock advances from the
/// moment of resolution, like a live device; a backlog is drained at most
/// `max_samples` per pull. Free-running sources return `max_samples` rows on
/// every pull.
pub struct SimulatedSource {
    simulator: EegSimulator,
    descriptor: StreamDescriptor,
    paced: bool,
    started: Instant,
}

impl SimulatedSource {
    pub fn new(config: SimulationConfig) -> NeurocastResult<Self> {
        let descriptor = config.descriptor();
        let paced = config.paced;
        let simulator = EegSimulator::new(config)?;

        Ok(SimulatedSource {
            simulator,
            descriptor,
            paced,
            started: Instant::now(),
        })
    }

    /// Resolve the simulated stream by signal type, failing like a real
    /// discovery would when the type does not match.
    pub fn resolve(
        config: SimulationConfig,
        signal_type: &str,
        timeout: Duration,
    ) -> NeurocastResult<Self> {
        if !config.signal_type.eq_ignore_ascii_case(signal_type) {
            return Err(NeurocastError::NoStreamFound {
                signal_type: signal_type.to_string(),
                timeout_secs: timeout.as_secs_f64(),
            });
        }

        let source = Self::new(config)?;
        info!(
            name = %source.descriptor.name,
            channels = source.descriptor.channel_count,
            rate_hz = source.descriptor.nominal_srate,
            paced = source.paced,
            "resolved simulated stream"
        );
        Ok(source)
    }

    /// Samples the stream clock says should exist but have not been pulled
    fn due(&self) -> u64 {
        let produced = (self.started.elapsed().as_secs_f64() * self.descriptor.nominal_srate) as u64;
        produced.saturating_sub(self.simulator.samples_generated())
    }

    fn wait_for_samples(&self, timeout: Duration) -> u64 {
        let deadline = Instant::now() + timeout;
        let sample_period = Duration::from_secs_f64(1.0 / self.descriptor.nominal_srate);

        loop {
            let due = self.due();
            if due > 0 {
                return due;
            }
            let now = Instant::now();
            if now >= deadline {
                return 0;
            }
            std::thread::sleep(sample_period.min(deadline - now));
        }
    }
}

impl SampleSource for SimulatedSource {
    fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    fn pull_chunk(&mut self, timeout: Duration, max_samples: usize) -> NeurocastResult<Vec<Vec<f64>>> {
        if max_samples == 0 {
            return Ok(Vec::new());
        }

        let count = if self.paced {
            let due = self.wait_for_samples(timeout);
            due.min(max_samples as u64) as usize
        } else {
            max_samples
        };

        if count > 0 {
            debug!(count, "simulated chunk");
        }
        Ok(self.simulator.generate_chunk(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(paced: bool) -> SimulationConfig {
        SimulationConfig {
            seed: Some(3),
            paced,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_resolve_by_signal_type() {
        assert!(SimulatedSource::resolve(config(false), "eeg", Duration::from_secs(1)).is_ok());

        let err = SimulatedSource::resolve(config(false), "EMG", Duration::from_secs(2))
            .err()
            .unwrap();
        assert_eq!(
            err,
            NeurocastError::NoStreamFound {
                signal_type: "EMG".to_string(),
                timeout_secs: 2.0,
            }
        );
    }

    #[test]
    fn test_free_running_fills_request() {
        let mut source = SimulatedSource::new(config(false)).unwrap();
        let chunk = source.pull_chunk(Duration::ZERO, 10).unwrap();

        assert_eq!(chunk.len(), 10);
        assert!(chunk.iter().all(|row| row.len() == 8));
        assert!(source.pull_chunk(Duration::ZERO, 0).unwrap().is_empty());
    }

    #[test]
    fn test_paced_source_follows_clock() {
        let mut source = SimulatedSource::new(config(true)).unwrap();
        std::thread::sleep(Duration::from_millis(100));

        // 250 Hz for 100 ms is 25 samples
        let chunk = source.pull_chunk(Duration::ZERO, 1000).unwrap();
        assert!(chunk.len() >= 20, "got {}", chunk.len());
        assert!(chunk.len() < 1000);

        let capped = {
            std::thread::sleep(Duration::from_millis(100));
            source.pull_chunk(Duration::ZERO, 5).unwrap()
        };
        assert_eq!(capped.len(), 5);
    }

    #[test]
    fn test_paced_source_waits_up_to_timeout() {
        let mut source = SimulatedSource::new(config(true)).unwrap();
        let _ = source.pull_chunk(Duration::ZERO, 1000).unwrap();

        let chunk = source.pull_chunk(Duration::from_millis(50), 1000).unwrap();
        assert!(!chunk.is_empty());
    }
}
