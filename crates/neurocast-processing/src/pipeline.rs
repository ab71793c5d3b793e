//! Processed-mode pipeline: filter the window, then estimate band power

use crate::bandpower::BandPowerEstimator;
use crate::filters::{FilterPipeline, FilterSpec, FilteredWindow};
use neurocast_core::{BandPowerResult, BandSet, NeurocastResult, SlidingWindowBuffer};
use std::time::Instant;

/// Output of one processed tick
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    /// Band powers in band-definition order
    pub bands: BandPowerResult,
    /// Filtered copy of the whole window, channel-major
    pub filtered: FilteredWindow,
    pub latency_us: u64,
}

/// Filter pipeline and band power estimator designed for one stream
#[derive(Debug)]
pub struct SpectralPipeline {
    filter: FilterPipeline,
    estimator: BandPowerEstimator,
    runs: u64,
}

impl SpectralPipeline {
    /// Design filters and estimator for `sample_rate`. Fails on a degenerate
    /// filter spec or band set.
    pub fn new(
        spec: FilterSpec,
        bands: BandSet,
        ceiling: f64,
        sample_rate: f64,
    ) -> NeurocastResult<Self> {
        let filter = FilterPipeline::design(spec, sample_rate)?;
        let estimator = BandPowerEstimator::new(sample_rate, bands, ceiling)?;

        Ok(SpectralPipeline {
            filter,
            estimator,
            runs: 0,
        })
    }

    pub fn filter(&self) -> &FilterPipeline {
        &self.filter
    }

    pub fn estimator(&self) -> &BandPowerEstimator {
        &self.estimator
    }

    /// Run the full pipeline over the current window contents
    pub fn process(&mut self, window: &SlidingWindowBuffer) -> NeurocastResult<ProcessedFrame> {
        let start = Instant::now();

        let filtered = self.filter.filter_window(window);
        let bands = self.estimator.estimate(filtered.channels())?;

        let latency_us = start.elapsed().as_micros() as u64;
        self.runs += 1;

        Ok(ProcessedFrame {
            bands,
            filtered,
            latency_us,
        })
    }

    /// Number of completed runs
    pub fn runs(&self) -> u64 {
        self.runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocast_core::Sample;
    use std::f64::consts::PI;

    fn alpha_window(fs: f64, capacity: usize, channels: usize) -> SlidingWindowBuffer {
        let mut window = SlidingWindowBuffer::new(capacity, channels).unwrap();
        let samples: Vec<Sample> = (0..capacity)
            .map(|i| {
                let v = 20.0 * (2.0 * PI * 10.0 * i as f64 / fs).sin();
                Sample::new(i as u64, vec![v; channels])
            })
            .collect();
        window.append(&samples).unwrap();
        window
    }

    #[test]
    fn test_process_full_window() {
        let mut pipeline =
            SpectralPipeline::new(FilterSpec::default(), BandSet::default(), 200.0, 125.0).unwrap();
        let window = alpha_window(125.0, 250, 3);

        let frame = pipeline.process(&window).unwrap();
        assert_eq!(frame.bands.len(), 5);
        assert_eq!(frame.bands.dominant().map(|b| b.name.as_str()), Some("Alpha"));
        assert_eq!(frame.filtered.channels().len(), 3);
        assert_eq!(frame.filtered.len(), 250);
        assert_eq!(pipeline.runs(), 1);
    }

    #[test]
    fn test_invalid_spec_fails_at_construction() {
        let spec = FilterSpec {
            highcut_hz: 80.0,
            ..FilterSpec::default()
        };
        assert!(SpectralPipeline::new(spec, BandSet::default(), 200.0, 125.0).is_err());
    }
}
