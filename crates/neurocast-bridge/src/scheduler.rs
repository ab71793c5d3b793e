//! Emission scheduling: what goes out on each acquisition cycle

use crate::config::{EmissionMode, ProcessingConfig};
use neurocast_core::{
    BandDefinition, ChannelSet, NeurocastResult, Sample, SlidingWindowBuffer, ValueSink,
};
use neurocast_processing::SpectralPipeline;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Messages handed to the sink during one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmissionReport {
    pub sent: usize,
    pub failed: usize,
}

impl EmissionReport {
    /// Send one value; transport failures are logged and counted, never raised
    fn send(&mut self, sink: &mut dyn ValueSink, address: &str, value: f64) {
        match sink.send(address, value) {
            Ok(()) => self.sent += 1,
            Err(e) => {
                self.failed += 1;
                warn!(address, error = %e, "failed to send value");
            }
        }
    }
}

/// Result of one scheduler decision
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No new samples arrived
    Idle,
    /// Processed output is not due yet
    Throttled,
    /// New samples forwarded unfiltered
    Raw(EmissionReport),
    /// Band powers and filtered samples emitted
    Processed(EmissionReport),
}

/// Decide and emit for one acquisition cycle.
///
/// `window` already contains `new_samples` as its most recent rows.
pub trait EmissionScheduler: Send {
    fn mode(&self) -> EmissionMode;

    fn on_cycle(
        &mut self,
        window: &SlidingWindowBuffer,
        new_samples: &[Sample],
        now: Instant,
        sink: &mut dyn ValueSink,
    ) -> NeurocastResult<CycleOutcome>;
}

/// Build the scheduler for the configured mode
pub fn build_scheduler(
    config: &ProcessingConfig,
    channels: ChannelSet,
    sample_rate: f64,
    start: Instant,
) -> NeurocastResult<Box<dyn EmissionScheduler>> {
    Ok(match config.mode {
        EmissionMode::Raw => Box::new(RawEmitter::new(channels)),
        EmissionMode::Processed => {
            let pipeline = SpectralPipeline::new(
                config.filter_spec(),
                config.band_set()?,
                config.bandpower_ceiling,
                sample_rate,
            )?;
            let state = EmissionState::new(config.update_interval(), start);
            Box::new(ProcessedEmitter::new(channels, pipeline, state))
        }
    })
}

/// Forwards every new sample, per channel, in arrival order
#[derive(Debug)]
pub struct RawEmitter {
    channels: ChannelSet,
}

impl RawEmitter {
    pub fn new(channels: ChannelSet) -> Self {
        RawEmitter { channels }
    }
}

impl EmissionScheduler for RawEmitter {
    fn mode(&self) -> EmissionMode {
        EmissionMode::Raw
    }

    fn on_cycle(
        &mut self,
        _window: &SlidingWindowBuffer,
        new_samples: &[Sample],
        _now: Instant,
        sink: &mut dyn ValueSink,
    ) -> NeurocastResult<CycleOutcome> {
        if new_samples.is_empty() {
            return Ok(CycleOutcome::Idle);
        }

        let mut report = EmissionReport::default();
        for sample in new_samples {
            for (address, value) in self.channels.addresses().iter().zip(&sample.values) {
                report.send(sink, address, *value);
            }
        }
        Ok(CycleOutcome::Raw(report))
    }
}

/// Time of the last processed emission and the minimum gap between two
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionState {
    last_emission: Instant,
    interval: Duration,
}

impl EmissionState {
    /// The first emission becomes due one interval after `start`
    pub fn new(interval: Duration, start: Instant) -> Self {
        EmissionState {
            last_emission: start,
            interval,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_emission) >= self.interval
    }

    pub fn mark_emitted(&mut self, now: Instant) {
        self.last_emission = now;
    }

    pub fn last_emission(&self) -> Instant {
        self.last_emission
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Runs the spectral pipeline at most once per interval.
///
/// Skipped ticks are not queued or caught up.
#[derive(Debug)]
pub struct ProcessedEmitter {
    channels: ChannelSet,
    band_addresses: Vec<String>,
    pipeline: SpectralPipeline,
    state: EmissionState,
}

impl ProcessedEmitter {
    pub fn new(channels: ChannelSet, pipeline: SpectralPipeline, state: EmissionState) -> Self {
        let band_addresses = pipeline
            .estimator()
            .bands()
            .iter()
            .map(BandDefinition::address)
            .collect();

        ProcessedEmitter {
            channels,
            band_addresses,
            pipeline,
            state,
        }
    }

    pub fn state(&self) -> &EmissionState {
        &self.state
    }
}

impl EmissionScheduler for ProcessedEmitter {
    fn mode(&self) -> EmissionMode {
        EmissionMode::Processed
    }

    fn on_cycle(
        &mut self,
        window: &SlidingWindowBuffer,
        new_samples: &[Sample],
        now: Instant,
        sink: &mut dyn ValueSink,
    ) -> NeurocastResult<CycleOutcome> {
        if new_samples.is_empty() {
            return Ok(CycleOutcome::Idle);
        }
        if !self.state.is_due(now) {
            return Ok(CycleOutcome::Throttled);
        }

        let frame = self.pipeline.process(window)?;
        let mut report = EmissionReport::default();

        // results come back in band-definition order
        for (address, band) in self.band_addresses.iter().zip(frame.bands.iter()) {
            report.send(sink, address, band.power);
        }

        for row in frame.filtered.tail_rows(new_samples.len()) {
            for (address, value) in self.channels.addresses().iter().zip(&row) {
                report.send(sink, address, *value);
            }
        }

        self.state.mark_emitted(now);
        debug!(
            run = self.pipeline.runs(),
            sent = report.sent,
            failed = report.failed,
            latency_us = frame.latency_us,
            "processed emission"
        );
        Ok(CycleOutcome::Processed(report))
    }
}
