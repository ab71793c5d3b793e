//! Acquisition loop: pull, window, schedule, repeat until cancelled

use crate::scheduler::{CycleOutcome, EmissionScheduler};
use neurocast_core::{
    ChannelSet, NeurocastResult, Sample, SampleSource, SlidingWindowBuffer, ValueSink,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Counters reported when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopStats {
    pub cycles: u64,
    pub empty_cycles: u64,
    pub samples: u64,
    pub raw_emissions: u64,
    pub processed_emissions: u64,
    pub throttled_cycles: u64,
    pub messages_sent: u64,
    pub send_failures: u64,
}

/// Pull and emission parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSettings {
    pub chunk_size: usize,
    pub poll_timeout: Duration,
}

/// Single thread of control owning the window and the emission state
pub struct AcquisitionLoop<S: SampleSource, K: ValueSink> {
    source: S,
    sink: K,
    channels: ChannelSet,
    window: SlidingWindowBuffer,
    scheduler: Box<dyn EmissionScheduler>,
    settings: LoopSettings,
    next_sequence: u64,
    stats: LoopStats,
}

impl<S: SampleSource, K: ValueSink> AcquisitionLoop<S, K> {
    pub fn new(
        source: S,
        sink: K,
        channels: ChannelSet,
        window_capacity: usize,
        scheduler: Box<dyn EmissionScheduler>,
        settings: LoopSettings,
    ) -> NeurocastResult<Self> {
        let window = SlidingWindowBuffer::new(window_capacity, channels.len())?;

        Ok(AcquisitionLoop {
            source,
            sink,
            channels,
            window,
            scheduler,
            settings,
            next_sequence: 0,
            stats: LoopStats::default(),
        })
    }

    /// One pull-append-emit cycle. An empty pull leaves the window untouched
    /// and emits nothing.
    ///
    /// `clock` is read once, after the pull returns.
    pub fn run_cycle(&mut self, clock: impl FnOnce() -> Instant) -> NeurocastResult<CycleOutcome> {
        self.stats.cycles += 1;

        let rows = self
            .source
            .pull_chunk(self.settings.poll_timeout, self.settings.chunk_size)?;
        if rows.is_empty() {
            self.stats.empty_cycles += 1;
            return Ok(CycleOutcome::Idle);
        }

        let now = clock();

        let samples = Sample::from_rows(rows, self.next_sequence, self.channels.len());
        let was_primed = self.window.is_primed();
        self.window.append(&samples)?;
        self.next_sequence += samples.len() as u64;
        self.stats.samples += samples.len() as u64;
        if !was_primed && self.window.is_primed() {
            debug!(samples = self.stats.samples, "window filled");
        }

        let outcome = self
            .scheduler
            .on_cycle(&self.window, &samples, now, &mut self.sink)?;

        match &outcome {
            CycleOutcome::Raw(report) => {
                self.stats.raw_emissions += 1;
                self.stats.messages_sent += report.sent as u64;
                self.stats.send_failures += report.failed as u64;
            }
            CycleOutcome::Processed(report) => {
                self.stats.processed_emissions += 1;
                self.stats.messages_sent += report.sent as u64;
                self.stats.send_failures += report.failed as u64;
            }
            CycleOutcome::Throttled => self.stats.throttled_cycles += 1,
            CycleOutcome::Idle => {}
        }

        Ok(outcome)
    }

    /// Run until `stop` is set or the source fails. The flag is checked at
    /// the top of every cycle.
    pub fn run(&mut self, stop: &AtomicBool) -> NeurocastResult<LoopStats> {
        info!(
            mode = %self.scheduler.mode(),
            channels = self.channels.len(),
            window = self.window.capacity(),
            chunk_size = self.settings.chunk_size,
            "acquisition started"
        );

        while !stop.load(Ordering::Relaxed) {
            let outcome = self.run_cycle(Instant::now)?;
            if let CycleOutcome::Processed(report) = outcome {
                debug!(sequence = self.next_sequence, sent = report.sent, "processed tick");
            }
        }

        info!(
            cycles = self.stats.cycles,
            samples = self.stats.samples,
            messages = self.stats.messages_sent,
            failures = self.stats.send_failures,
            "acquisition stopped"
        );
        Ok(self.stats)
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn window(&self) -> &SlidingWindowBuffer {
        &self.window
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmissionMode, ProcessingConfig};
    use crate::scheduler::build_scheduler;
    use neurocast_core::{NeurocastError, RecordingSink, StreamDescriptor};
    use std::collections::VecDeque;
    use std::f64::consts::PI;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    /// Replays scripted pulls, then reports empty chunks
    struct ScriptedSource {
        descriptor: StreamDescriptor,
        chunks: VecDeque<NeurocastResult<Vec<Vec<f64>>>>,
        pulls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(channel_count: usize, chunks: Vec<NeurocastResult<Vec<Vec<f64>>>>) -> Self {
            ScriptedSource {
                descriptor: StreamDescriptor {
                    name: "Scripted".to_string(),
                    signal_type: "EEG".to_string(),
                    nominal_srate: 125.0,
                    channel_count,
                    channel_labels: Vec::new(),
                },
                chunks: chunks.into(),
                pulls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl SampleSource for ScriptedSource {
        fn descriptor(&self) -> &StreamDescriptor {
            &self.descriptor
        }

        fn pull_chunk(&mut self, _timeout: Duration, _max: usize) -> NeurocastResult<Vec<Vec<f64>>> {
            self.pulls.fetch_add(1, Ordering::SeqCst);
            self.chunks.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn settings() -> LoopSettings {
        LoopSettings {
            chunk_size: 10,
            poll_timeout: Duration::ZERO,
        }
    }

    fn build(
        mode: EmissionMode,
        source: ScriptedSource,
        max_channels: usize,
        start: Instant,
    ) -> AcquisitionLoop<ScriptedSource, RecordingSink> {
        let config = ProcessingConfig {
            mode,
            ..ProcessingConfig::default()
        };
        let channels = source.descriptor().channel_set(max_channels).unwrap();
        let scheduler = build_scheduler(&config, channels.clone(), 125.0, start).unwrap();
        AcquisitionLoop::new(source, RecordingSink::new(), channels, 250, scheduler, settings()).unwrap()
    }

    #[test]
    fn test_raw_cycle_emits_new_sample() {
        let source = ScriptedSource::new(2, vec![Ok(vec![vec![1.0, 2.0]])]);
        let mut acquisition = build(EmissionMode::Raw, source, 8, Instant::now());

        let outcome = acquisition.run_cycle(Instant::now).unwrap();
        assert!(matches!(outcome, CycleOutcome::Raw(_)));
        assert_eq!(
            acquisition.sink().messages(),
            &[("/Channel_1".to_string(), 1.0), ("/Channel_2".to_string(), 2.0)]
        );
        assert_eq!(acquisition.window().row(249), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let source = ScriptedSource::new(2, vec![Ok(Vec::new())]);
        let mut acquisition = build(EmissionMode::Raw, source, 8, Instant::now());

        let outcome = acquisition.run_cycle(Instant::now).unwrap();
        assert_eq!(outcome, CycleOutcome::Idle);
        assert!(acquisition.sink().is_empty());
        assert_eq!(acquisition.window().total_appended(), 0);
        assert!(acquisition.window().rows().all(|row| row.iter().all(|v| *v == 0.0)));
        assert_eq!(acquisition.stats().empty_cycles, 1);
    }

    #[test]
    fn test_rows_truncated_to_channel_count() {
        let source = ScriptedSource::new(4, vec![Ok(vec![vec![1.0, 2.0, 3.0, 4.0]])]);
        let mut acquisition = build(EmissionMode::Raw, source, 2, Instant::now());

        acquisition.run_cycle(Instant::now).unwrap();
        assert_eq!(acquisition.channels().len(), 2);
        assert_eq!(acquisition.sink().len(), 2);
        assert_eq!(acquisition.window().row(249), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn test_processed_cadence_over_synthetic_clock() {
        let chunks = (0..50)
            .map(|c| {
                Ok((0..10)
                    .map(|i| {
                        let n = (c * 10 + i) as f64;
                        vec![30.0 * (2.0 * PI * 10.0 * n / 125.0).sin()]
                    })
                    .collect())
            })
            .collect();
        let start = Instant::now();
        let mut acquisition = build(EmissionMode::Processed, ScriptedSource::new(1, chunks), 8, start);

        let mut emitted_at = Vec::new();
        for cycle in 0..50u64 {
            let now = start + Duration::from_millis(80 * (cycle + 1));
            if let CycleOutcome::Processed(report) = acquisition.run_cycle(|| now).unwrap() {
                assert_eq!(report.sent, 5 + 10);
                emitted_at.push(now);
            }
        }

        let stats = acquisition.stats();
        assert_eq!(stats.samples, 500);
        assert_eq!(stats.processed_emissions as usize, emitted_at.len());
        assert_eq!(stats.processed_emissions + stats.throttled_cycles, 50);
        assert!(emitted_at
            .windows(2)
            .all(|pair| pair[1] - pair[0] >= Duration::from_millis(125)));
    }

    #[test]
    fn test_clock_read_after_pull() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![(i as f64 * 0.5).sin()]).collect();
        let source = ScriptedSource::new(1, vec![Ok(rows)]);
        let pulls = Arc::clone(&source.pulls);
        let start = Instant::now();
        let mut acquisition = build(EmissionMode::Processed, source, 8, start);

        // every pull blocks for one full update interval
        let clock = || start + Duration::from_millis(125) * pulls.load(Ordering::SeqCst) as u32;
        let outcome = acquisition.run_cycle(clock).unwrap();
        assert!(matches!(outcome, CycleOutcome::Processed(_)));
    }

    #[test]
    fn test_source_error_is_fatal() {
        let source = ScriptedSource::new(
            1,
            vec![Err(NeurocastError::Source {
                reason: "stream lost".to_string(),
            })],
        );
        let mut acquisition = build(EmissionMode::Raw, source, 8, Instant::now());
        assert!(acquisition.run_cycle(Instant::now).is_err());
    }

    #[test]
    fn test_run_stops_on_flag() {
        let source = ScriptedSource::new(1, vec![Ok(vec![vec![0.5]])]);
        let mut acquisition = build(EmissionMode::Raw, source, 8, Instant::now());

        let stop = AtomicBool::new(true);
        let stats = acquisition.run(&stop).unwrap();
        assert_eq!(stats.cycles, 0);
    }

    #[test]
    fn test_sequence_numbers_continue_across_cycles() {
        let source = ScriptedSource::new(1, vec![Ok(vec![vec![1.0], vec![2.0]]), Ok(vec![vec![3.0]])]);
        let mut acquisition = build(EmissionMode::Raw, source, 8, Instant::now());

        acquisition.run_cycle(Instant::now).unwrap();
        acquisition.run_cycle(Instant::now).unwrap();
        assert_eq!(acquisition.window().total_appended(), 3);
        assert_eq!(acquisition.stats().samples, 3);
    }
}
