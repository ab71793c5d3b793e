//! Band power walkthrough
//!
//! Fills a sliding window from the simulated EEG stream, runs the processed
//! pipeline once per preset and prints the band powers.

use neurocast_core::{BandSet, NeurocastResult, Sample, SlidingWindowBuffer};
use neurocast_processing::{FilterSpec, SpectralPipeline};
use neurocast_simulation::{EegSimulator, SignalPattern, SimulationConfig};

fn main() -> NeurocastResult<()> {
    println!("=== Neurocast Band Power Example ===\n");

    for (name, rhythms) in SignalPattern::presets() {
        preset_example(name, rhythms)?;
    }

    println!("=== Done ===");
    Ok(())
}

fn preset_example(name: &str, rhythms: Vec<SignalPattern>) -> NeurocastResult<()> {
    let config = SimulationConfig {
        rhythms,
        seed: Some(1),
        paced: false,
        ..SimulationConfig::default()
    };
    let sample_rate = config.sample_rate_hz;
    let channel_count = config.channel_labels.len();
    let mut simulator = EegSimulator::new(config)?;

    // two seconds of history
    let capacity = (2.0 * sample_rate) as usize;
    let mut window = SlidingWindowBuffer::new(capacity, channel_count)?;
    let samples = Sample::from_rows(simulator.generate_chunk(capacity), 0, channel_count);
    window.append(&samples)?;

    let mut pipeline = SpectralPipeline::new(FilterSpec::default(), BandSet::default(), 200.0, sample_rate)?;
    let frame = pipeline.process(&window)?;

    println!("{} ({} channels, {} Hz)", name, channel_count, sample_rate);
    for band in frame.bands.iter() {
        println!("   {:<6} {:>10.3}", band.name, band.power);
    }
    if let Some(dominant) = frame.bands.dominant() {
        println!("   dominant: {}", dominant.name);
    }
    println!("   pipeline latency: {} us\n", frame.latency_us);

    Ok(())
}
