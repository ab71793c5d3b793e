//! Bridge wiring: resolve the stream, build the loop, run until stopped

use crate::acquisition::{AcquisitionLoop, LoopSettings, LoopStats};
use crate::config::{BridgeConfig, SourceConfig};
use crate::scheduler::build_scheduler;
use crate::transport::OscSink;
use anyhow::Context;
use neurocast_core::SampleSource;
use neurocast_simulation::SimulatedSource;
use std::sync::atomic::AtomicBool;
use std::time::Instant;
use tracing::info;

/// Resolve the configured source and run the acquisition loop on the calling
/// thread until `stop` is set. Blocking.
pub fn run_bridge(config: &BridgeConfig, stop: &AtomicBool) -> anyhow::Result<LoopStats> {
    let source = open_source(config)?;
    let descriptor = source.descriptor().clone();

    let sample_rate = descriptor.sample_rate()?;
    let channels = descriptor.channel_set(config.acquisition.max_channels)?;
    info!(
        name = %descriptor.name,
        signal_type = %descriptor.signal_type,
        channels = channels.len(),
        rate_hz = sample_rate,
        "stream resolved"
    );
    info!(names = ?channels.names(), "channel names");

    let sink = OscSink::connect(&config.osc.host, config.osc.port)
        .with_context(|| format!("opening OSC target {}", config.osc.target()))?;
    info!(osc = %config.osc.target(), mode = %config.processing.mode, "emitting OSC");

    let scheduler = build_scheduler(&config.processing, channels.clone(), sample_rate, Instant::now())
        .context("configuring emission")?;
    let settings = LoopSettings {
        chunk_size: config.acquisition.chunk_size,
        poll_timeout: config.acquisition.poll_timeout(),
    };

    let mut acquisition = AcquisitionLoop::new(
        source,
        sink,
        channels,
        config.acquisition.window_capacity,
        scheduler,
        settings,
    )?;
    Ok(acquisition.run(stop)?)
}

/// Resolve the configured sample source
pub fn open_source(config: &BridgeConfig) -> anyhow::Result<Box<dyn SampleSource + Send>> {
    let acquisition = &config.acquisition;

    match &config.source {
        SourceConfig::Simulated(simulation) => {
            let source = SimulatedSource::resolve(
                simulation.clone(),
                &acquisition.signal_type,
                acquisition.resolve_timeout(),
            )?;
            Ok(Box::new(source))
        }
        #[cfg(feature = "lsl")]
        SourceConfig::Lsl => {
            let source = crate::lsl_source::LslSource::resolve(
                &acquisition.signal_type,
                acquisition.resolve_timeout(),
                acquisition.chunk_size,
            )?;
            Ok(Box::new(source))
        }
        #[cfg(not(feature = "lsl"))]
        SourceConfig::Lsl => {
            anyhow::bail!("built without the `lsl` feature; use --simulate or a simulated source")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmissionMode;
    use neurocast_core::NeurocastError;
    use neurocast_simulation::SimulationConfig;
    use std::net::UdpSocket;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_simulated_bridge_end_to_end() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        let mut config = BridgeConfig::default();
        config.osc.port = receiver.local_addr().unwrap().port();
        config.processing.mode = EmissionMode::Raw;
        config.source = SourceConfig::Simulated(SimulationConfig {
            seed: Some(11),
            paced: true,
            ..SimulationConfig::default()
        });
        config.validate().unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || run_bridge(&config, &stop))
        };

        let mut buf = [0u8; 256];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        stop.store(true, Ordering::Relaxed);

        let stats = handle.join().unwrap().unwrap();
        assert!(stats.samples > 0);
        assert!(stats.messages_sent > 0);

        match rosc::decoder::decode_udp(&buf[..len]).unwrap().1 {
            rosc::OscPacket::Message(message) => assert_eq!(message.addr, "/Fp1"),
            other => panic!("expected a message, got {:?}", other),
        }
    }

    #[test]
    fn test_unmatched_signal_type_is_fatal() {
        let mut config = BridgeConfig::default();
        config.acquisition.signal_type = "EMG".to_string();
        config.source = SourceConfig::Simulated(SimulationConfig::default());

        let stop = AtomicBool::new(false);
        let err = run_bridge(&config, &stop).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NeurocastError>(),
            Some(NeurocastError::NoStreamFound { .. })
        ));
    }
}
