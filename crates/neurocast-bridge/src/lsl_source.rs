//! Lab Streaming Layer inlet behind the `SampleSource` boundary

use lsl::{Pullable, StreamInfo, StreamInlet};
use neurocast_core::{NeurocastError, NeurocastResult, SampleSource, StreamDescriptor};
use std::time::Duration;
use tracing::{info, warn};

/// Inlet buffer length in seconds
const MAX_BUFFER_SECS: i32 = 360;

pub struct LslSource {
    inlet: StreamInlet,
    descriptor: StreamDescriptor,
}

impl LslSource {
    /// Resolve the first stream whose `type` matches `signal_type` and open an inlet
    pub fn resolve(signal_type: &str, timeout: Duration, chunk_size: usize) -> NeurocastResult<Self> {
        info!(signal_type, timeout_secs = timeout.as_secs_f64(), "looking for an LSL stream");

        let streams = lsl::resolve_byprop("type", signal_type, 1, timeout.as_secs_f64())
            .map_err(|e| source_error(format!("stream resolution failed: {:?}", e)))?;

        if streams.len() > 1 {
            warn!(found = streams.len(), "multiple LSL streams found, using the first");
        }
        let info = streams
            .into_iter()
            .next()
            .ok_or_else(|| NeurocastError::NoStreamFound {
                signal_type: signal_type.to_string(),
                timeout_secs: timeout.as_secs_f64(),
            })?;

        let inlet = StreamInlet::new(&info, MAX_BUFFER_SECS, chunk_size as i32, true)
            .map_err(|e| source_error(format!("failed to open inlet: {:?}", e)))?;

        // the full description is only available from the inlet
        let full_info = inlet
            .info(timeout.as_secs_f64())
            .map_err(|e| source_error(format!("failed to read stream description: {:?}", e)))?;
        let descriptor = describe(&full_info);

        info!(
            name = %descriptor.name,
            signal_type = %descriptor.signal_type,
            channels = descriptor.channel_count,
            rate_hz = descriptor.nominal_srate,
            "resolved LSL stream"
        );

        Ok(LslSource { inlet, descriptor })
    }
}

fn source_error(reason: String) -> NeurocastError {
    NeurocastError::Source { reason }
}

/// Descriptor from stream info, labels read from `desc/channels/channel/label`
fn describe(info: &StreamInfo) -> StreamDescriptor {
    let channel_count = info.channel_count().max(0) as usize;

    let mut labels = Vec::with_capacity(channel_count);
    let mut channel = info.desc().child("channels").child("channel");
    while channel.is_valid() && labels.len() < channel_count {
        let label = channel.child_value_named("label");
        labels.push(Some(label).filter(|l| !l.trim().is_empty()));
        channel = channel.next_sibling();
    }

    StreamDescriptor {
        name: info.stream_name(),
        signal_type: info.stream_type(),
        nominal_srate: info.nominal_srate(),
        channel_count,
        channel_labels: labels,
    }
}

impl SampleSource for LslSource {
    fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    fn pull_chunk(&mut self, timeout: Duration, max_samples: usize) -> NeurocastResult<Vec<Vec<f64>>> {
        let mut rows = Vec::new();
        let mut wait = timeout.as_secs_f64();

        // wait for the first sample only, then drain what is already buffered
        while rows.len() < max_samples {
            let (values, timestamp): (Vec<f64>, f64) = self
                .inlet
                .pull_sample(wait)
                .map_err(|e| source_error(format!("pull failed: {:?}", e)))?;
            if timestamp == 0.0 || values.is_empty() {
                break;
            }
            rows.push(values);
            wait = 0.0;
        }

        Ok(rows)
    }
}
