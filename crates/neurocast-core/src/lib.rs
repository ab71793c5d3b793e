//! Neurocast-Core: Foundation types for the biosignal bridge
//!
//! Channel catalog, samples, the sliding window, band vocabulary, and the
//! source/sink boundaries shared by processing, simulation and the bridge.

pub mod error;
pub mod channel;
pub mod sample;
pub mod window;
pub mod band;
pub mod source;
pub mod sink;

pub use error::{NeurocastError, NeurocastResult};
pub use channel::ChannelSet;
pub use sample::Sample;
pub use window::SlidingWindowBuffer;
pub use band::{BandDefinition, BandSet, BandPower, BandPowerResult};
pub use source::{SampleSource, StreamDescriptor};
pub use sink::{RecordingSink, ValueSink};
